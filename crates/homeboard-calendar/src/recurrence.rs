//! Expansion of a recurrence rule into concrete child events.
//!
//! The parent event is the first occurrence of its series, so expansion never
//! emits a child on the parent's own date and count-bounded rules produce
//! `count - 1` children.

use chrono::{Days, NaiveDate, NaiveTime, Weekday};

use crate::error::{CalendarError, CalendarResult};
use crate::tz;
use crate::types::{EndCondition, Event, EventDraft, RecurrenceKind, RecurrenceRule};
use crate::week;

const DAYS_PER_WEEK: u64 = 7;
const DAYS_PER_FOUR_WEEKS: u64 = 28;

/// Generate the child events for a newly created parent.
///
/// Pure function of its inputs. Either every child is well formed or the whole
/// expansion fails; a partial series is never returned.
///
/// # Errors
/// Returns `CalendarError::InvalidRule` if the rule fails validation and
/// `CalendarError::MalformedBatch` if any child can't be built.
pub fn expand(parent: &Event, rule: &RecurrenceRule) -> CalendarResult<Vec<EventDraft>> {
    if !rule.repeats() {
        return Ok(Vec::new());
    }

    let parent_date = parent.date();
    let time_of_day = parent.time().unwrap_or(NaiveTime::MIN);
    let dates = occurrence_dates(parent_date, rule)?;

    let children = dates
        .into_iter()
        .map(|date| {
            let scheduled_for = tz::from_civil(date, time_of_day).map_err(|e| {
                CalendarError::MalformedBatch(format!("occurrence on {}: {}", date, e))
            })?;
            let child = EventDraft {
                title: parent.title.clone(),
                description: parent.description.clone(),
                folder: parent.folder.clone(),
                scheduled_for,
                all_day: parent.all_day,
                end_time: parent.end_time,
                recurrence: Some(rule.clone()),
                recurrence_parent_id: Some(parent.id),
            };
            child.validate()?;
            Ok(child)
        })
        .collect::<CalendarResult<Vec<_>>>()?;

    tracing::debug!(
        "Expanded {} rule for event {} into {} children",
        rule.kind.as_str(),
        parent.id,
        children.len()
    );

    Ok(children)
}

/// Civil dates of the child occurrences, in ascending order.
///
/// # Errors
/// Returns `CalendarError::InvalidRule` if the rule is invalid or its bounds overflow the calendar.
pub fn occurrence_dates(
    parent_date: NaiveDate,
    rule: &RecurrenceRule,
) -> CalendarResult<Vec<NaiveDate>> {
    rule.validate()?;

    match rule.kind {
        RecurrenceKind::None => Ok(Vec::new()),
        RecurrenceKind::Weekly => weekly_dates(parent_date, rule),
        RecurrenceKind::Every4Weeks => every_4_weeks_dates(parent_date, rule),
    }
}

fn weekly_dates(parent_date: NaiveDate, rule: &RecurrenceRule) -> CalendarResult<Vec<NaiveDate>> {
    let mut days: Vec<Weekday> = rule.days.clone();
    days.sort_by_key(Weekday::num_days_from_monday);
    days.dedup();

    let limit = child_limit(rule);
    if days.is_empty() || limit == Some(0) {
        return Ok(Vec::new());
    }

    let step = DAYS_PER_WEEK * u64::from(rule.interval);
    let stop = stop_date(parent_date, rule, step)?;
    let mut dates = Vec::new();
    let mut week_start = week::week_window_for_date(parent_date).monday();

    'weeks: while week_start <= stop {
        for day in &days {
            let date = week_start + Days::new(u64::from(day.num_days_from_monday()));
            if date <= parent_date || date > stop {
                continue;
            }
            dates.push(date);
            if limit.is_some_and(|max| dates.len() >= max) {
                break 'weeks;
            }
        }
        match week_start.checked_add_days(Days::new(step)) {
            Some(next) => week_start = next,
            None => break,
        }
    }

    Ok(dates)
}

fn every_4_weeks_dates(
    parent_date: NaiveDate,
    rule: &RecurrenceRule,
) -> CalendarResult<Vec<NaiveDate>> {
    let limit = child_limit(rule);
    if limit == Some(0) {
        return Ok(Vec::new());
    }

    let step = DAYS_PER_FOUR_WEEKS * u64::from(rule.interval);
    let stop = stop_date(parent_date, rule, step)?;
    let mut dates = Vec::new();
    let mut next = parent_date.checked_add_days(Days::new(step));

    while let Some(date) = next.filter(|d| *d <= stop) {
        dates.push(date);
        if limit.is_some_and(|max| dates.len() >= max) {
            break;
        }
        next = date.checked_add_days(Days::new(step));
    }

    Ok(dates)
}

/// Maximum number of children; the parent takes one occurrence slot.
fn child_limit(rule: &RecurrenceRule) -> Option<usize> {
    match rule.end {
        EndCondition::OnDate(_) => None,
        EndCondition::AfterCount(count) => Some(count.saturating_sub(1) as usize),
    }
}

/// Last date an occurrence may fall on.
///
/// Count-bounded rules get a generous cap so the loop always ends; the child
/// counter is what actually enforces the count.
fn stop_date(parent_date: NaiveDate, rule: &RecurrenceRule, step: u64) -> CalendarResult<NaiveDate> {
    match rule.end {
        EndCondition::OnDate(date) => Ok(date),
        EndCondition::AfterCount(count) => step
            .checked_mul(u64::from(count))
            .and_then(|span| parent_date.checked_add_days(Days::new(span)))
            .ok_or_else(|| {
                CalendarError::InvalidRule(format!("{} occurrences run past the calendar", count))
            }),
    }
}
