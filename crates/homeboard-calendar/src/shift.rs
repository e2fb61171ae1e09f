//! Date moves that keep an event's local wall-clock time.
//!
//! None of these mutate the event; they return the new instant (or a new
//! draft for duplicates) for the caller to persist.

use chrono::{DateTime, Days, NaiveDate, Utc};

use crate::error::{CalendarError, CalendarResult};
use crate::tz;
use crate::types::{Event, EventDraft};

/// Move an instant to `target` keeping its civil time-of-day in the display timezone.
///
/// The UTC offset is recomputed for `target`, so crossing a DST transition
/// keeps the clock reading rather than the offset.
///
/// # Errors
/// Returns `CalendarError::UnresolvableLocalTime` if the time can't be placed on `target`.
pub fn shift_preserving_local_time(
    instant: DateTime<Utc>,
    target: NaiveDate,
) -> CalendarResult<DateTime<Utc>> {
    tz::from_civil(target, tz::civil_time(instant))
}

/// New instant for `event` on an explicitly chosen date (date picker, drag and drop).
///
/// # Errors
/// Returns `CalendarError::PastDate` if `target` is before today. Moving
/// within today, or onto the event's current date, is allowed.
pub fn move_to_date(
    event: &Event,
    target: NaiveDate,
    now: DateTime<Utc>,
) -> CalendarResult<DateTime<Utc>> {
    ensure_not_past(target, now)?;
    shift_preserving_local_time(event.scheduled_for, target)
}

/// New instant for `event` one civil day later.
///
/// # Errors
/// Returns `CalendarError::PastDate` if the next day is still before today.
pub fn move_to_tomorrow(event: &Event, now: DateTime<Utc>) -> CalendarResult<DateTime<Utc>> {
    move_to_date(event, days_after(event.date(), 1)?, now)
}

/// New instant for `event` seven civil days later.
///
/// # Errors
/// Returns `CalendarError::PastDate` if a week later is still before today.
pub fn move_to_next_week(event: &Event, now: DateTime<Utc>) -> CalendarResult<DateTime<Utc>> {
    move_to_date(event, days_after(event.date(), 7)?, now)
}

/// Copy `event` onto `target` as a new, independent draft.
///
/// The copy keeps title, description, folder and local time but carries no
/// recurrence rule and no parent reference.
///
/// # Errors
/// Returns `CalendarError::PastDate` if `target` is before today.
pub fn duplicate_to_date(
    event: &Event,
    target: NaiveDate,
    now: DateTime<Utc>,
) -> CalendarResult<EventDraft> {
    let scheduled_for = move_to_date(event, target, now)?;
    Ok(EventDraft {
        title: event.title.clone(),
        description: event.description.clone(),
        folder: event.folder.clone(),
        scheduled_for,
        all_day: event.all_day,
        end_time: event.end_time,
        recurrence: None,
        recurrence_parent_id: None,
    })
}

/// Reject dates before today in the display timezone.
///
/// # Errors
/// Returns `CalendarError::PastDate` if `target` is before today.
pub fn ensure_not_past(target: NaiveDate, now: DateTime<Utc>) -> CalendarResult<()> {
    let today = tz::today(now);
    if target < today {
        return Err(CalendarError::PastDate { target, today });
    }
    Ok(())
}

fn days_after(date: NaiveDate, days: u64) -> CalendarResult<NaiveDate> {
    date.checked_add_days(Days::new(days))
        .ok_or_else(|| CalendarError::InvalidDateKey(format!("{} + {} days", date, days)))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use crate::types::{EndCondition, RecurrenceRule};
    use chrono::{NaiveTime, Weekday};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn event_on(on: NaiveDate, at: NaiveTime) -> Event {
        let scheduled_for = tz::from_civil(on, at).unwrap();
        Event {
            id: 7,
            title: "Swim lesson".to_string(),
            description: None,
            folder: Some("kids".to_string()),
            scheduled_for,
            all_day: false,
            end_time: Some(hm(10, 0)),
            recurrence: None,
            recurrence_parent_id: None,
            created_at: scheduled_for,
        }
    }

    fn noon_on(on: NaiveDate) -> DateTime<Utc> {
        tz::from_civil(on, hm(12, 0)).unwrap()
    }

    #[test]
    fn test_move_across_spring_forward_keeps_local_time() {
        let event = event_on(date(2024, 3, 8), hm(9, 0));
        let moved = move_to_date(&event, date(2024, 3, 11), noon_on(date(2024, 3, 1))).unwrap();

        assert_eq!(tz::civil_date(moved), date(2024, 3, 11));
        assert_eq!(tz::civil_time(moved), hm(9, 0));
        assert_eq!(moved.format("%H:%M").to_string(), "13:00");
    }

    #[test]
    fn test_move_across_fall_back_keeps_local_time() {
        let event = event_on(date(2024, 11, 1), hm(9, 0));
        let moved = move_to_next_week(&event, noon_on(date(2024, 10, 30))).unwrap();

        assert_eq!(tz::civil_date(moved), date(2024, 11, 8));
        assert_eq!(tz::civil_time(moved), hm(9, 0));
        assert_eq!(moved.format("%H:%M").to_string(), "14:00");
    }

    #[test]
    fn test_move_into_past_is_rejected() {
        let event = event_on(date(2024, 6, 12), hm(9, 0));
        let original = event.clone();
        let now = noon_on(date(2024, 6, 10));
        assert_eq!(tz::today_key(now), "2024-06-10");

        let result = move_to_date(&event, date(2024, 6, 9), now);

        assert_eq!(
            result,
            Err(CalendarError::PastDate {
                target: date(2024, 6, 9),
                today: date(2024, 6, 10),
            })
        );
        assert_eq!(event, original);
    }

    #[test]
    fn test_move_to_today_and_noop_are_allowed() {
        let event = event_on(date(2024, 6, 10), hm(9, 0));
        let now = noon_on(date(2024, 6, 10));

        let same = move_to_date(&event, date(2024, 6, 10), now).unwrap();
        assert_eq!(same, event.scheduled_for);

        let stale = event_on(date(2024, 6, 3), hm(9, 0));
        let today = move_to_date(&stale, date(2024, 6, 10), now).unwrap();
        assert_eq!(tz::civil_date(today), date(2024, 6, 10));
    }

    #[test]
    fn test_move_to_tomorrow_rolls_over_month() {
        let event = event_on(date(2024, 2, 29), hm(20, 15));
        let moved = move_to_tomorrow(&event, noon_on(date(2024, 2, 29))).unwrap();

        assert_eq!(tz::civil_date(moved), date(2024, 3, 1));
        assert_eq!(tz::civil_time(moved), hm(20, 15));
    }

    #[test]
    fn test_move_to_tomorrow_from_long_ago_is_rejected() {
        let event = event_on(date(2024, 6, 1), hm(9, 0));
        let result = move_to_tomorrow(&event, noon_on(date(2024, 6, 10)));
        assert!(matches!(result, Err(CalendarError::PastDate { .. })));
    }

    #[test]
    fn test_next_week_rolls_over_year() {
        let event = event_on(date(2024, 12, 28), hm(23, 30));
        let moved = move_to_next_week(&event, noon_on(date(2024, 12, 27))).unwrap();

        assert_eq!(tz::civil_date(moved), date(2025, 1, 4));
        assert_eq!(tz::civil_time(moved), hm(23, 30));
    }

    #[test]
    fn test_duplicate_drops_recurrence() {
        let mut event = event_on(date(2024, 6, 12), hm(9, 0));
        event.recurrence = Some(RecurrenceRule::weekly(
            vec![Weekday::Wed],
            EndCondition::AfterCount(4),
        ));
        event.recurrence_parent_id = Some(3);

        let copy = duplicate_to_date(&event, date(2024, 6, 20), noon_on(date(2024, 6, 10))).unwrap();

        assert_eq!(copy.date(), date(2024, 6, 20));
        assert_eq!(tz::civil_time(copy.scheduled_for), hm(9, 0));
        assert_eq!(copy.title, event.title);
        assert_eq!(copy.end_time, Some(hm(10, 0)));
        assert!(copy.recurrence.is_none());
        assert!(copy.recurrence_parent_id.is_none());
    }

    #[test]
    fn test_ensure_not_past_boundary() {
        let now = tz::from_civil(date(2024, 6, 10), hm(0, 5)).unwrap();
        assert!(ensure_not_past(date(2024, 6, 10), now).is_ok());
        assert!(ensure_not_past(date(2024, 6, 11), now).is_ok());
        assert_eq!(
            ensure_not_past(date(2024, 6, 9), now),
            Err(CalendarError::PastDate {
                target: date(2024, 6, 9),
                today: date(2024, 6, 10),
            })
        );
    }

    #[test]
    fn test_duplicate_into_past_is_rejected() {
        let event = event_on(date(2024, 6, 12), hm(9, 0));
        let result = duplicate_to_date(&event, date(2024, 6, 1), noon_on(date(2024, 6, 10)));
        assert!(matches!(result, Err(CalendarError::PastDate { .. })));
    }
}
