//! Calendar event and recurrence types.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::{CalendarError, CalendarResult};
use crate::tz;

/// Calendar event as stored.
///
/// `scheduled_for` is the only source of truth for when the event happens;
/// the civil date and time are always projected from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    /// Folder label, used for display colour only.
    pub folder: Option<String>,
    pub scheduled_for: DateTime<Utc>,
    pub all_day: bool,
    pub end_time: Option<NaiveTime>,
    /// Rule on a parent, or the copy carried by a generated child.
    pub recurrence: Option<RecurrenceRule>,
    pub recurrence_parent_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl Event {
    /// Civil date in the display timezone.
    pub fn date(&self) -> NaiveDate {
        tz::civil_date(self.scheduled_for)
    }

    /// Civil start time, or `None` for all-day events.
    pub fn time(&self) -> Option<NaiveTime> {
        if self.all_day {
            None
        } else {
            Some(tz::civil_time(self.scheduled_for))
        }
    }

    /// Date key (`YYYY-MM-DD`) of the event's civil date.
    pub fn date_key(&self) -> String {
        tz::date_key(self.date())
    }

    /// A parent owns a rule that actually repeats and references no other event.
    pub fn is_recurrence_parent(&self) -> bool {
        self.recurrence_parent_id.is_none()
            && self.recurrence.as_ref().is_some_and(RecurrenceRule::repeats)
    }

    pub fn is_recurrence_child(&self) -> bool {
        self.recurrence_parent_id.is_some()
    }
}

/// An event that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDraft {
    pub title: String,
    pub description: Option<String>,
    pub folder: Option<String>,
    pub scheduled_for: DateTime<Utc>,
    pub all_day: bool,
    pub end_time: Option<NaiveTime>,
    pub recurrence: Option<RecurrenceRule>,
    pub recurrence_parent_id: Option<i64>,
}

impl EventDraft {
    /// Build a draft from a civil date and optional start time.
    ///
    /// Without a start time the draft is all-day and anchored at local midnight.
    ///
    /// # Errors
    /// Returns `CalendarError::UnresolvableLocalTime` if the local time can't be mapped to UTC.
    pub fn at(
        title: impl Into<String>,
        date: NaiveDate,
        time: Option<NaiveTime>,
    ) -> CalendarResult<Self> {
        let scheduled_for = tz::from_civil(date, time.unwrap_or(NaiveTime::MIN))?;
        Ok(Self {
            title: title.into(),
            description: None,
            folder: None,
            scheduled_for,
            all_day: time.is_none(),
            end_time: None,
            recurrence: None,
            recurrence_parent_id: None,
        })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_folder(mut self, folder: impl Into<String>) -> Self {
        self.folder = Some(folder.into());
        self
    }

    pub fn with_end_time(mut self, end_time: NaiveTime) -> Self {
        self.end_time = Some(end_time);
        self
    }

    /// Civil date in the display timezone.
    pub fn date(&self) -> NaiveDate {
        tz::civil_date(self.scheduled_for)
    }

    /// Check the fields a stored event requires.
    ///
    /// # Errors
    /// Returns `CalendarError::MalformedBatch` describing the first problem found.
    pub fn validate(&self) -> CalendarResult<()> {
        if self.title.trim().is_empty() {
            return Err(CalendarError::MalformedBatch("event title is empty".to_string()));
        }
        if let (Some(end), false) = (self.end_time, self.all_day) {
            if end < tz::civil_time(self.scheduled_for) {
                return Err(CalendarError::MalformedBatch(format!(
                    "end time {} is before start time",
                    tz::format_time_of_day(end)
                )));
            }
        }
        Ok(())
    }
}

/// How an event repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RecurrenceKind {
    #[default]
    None,
    Weekly,
    #[serde(rename = "every4weeks")]
    Every4Weeks,
}

impl RecurrenceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecurrenceKind::None => "none",
            RecurrenceKind::Weekly => "weekly",
            RecurrenceKind::Every4Weeks => "every4weeks",
        }
    }

    /// Parse a stored kind; unknown or missing values mean no recurrence.
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("weekly") => RecurrenceKind::Weekly,
            Some("every4weeks") => RecurrenceKind::Every4Weeks,
            _ => RecurrenceKind::None,
        }
    }
}

/// When a recurring series stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "value")]
pub enum EndCondition {
    /// Last date an occurrence may fall on (inclusive).
    OnDate(NaiveDate),
    /// Total number of occurrences, the parent included.
    AfterCount(u32),
}

/// Recurrence rule attached to a parent event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrenceRule {
    pub kind: RecurrenceKind,
    /// Weekdays on which a `Weekly` rule produces occurrences.
    pub days: Vec<Weekday>,
    pub end: EndCondition,
    pub interval: u32,
}

impl RecurrenceRule {
    /// A rule that never repeats.
    pub fn none() -> Self {
        Self {
            kind: RecurrenceKind::None,
            days: Vec::new(),
            end: EndCondition::AfterCount(1),
            interval: 1,
        }
    }

    pub fn weekly(days: Vec<Weekday>, end: EndCondition) -> Self {
        Self {
            kind: RecurrenceKind::Weekly,
            days,
            end,
            interval: 1,
        }
    }

    pub fn every_4_weeks(end: EndCondition) -> Self {
        Self {
            kind: RecurrenceKind::Every4Weeks,
            days: Vec::new(),
            end,
            interval: 1,
        }
    }

    pub fn repeats(&self) -> bool {
        self.kind != RecurrenceKind::None
    }

    /// A weekly rule with no selected weekdays.
    pub fn is_empty_weekly(&self) -> bool {
        self.kind == RecurrenceKind::Weekly && self.days.is_empty()
    }

    /// Check the rule before expanding it.
    ///
    /// # Errors
    /// Returns `CalendarError::InvalidRule` for a zero interval or a zero occurrence count.
    /// A weekly rule with no weekdays is always valid; it simply produces nothing.
    pub fn validate(&self) -> CalendarResult<()> {
        if !self.repeats() || self.is_empty_weekly() {
            return Ok(());
        }
        if self.interval == 0 {
            return Err(CalendarError::InvalidRule("interval must be at least 1".to_string()));
        }
        if self.end == EndCondition::AfterCount(0) {
            return Err(CalendarError::InvalidRule(
                "occurrence count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Flatten the rule into store columns.
    pub fn to_fields(&self) -> RecurrenceFields {
        let (end_date, count) = match self.end {
            EndCondition::OnDate(date) => (Some(tz::date_key(date)), None),
            EndCondition::AfterCount(count) => (None, Some(count)),
        };
        RecurrenceFields {
            kind: Some(self.kind.as_str().to_string()),
            interval: Some(self.interval),
            end_date,
            count,
            days: if self.days.is_empty() {
                None
            } else {
                Some(
                    self.days
                        .iter()
                        .map(|d| weekday_label(*d))
                        .collect::<Vec<_>>()
                        .join(","),
                )
            },
        }
    }

    /// Rebuild a rule from store columns.
    ///
    /// Returns `Ok(None)` when the row carries no recurrence.
    ///
    /// # Errors
    /// Returns an error if a date key or weekday label is malformed, or if a
    /// repeating rule has no termination.
    pub fn from_fields(fields: &RecurrenceFields) -> CalendarResult<Option<Self>> {
        let kind = RecurrenceKind::parse(fields.kind.as_deref());
        if kind == RecurrenceKind::None {
            return Ok(None);
        }

        let end = match (&fields.end_date, fields.count) {
            (Some(key), _) => EndCondition::OnDate(tz::parse_date_key(key)?),
            (None, Some(count)) => EndCondition::AfterCount(count),
            (None, None) => {
                return Err(CalendarError::InvalidRule(
                    "repeating event has no end date or count".to_string(),
                ))
            }
        };

        let days = match fields.days.as_deref() {
            Some(list) if !list.trim().is_empty() => list
                .split(',')
                .map(parse_weekday_label)
                .collect::<CalendarResult<Vec<_>>>()?,
            _ => Vec::new(),
        };

        Ok(Some(Self {
            kind,
            days,
            end,
            interval: fields.interval.unwrap_or(1),
        }))
    }
}

/// Recurrence columns as persisted by the record store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecurrenceFields {
    pub kind: Option<String>,
    pub interval: Option<u32>,
    pub end_date: Option<String>,
    pub count: Option<u32>,
    /// Comma-separated weekday labels.
    pub days: Option<String>,
}

/// Lowercase English label for a weekday (`monday`..`sunday`).
pub fn weekday_label(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    }
}

/// Parse a weekday label; accepts full or three-letter names in any case.
///
/// # Errors
/// Returns `CalendarError::InvalidRule` for unknown labels.
pub fn parse_weekday_label(label: &str) -> CalendarResult<Weekday> {
    match label.trim().to_ascii_lowercase().as_str() {
        "monday" | "mon" => Ok(Weekday::Mon),
        "tuesday" | "tue" => Ok(Weekday::Tue),
        "wednesday" | "wed" => Ok(Weekday::Wed),
        "thursday" | "thu" => Ok(Weekday::Thu),
        "friday" | "fri" => Ok(Weekday::Fri),
        "saturday" | "sat" => Ok(Weekday::Sat),
        "sunday" | "sun" => Ok(Weekday::Sun),
        other => Err(CalendarError::InvalidRule(format!("unknown weekday: {}", other))),
    }
}
