//! Conversions between stored UTC instants and the display timezone's civil calendar.
//!
//! Every civil date or time shown to the user is derived by projecting a UTC
//! instant into [`DISPLAY_TZ`]. The host machine's local timezone is never
//! consulted.
//!
//! Local times that don't map to exactly one instant are resolved as follows:
//! - ambiguous (the repeated hour when clocks fall back): the earliest
//!   occurrence, i.e. the daylight-time reading;
//! - nonexistent (the skipped hour when clocks spring forward): the same wall
//!   clock reading one hour later, which lands just past the gap.

use chrono::{
    DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc,
};
use chrono_tz::Tz;

use crate::error::{CalendarError, CalendarResult};

/// The fixed timezone all civil dates are computed in.
pub const DISPLAY_TZ: Tz = chrono_tz::America::New_York;

/// Format used for date keys (`YYYY-MM-DD`, zero padded).
pub const DATE_KEY_FORMAT: &str = "%Y-%m-%d";

/// Project a UTC instant into the display timezone's civil calendar.
pub fn to_civil(instant: DateTime<Utc>) -> NaiveDateTime {
    instant.with_timezone(&DISPLAY_TZ).naive_local()
}

/// Civil date of an instant in the display timezone.
pub fn civil_date(instant: DateTime<Utc>) -> NaiveDate {
    to_civil(instant).date()
}

/// Civil time-of-day of an instant in the display timezone.
pub fn civil_time(instant: DateTime<Utc>) -> NaiveTime {
    to_civil(instant).time()
}

/// Combine a civil date and time-of-day in the display timezone into a UTC instant.
///
/// The UTC offset is derived for `date` itself, so the same wall clock reading
/// on either side of a DST transition yields instants with different offsets.
///
/// # Errors
/// Returns `CalendarError::UnresolvableLocalTime` if the local time cannot be
/// mapped even after stepping past a DST gap.
pub fn from_civil(date: NaiveDate, time: NaiveTime) -> CalendarResult<DateTime<Utc>> {
    let local = date.and_time(time);
    match DISPLAY_TZ.from_local_datetime(&local) {
        LocalResult::Single(dt) => Ok(dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(earliest, _) => Ok(earliest.with_timezone(&Utc)),
        LocalResult::None => {
            let shifted = local + Duration::hours(1);
            DISPLAY_TZ
                .from_local_datetime(&shifted)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc))
                .ok_or(CalendarError::UnresolvableLocalTime(local))
        }
    }
}

/// Today's civil date in the display timezone.
pub fn today(now: DateTime<Utc>) -> NaiveDate {
    civil_date(now)
}

/// Today's date key (`YYYY-MM-DD`) in the display timezone.
pub fn today_key(now: DateTime<Utc>) -> String {
    date_key(today(now))
}

/// Format a civil date as a date key.
pub fn date_key(date: NaiveDate) -> String {
    date.format(DATE_KEY_FORMAT).to_string()
}

/// Parse a `YYYY-MM-DD` date key.
///
/// # Errors
/// Returns `CalendarError::InvalidDateKey` if the key is not a valid date.
pub fn parse_date_key(key: &str) -> CalendarResult<NaiveDate> {
    NaiveDate::parse_from_str(key.trim(), DATE_KEY_FORMAT)
        .map_err(|_| CalendarError::InvalidDateKey(key.to_string()))
}

/// Parse a time of day in `HH:MM` or `HH:MM:SS` form.
///
/// # Errors
/// Returns `CalendarError::InvalidTime` for anything else.
pub fn parse_time_of_day(value: &str) -> CalendarResult<NaiveTime> {
    let trimmed = value.trim();
    NaiveTime::parse_from_str(trimmed, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M:%S"))
        .map_err(|_| CalendarError::InvalidTime(value.to_string()))
}

/// Format a time of day as `HH:MM`.
pub fn format_time_of_day(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}
