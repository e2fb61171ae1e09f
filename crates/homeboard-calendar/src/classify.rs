//! Past/future classification of events.

use chrono::{DateTime, NaiveTime, Utc};

use crate::tz;
use crate::types::Event;

/// Cutoff used for all-day events when no other is configured (midday).
pub fn default_all_day_cutoff() -> NaiveTime {
    NaiveTime::from_hms_opt(12, 0, 0).unwrap_or_default()
}

/// Whether an event is over as of `now`.
///
/// The event's civil date is combined with its end time if it has one, else
/// its start time, else `all_day_cutoff`, and compared against `now` as read
/// in the display timezone.
pub fn is_past_event(event: &Event, now: DateTime<Utc>, all_day_cutoff: NaiveTime) -> bool {
    let boundary_time = event
        .end_time
        .or_else(|| event.time())
        .unwrap_or(all_day_cutoff);
    let boundary = event.date().and_time(boundary_time);

    tz::to_civil(now) > boundary
}
