//! Calendar engine for Homeboard.
//!
//! Pure date/time logic: week windows in the display timezone, past/future
//! classification, recurrence expansion and date moves that preserve local
//! wall-clock time. Nothing here reads the system clock; callers pass `now`.

pub mod classify;
pub mod error;
pub mod recurrence;
pub mod shift;
pub mod types;
pub mod tz;
pub mod week;

pub use classify::{default_all_day_cutoff, is_past_event};
pub use error::{CalendarError, CalendarResult};
pub use recurrence::{expand, occurrence_dates};
pub use shift::{
    duplicate_to_date, ensure_not_past, move_to_date, move_to_next_week, move_to_tomorrow,
    shift_preserving_local_time,
};
pub use types::{
    parse_weekday_label, weekday_label, EndCondition, Event, EventDraft, RecurrenceFields,
    RecurrenceKind, RecurrenceRule,
};
pub use tz::{date_key, parse_date_key, parse_time_of_day, today_key, DISPLAY_TZ};
pub use week::{compute_week_window, is_past_day, week_key_for_date, week_window_for_date, WeekWindow};
