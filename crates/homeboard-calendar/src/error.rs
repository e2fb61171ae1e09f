//! Calendar engine error types.

use chrono::{NaiveDate, NaiveDateTime};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CalendarError {
    #[error("Cannot schedule event on {target}: date is before today ({today})")]
    PastDate { target: NaiveDate, today: NaiveDate },

    #[error("Invalid date key: {0}")]
    InvalidDateKey(String),

    #[error("Invalid time of day: {0}")]
    InvalidTime(String),

    #[error("Local time {0} cannot be resolved in the display timezone")]
    UnresolvableLocalTime(NaiveDateTime),

    #[error("Invalid recurrence rule: {0}")]
    InvalidRule(String),

    #[error("Recurrence expansion rejected: {0}")]
    MalformedBatch(String),
}

impl CalendarError {
    /// User-friendly error message for UI display.
    pub fn user_message(&self) -> String {
        match self {
            Self::PastDate { .. } => "Events can't be scheduled in the past.".to_string(),
            Self::InvalidDateKey(key) => format!("\"{}\" is not a valid date.", key),
            Self::InvalidTime(time) => format!("\"{}\" is not a valid time.", time),
            Self::UnresolvableLocalTime(_) => {
                "That time doesn't exist on the selected date.".to_string()
            }
            Self::InvalidRule(msg) => format!("Invalid repeat settings: {}", msg),
            Self::MalformedBatch(_) => {
                "The repeating event could not be created. Nothing was saved.".to_string()
            }
        }
    }

    /// Engine errors are validation failures; retrying the same input gives the same answer.
    pub fn is_retryable(&self) -> bool {
        false
    }
}

/// Result type for calendar engine operations.
pub type CalendarResult<T> = Result<T, CalendarError>;
