//! Plain CRUD records kept alongside calendar events: tasks, folders, weekly
//! notes and dashboard settings.

use chrono::{DateTime, NaiveTime, Utc, Weekday};
use homeboard_calendar::{parse_weekday_label, weekday_label};
use serde::{Deserialize, Serialize};

/// Board column a task sits in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskDay {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
    /// Not scheduled on a particular day of the week.
    Overflow,
}

impl TaskDay {
    pub fn as_str(&self) -> &'static str {
        match self.weekday() {
            Some(day) => weekday_label(day),
            None => "overflow",
        }
    }

    /// Parse a stored label; unknown labels land in the overflow column.
    pub fn parse(label: &str) -> Self {
        if label.trim().eq_ignore_ascii_case("overflow") {
            return TaskDay::Overflow;
        }
        parse_weekday_label(label)
            .map(TaskDay::from)
            .unwrap_or(TaskDay::Overflow)
    }

    pub fn weekday(&self) -> Option<Weekday> {
        match self {
            TaskDay::Monday => Some(Weekday::Mon),
            TaskDay::Tuesday => Some(Weekday::Tue),
            TaskDay::Wednesday => Some(Weekday::Wed),
            TaskDay::Thursday => Some(Weekday::Thu),
            TaskDay::Friday => Some(Weekday::Fri),
            TaskDay::Saturday => Some(Weekday::Sat),
            TaskDay::Sunday => Some(Weekday::Sun),
            TaskDay::Overflow => None,
        }
    }

    /// All columns in board order.
    pub fn all() -> &'static [TaskDay] {
        &[
            TaskDay::Monday,
            TaskDay::Tuesday,
            TaskDay::Wednesday,
            TaskDay::Thursday,
            TaskDay::Friday,
            TaskDay::Saturday,
            TaskDay::Sunday,
            TaskDay::Overflow,
        ]
    }
}

impl From<Weekday> for TaskDay {
    fn from(day: Weekday) -> Self {
        match day {
            Weekday::Mon => TaskDay::Monday,
            Weekday::Tue => TaskDay::Tuesday,
            Weekday::Wed => TaskDay::Wednesday,
            Weekday::Thu => TaskDay::Thursday,
            Weekday::Fri => TaskDay::Friday,
            Weekday::Sat => TaskDay::Saturday,
            Weekday::Sun => TaskDay::Sunday,
        }
    }
}

/// Task priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[default]
    None,
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::None => "none",
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "low" => Priority::Low,
            "medium" => Priority::Medium,
            "high" => Priority::High,
            _ => Priority::None,
        }
    }
}

/// A task on a weekly board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub folder: Option<String>,
    /// Board (owner) the task belongs to.
    pub board: String,
    /// Week key (Monday's date) of the week the task is planned in.
    pub week_start: String,
    pub day_of_week: TaskDay,
    pub priority: Priority,
    pub completed: bool,
    pub sort_order: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request to create a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDraft {
    pub title: String,
    pub description: Option<String>,
    pub folder: Option<String>,
    pub board: String,
    pub week_start: String,
    pub day_of_week: TaskDay,
    pub priority: Priority,
    pub sort_order: i64,
}

impl TaskDraft {
    pub fn new(
        title: impl Into<String>,
        board: impl Into<String>,
        week_start: impl Into<String>,
        day_of_week: TaskDay,
    ) -> Self {
        Self {
            title: title.into(),
            description: None,
            folder: None,
            board: board.into(),
            week_start: week_start.into(),
            day_of_week,
            priority: Priority::None,
            sort_order: 0,
        }
    }
}

/// Partial task update; only `Some` fields are applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub folder: Option<Option<String>>,
    pub week_start: Option<String>,
    pub day_of_week: Option<TaskDay>,
    pub priority: Option<Priority>,
    pub completed: Option<bool>,
    pub sort_order: Option<i64>,
}

/// Folder used to colour and group items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Folder {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    /// CSS-style colour, e.g. `#3b82f6`.
    pub color: String,
    pub sort_order: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FolderDraft {
    pub name: String,
    pub description: Option<String>,
    pub color: String,
    pub sort_order: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FolderPatch {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub color: Option<String>,
    pub sort_order: Option<i64>,
}

/// A note left for the family on a given week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyNote {
    pub id: i64,
    pub content: String,
    pub author: String,
    pub week_start: String,
    pub seen: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteDraft {
    pub content: String,
    pub author: String,
    pub week_start: String,
}

/// A dashboard setting (vision statement, header words, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Setting {
    pub key: String,
    pub value: serde_json::Value,
    pub updated_at: DateTime<Utc>,
}

/// Partial event update.
///
/// Recurrence can't be edited: changing an existing event never re-expands
/// its series.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub folder: Option<Option<String>>,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub all_day: Option<bool>,
    pub end_time: Option<Option<NaiveTime>>,
}

impl EventPatch {
    pub fn reschedule(scheduled_for: DateTime<Utc>) -> Self {
        Self {
            scheduled_for: Some(scheduled_for),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
