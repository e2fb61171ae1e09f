//! Record store trait and error types.
//!
//! `RecordStore` abstracts the persistence of events, tasks, folders, weekly
//! notes and settings. The calendar engine never talks to it directly; the
//! planner computes new values with the engine and hands them to the store.

use chrono::{DateTime, Utc};
use homeboard_calendar::{CalendarError, CalendarResult, Event, EventDraft};
use homeboard_core::{AppError, DatabaseError, RusqliteErrorExt};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast;

use crate::records::{
    EventPatch, Folder, FolderDraft, FolderPatch, NoteDraft, Setting, Task, TaskDay, TaskDraft,
    TaskPatch, WeeklyNote,
};

/// Errors that can occur during record store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Record was not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Validation error (e.g. blank title).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Database failure.
    #[error("Storage error: {0}")]
    Storage(#[from] DatabaseError),

    /// The calendar engine refused the change.
    #[error(transparent)]
    Rejected(#[from] CalendarError),

    /// A recurrence parent can't be deleted while it still has occurrences.
    #[error("Event {0} still has recurring occurrences")]
    HasChildren(i64),

    /// Generic error wrapper.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StoreError {
    /// Create a not found error.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a storage error.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(DatabaseError::QueryFailed(message.into()))
    }

    /// Returns a user-friendly message suitable for display in the UI.
    pub fn user_message(&self) -> String {
        match self {
            StoreError::NotFound(_) => "That item no longer exists. Refresh and try again.".into(),
            StoreError::Validation(msg) => msg.clone(),
            StoreError::Storage(e) => e.user_message().into(),
            StoreError::Rejected(e) => e.user_message(),
            StoreError::HasChildren(_) => {
                "Delete the repeating occurrences before deleting this event.".into()
            }
            StoreError::Other(_) => "An unexpected error occurred. Please try again.".into(),
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Storage(err.into_database_error())
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Storage(db) => AppError::Database(db),
            StoreError::Other(other) => AppError::Other(other),
            StoreError::NotFound(_) => AppError::Service(err.to_string()),
            StoreError::Validation(_) | StoreError::Rejected(_) | StoreError::HasChildren(_) => {
                AppError::Rejected(err.to_string())
            }
        }
    }
}

/// Result type for record store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Record collections a change can belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Events,
    Tasks,
    Folders,
    Notes,
    Settings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// Identifies the record a change touched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordKey {
    Id(i64),
    Key(String),
}

/// A committed change, broadcast to subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    pub collection: Collection,
    pub kind: ChangeKind,
    pub key: RecordKey,
}

impl Change {
    pub fn new(collection: Collection, kind: ChangeKind, id: i64) -> Self {
        Self {
            collection,
            kind,
            key: RecordKey::Id(id),
        }
    }

    pub fn setting(kind: ChangeKind, key: impl Into<String>) -> Self {
        Self {
            collection: Collection::Settings,
            kind,
            key: RecordKey::Key(key.into()),
        }
    }

    /// Numeric id of the record, if it has one.
    pub fn id(&self) -> Option<i64> {
        match self.key {
            RecordKey::Id(id) => Some(id),
            RecordKey::Key(_) => None,
        }
    }
}

/// Event listing filter. `from` is inclusive, `until` exclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilter {
    pub from: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub parent_id: Option<i64>,
}

impl EventFilter {
    pub fn between(from: DateTime<Utc>, until: DateTime<Utc>) -> Self {
        Self {
            from: Some(from),
            until: Some(until),
            parent_id: None,
        }
    }

    pub fn children_of(parent_id: i64) -> Self {
        Self {
            parent_id: Some(parent_id),
            ..Default::default()
        }
    }
}

/// Task listing filter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub week_start: Option<String>,
    pub board: Option<String>,
    pub day: Option<TaskDay>,
}

impl TaskFilter {
    pub fn week(week_start: impl Into<String>) -> Self {
        Self {
            week_start: Some(week_start.into()),
            ..Default::default()
        }
    }
}

/// Builds a series' children once the parent has been assigned an id.
pub type ExpandFn<'a> = dyn Fn(&Event) -> CalendarResult<Vec<EventDraft>> + 'a;

/// Trait for record storage backends.
///
/// Implementations don't need to be Sync; `PlannerClient` serializes access
/// through a Mutex. Every successful write publishes a [`Change`] after it
/// is committed.
pub trait RecordStore: Send {
    // Events

    /// List events ordered by `scheduled_for`.
    fn list_events(&self, filter: &EventFilter) -> StoreResult<Vec<Event>>;

    fn get_event(&self, id: i64) -> StoreResult<Option<Event>>;

    fn insert_event(&self, draft: &EventDraft) -> StoreResult<Event>;

    /// Insert a parent and the children `expand` derives from it, atomically.
    ///
    /// Returns the parent followed by its children. If `expand` fails or any
    /// insert fails, nothing is written.
    fn insert_series(&self, parent: &EventDraft, expand: &ExpandFn<'_>) -> StoreResult<Vec<Event>>;

    /// # Errors
    /// Returns `StoreError::NotFound` if the event doesn't exist.
    fn update_event(&self, id: i64, patch: &EventPatch) -> StoreResult<Event>;

    /// Returns `true` if a row was deleted.
    fn delete_event(&self, id: i64) -> StoreResult<bool>;

    /// Delete a parent and all of its children in one transaction.
    ///
    /// Returns the number of rows deleted.
    fn delete_event_series(&self, parent_id: i64) -> StoreResult<usize>;

    /// Clear `recurrence_parent_id` on all children of `parent_id`.
    fn detach_children(&self, parent_id: i64) -> StoreResult<usize>;

    // Tasks

    /// List tasks ordered by `sort_order`, then id.
    fn list_tasks(&self, filter: &TaskFilter) -> StoreResult<Vec<Task>>;
    fn get_task(&self, id: i64) -> StoreResult<Option<Task>>;
    fn insert_task(&self, draft: &TaskDraft) -> StoreResult<Task>;
    fn update_task(&self, id: i64, patch: &TaskPatch) -> StoreResult<Task>;
    fn delete_task(&self, id: i64) -> StoreResult<bool>;

    // Folders

    fn list_folders(&self) -> StoreResult<Vec<Folder>>;
    fn insert_folder(&self, draft: &FolderDraft) -> StoreResult<Folder>;
    fn update_folder(&self, id: i64, patch: &FolderPatch) -> StoreResult<Folder>;
    fn delete_folder(&self, id: i64) -> StoreResult<bool>;

    // Weekly notes

    /// Notes for a week, newest first. `None` lists every week.
    fn list_notes(&self, week_start: Option<&str>) -> StoreResult<Vec<WeeklyNote>>;
    fn insert_note(&self, draft: &NoteDraft) -> StoreResult<WeeklyNote>;
    fn set_note_seen(&self, id: i64, seen: bool) -> StoreResult<WeeklyNote>;
    fn delete_note(&self, id: i64) -> StoreResult<bool>;

    // Settings

    fn get_setting(&self, key: &str) -> StoreResult<Option<Setting>>;
    fn list_settings(&self) -> StoreResult<Vec<Setting>>;
    fn put_setting(&self, key: &str, value: &serde_json::Value) -> StoreResult<Setting>;
    fn delete_setting(&self, key: &str) -> StoreResult<bool>;

    /// Subscribe to committed changes across all collections.
    fn subscribe(&self) -> broadcast::Receiver<Change>;
}
