//! Async planner client.
//!
//! Wraps a [`Planner`] over SQLite in `Arc<Mutex<_>>` and runs every call on
//! the blocking pool, so it can be cloned freely across tasks.

use chrono::{DateTime, NaiveDate, Utc};
use homeboard_calendar::{Event, EventDraft, RecurrenceRule};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};

use crate::backend::{Change, Collection, EventFilter, StoreError, StoreResult, TaskFilter};
use crate::planner::{Planner, WeekBoard};
use crate::records::{
    EventPatch, Folder, FolderDraft, FolderPatch, NoteDraft, Setting, Task, TaskDraft, TaskPatch,
    WeeklyNote,
};
use crate::sqlite_store::SqliteStore;

/// Cloneable async handle to a SQLite-backed planner.
#[derive(Clone)]
pub struct PlannerClient {
    planner: Arc<Mutex<Planner<SqliteStore>>>,
    changes: broadcast::Sender<Change>,
}

impl PlannerClient {
    pub fn new(planner: Planner<SqliteStore>) -> Self {
        let changes = planner.store().change_sender();
        Self {
            planner: Arc::new(Mutex::new(planner)),
            changes,
        }
    }

    /// Subscribe to committed changes, optionally limited to one collection.
    pub fn subscribe(&self, collection: Option<Collection>) -> Subscription {
        Subscription {
            rx: self.changes.subscribe(),
            collection,
        }
    }

    async fn run<T, F>(&self, f: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Planner<SqliteStore>) -> StoreResult<T> + Send + 'static,
    {
        let planner = self.planner.clone();
        tokio::task::spawn_blocking(move || f(&*planner.lock()))
            .await
            .map_err(|e| StoreError::Other(anyhow::anyhow!("Planner task failed: {}", e)))?
    }

    // Events

    pub async fn create_event(
        &self,
        draft: EventDraft,
        rule: Option<RecurrenceRule>,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<Event>> {
        self.run(move |p| p.create_event(draft, rule, now)).await
    }

    pub async fn events(&self, filter: EventFilter) -> StoreResult<Vec<Event>> {
        self.run(move |p| p.events(&filter)).await
    }

    pub async fn event(&self, id: i64) -> StoreResult<Event> {
        self.run(move |p| p.event(id)).await
    }

    pub async fn edit_event(&self, id: i64, patch: EventPatch) -> StoreResult<Event> {
        self.run(move |p| p.edit_event(id, &patch)).await
    }

    pub async fn move_event_to_tomorrow(&self, id: i64, now: DateTime<Utc>) -> StoreResult<Event> {
        self.run(move |p| p.move_event_to_tomorrow(id, now)).await
    }

    pub async fn move_event_to_next_week(&self, id: i64, now: DateTime<Utc>) -> StoreResult<Event> {
        self.run(move |p| p.move_event_to_next_week(id, now)).await
    }

    pub async fn move_event_to_date(
        &self,
        id: i64,
        target: NaiveDate,
        now: DateTime<Utc>,
    ) -> StoreResult<Event> {
        self.run(move |p| p.move_event_to_date(id, target, now)).await
    }

    pub async fn duplicate_event(
        &self,
        id: i64,
        target: NaiveDate,
        now: DateTime<Utc>,
    ) -> StoreResult<Event> {
        self.run(move |p| p.duplicate_event(id, target, now)).await
    }

    pub async fn delete_event(&self, id: i64) -> StoreResult<usize> {
        self.run(move |p| p.delete_event(id)).await
    }

    // Board

    pub async fn week_board(&self, now: DateTime<Utc>) -> StoreResult<WeekBoard> {
        self.run(move |p| p.week_board(now)).await
    }

    // Tasks

    pub async fn tasks(&self, filter: TaskFilter) -> StoreResult<Vec<Task>> {
        self.run(move |p| p.tasks(&filter)).await
    }

    pub async fn add_task(&self, draft: TaskDraft) -> StoreResult<Task> {
        self.run(move |p| p.add_task(&draft)).await
    }

    pub async fn edit_task(&self, id: i64, patch: TaskPatch) -> StoreResult<Task> {
        self.run(move |p| p.edit_task(id, &patch)).await
    }

    pub async fn toggle_task(&self, id: i64) -> StoreResult<Task> {
        self.run(move |p| p.toggle_task(id)).await
    }

    pub async fn move_task_to_next_week(&self, id: i64) -> StoreResult<Task> {
        self.run(move |p| p.move_task_to_next_week(id)).await
    }

    pub async fn delete_task(&self, id: i64) -> StoreResult<bool> {
        self.run(move |p| p.delete_task(id)).await
    }

    // Folders

    pub async fn folders(&self) -> StoreResult<Vec<Folder>> {
        self.run(|p| p.folders()).await
    }

    pub async fn create_folder(&self, draft: FolderDraft) -> StoreResult<Folder> {
        self.run(move |p| p.create_folder(&draft)).await
    }

    pub async fn update_folder(&self, id: i64, patch: FolderPatch) -> StoreResult<Folder> {
        self.run(move |p| p.update_folder(id, &patch)).await
    }

    pub async fn delete_folder(&self, id: i64) -> StoreResult<bool> {
        self.run(move |p| p.delete_folder(id)).await
    }

    // Notes

    pub async fn notes_for_week(&self, week_key: String) -> StoreResult<Vec<WeeklyNote>> {
        self.run(move |p| p.notes_for_week(&week_key)).await
    }

    pub async fn add_note(&self, draft: NoteDraft) -> StoreResult<WeeklyNote> {
        self.run(move |p| p.add_note(&draft)).await
    }

    pub async fn mark_note_seen(&self, id: i64) -> StoreResult<WeeklyNote> {
        self.run(move |p| p.mark_note_seen(id)).await
    }

    pub async fn delete_note(&self, id: i64) -> StoreResult<bool> {
        self.run(move |p| p.delete_note(id)).await
    }

    // Settings

    pub async fn setting(&self, key: String) -> StoreResult<Option<Setting>> {
        self.run(move |p| p.setting(&key)).await
    }

    pub async fn settings(&self) -> StoreResult<Vec<Setting>> {
        self.run(|p| p.settings()).await
    }

    pub async fn set_setting(&self, key: String, value: serde_json::Value) -> StoreResult<Setting> {
        self.run(move |p| p.set_setting(&key, &value)).await
    }

    pub async fn delete_setting(&self, key: String) -> StoreResult<bool> {
        self.run(move |p| p.delete_setting(&key)).await
    }
}

/// Stream of committed changes, filtered to one collection or all of them.
pub struct Subscription {
    rx: broadcast::Receiver<Change>,
    collection: Option<Collection>,
}

impl Subscription {
    /// Wait for the next matching change.
    ///
    /// Returns `None` once the store is gone. A subscriber that falls behind
    /// skips the missed changes and keeps going.
    pub async fn recv(&mut self) -> Option<Change> {
        loop {
            match self.rx.recv().await {
                Ok(change) => {
                    if self.matches(&change) {
                        return Some(change);
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("Change subscriber lagged, skipped {} changes", skipped);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    fn matches(&self, change: &Change) -> bool {
        self.collection.map_or(true, |c| c == change.collection)
    }
}
