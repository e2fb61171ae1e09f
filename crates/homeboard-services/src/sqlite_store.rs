//! SQLite-backed record store.
//!
//! All instants are stored as RFC 3339 UTC strings with second precision, so
//! lexicographic comparison in SQL matches chronological order.

use chrono::{DateTime, NaiveTime, SecondsFormat, Utc};
use homeboard_calendar::{parse_time_of_day, Event, EventDraft, RecurrenceFields, RecurrenceRule};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use tokio::sync::broadcast;

use crate::backend::{
    Change, ChangeKind, Collection, EventFilter, ExpandFn, RecordStore, StoreError, StoreResult,
    TaskFilter,
};
use crate::records::{
    EventPatch, Folder, FolderDraft, FolderPatch, NoteDraft, Priority, Setting, Task, TaskDay,
    TaskDraft, TaskPatch, WeeklyNote,
};

const SCHEMA_VERSION: i32 = 2;

/// Capacity of the change channel; slow subscribers see `Lagged` past this.
const CHANGE_CHANNEL_CAPACITY: usize = 256;

const EVENT_COLUMNS: &str = "id, title, description, folder, scheduled_for, all_day, end_time, \
     recurrence_type, recurrence_interval, recurrence_end_date, recurrence_days, \
     recurrence_count, recurrence_parent_id, created_at";

const TASK_COLUMNS: &str = "id, title, description, folder, board, week_start, day_of_week, \
     priority, completed, sort_order, created_at, updated_at";

/// Local SQLite storage for events, tasks, folders, notes and settings
pub struct SqliteStore {
    conn: Connection,
    changes: broadcast::Sender<Change>,
}

impl SqliteStore {
    /// Open or create the database at `path`, migrating older schemas.
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let conn = Connection::open(path)
            .map_err(|e| anyhow::anyhow!("Failed to open database {}: {}", path.display(), e))?;
        Self::with_connection(conn)
    }

    /// Create an in-memory store (for tests and previews).
    pub fn in_memory() -> anyhow::Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> anyhow::Result<Self> {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        let store = Self { conn, changes };
        store.init_schema()?;
        Ok(store)
    }

    /// Sender half of the change channel, for handing out extra subscriptions.
    pub fn change_sender(&self) -> broadcast::Sender<Change> {
        self.changes.clone()
    }

    /// Initialize database schema and run migrations if needed
    fn init_schema(&self) -> anyhow::Result<()> {
        self.conn
            .execute("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL)", [])?;

        let version: i32 = self
            .conn
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| row.get(0))
            .optional()?
            .unwrap_or(0);

        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                description TEXT,
                folder TEXT,
                scheduled_for TEXT NOT NULL,
                all_day INTEGER NOT NULL DEFAULT 0,
                end_time TEXT,
                recurrence_type TEXT,
                recurrence_interval INTEGER,
                recurrence_end_date TEXT,
                recurrence_days TEXT,
                recurrence_count INTEGER,
                recurrence_parent_id INTEGER,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS tasks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                description TEXT,
                folder TEXT,
                board TEXT NOT NULL,
                week_start TEXT NOT NULL,
                day_of_week TEXT NOT NULL,
                priority TEXT NOT NULL DEFAULT 'none',
                completed INTEGER NOT NULL DEFAULT 0,
                sort_order INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS folders (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                description TEXT,
                color TEXT NOT NULL,
                sort_order INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS weekly_notes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                content TEXT NOT NULL,
                author TEXT NOT NULL,
                week_start TEXT NOT NULL,
                seen INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )?;

        if version < SCHEMA_VERSION {
            self.migrate_to_v2()?;
        }

        self.conn.execute_batch(
            r#"
            CREATE INDEX IF NOT EXISTS idx_events_scheduled_for ON events(scheduled_for);
            CREATE INDEX IF NOT EXISTS idx_events_parent ON events(recurrence_parent_id);
            CREATE INDEX IF NOT EXISTS idx_tasks_week ON tasks(week_start, board);
            CREATE INDEX IF NOT EXISTS idx_notes_week ON weekly_notes(week_start);
            "#,
        )?;

        if version == 0 {
            self.conn
                .execute("INSERT INTO schema_version (version) VALUES (?1)", [SCHEMA_VERSION])?;
        } else if version < SCHEMA_VERSION {
            self.conn
                .execute("UPDATE schema_version SET version = ?1", [SCHEMA_VERSION])?;
        }

        Ok(())
    }

    /// v1 event tables predate count-bounded and weekday-based recurrence.
    fn migrate_to_v2(&self) -> anyhow::Result<()> {
        let columns: Vec<String> = self
            .conn
            .prepare("PRAGMA table_info(events)")?
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<rusqlite::Result<_>>()?;

        for (column, sql_type) in [("recurrence_count", "INTEGER"), ("recurrence_days", "TEXT")] {
            if !columns.iter().any(|c| c == column) {
                tracing::info!("Migrating events table: adding {}", column);
                self.conn
                    .execute(&format!("ALTER TABLE events ADD COLUMN {} {}", column, sql_type), [])
                    .map_err(|e| anyhow::anyhow!("Failed to add column {}: {}", column, e))?;
            }
        }
        Ok(())
    }

    fn notify(&self, change: Change) {
        // No receivers is not an error.
        let _ = self.changes.send(change);
    }

    fn require_event(&self, id: i64) -> StoreResult<Event> {
        fetch_event(&self.conn, id)?.ok_or_else(|| StoreError::not_found(format!("event {}", id)))
    }

    fn require_task(&self, id: i64) -> StoreResult<Task> {
        self.get_task(id)?
            .ok_or_else(|| StoreError::not_found(format!("task {}", id)))
    }

    fn child_ids(&self, parent_id: i64) -> StoreResult<Vec<i64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id FROM events WHERE recurrence_parent_id = ?1 ORDER BY id")?;
        let ids = stmt
            .query_map([parent_id], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<i64>>>()?;
        Ok(ids)
    }
}

impl RecordStore for SqliteStore {
    fn list_events(&self, filter: &EventFilter) -> StoreResult<Vec<Event>> {
        let sql = format!(
            "SELECT {} FROM events
             WHERE (?1 IS NULL OR scheduled_for >= ?1)
               AND (?2 IS NULL OR scheduled_for < ?2)
               AND (?3 IS NULL OR recurrence_parent_id = ?3)
             ORDER BY scheduled_for, id",
            EVENT_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let events = stmt
            .query_map(
                params![
                    filter.from.map(format_instant),
                    filter.until.map(format_instant),
                    filter.parent_id
                ],
                row_to_event,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(events)
    }

    fn get_event(&self, id: i64) -> StoreResult<Option<Event>> {
        Ok(fetch_event(&self.conn, id)?)
    }

    fn insert_event(&self, draft: &EventDraft) -> StoreResult<Event> {
        draft
            .validate()
            .map_err(|e| StoreError::validation(e.to_string()))?;
        let id = insert_event_row(&self.conn, draft)?;
        let event = self.require_event(id)?;

        tracing::debug!("Inserted event {} on {}", id, event.date_key());
        self.notify(Change::new(Collection::Events, ChangeKind::Insert, id));
        Ok(event)
    }

    fn insert_series(&self, parent: &EventDraft, expand: &ExpandFn<'_>) -> StoreResult<Vec<Event>> {
        parent
            .validate()
            .map_err(|e| StoreError::validation(e.to_string()))?;

        // Dropping the transaction without commit rolls everything back.
        let tx = self.conn.unchecked_transaction()?;

        let parent_id = insert_event_row(&tx, parent)?;
        let parent_event = fetch_event(&tx, parent_id)?
            .ok_or_else(|| StoreError::storage(format!("event {} vanished after insert", parent_id)))?;

        let children = expand(&parent_event)?;

        let mut series = Vec::with_capacity(children.len() + 1);
        series.push(parent_event);
        for child in &children {
            let id = insert_event_row(&tx, child)?;
            let event = fetch_event(&tx, id)?
                .ok_or_else(|| StoreError::storage(format!("event {} vanished after insert", id)))?;
            series.push(event);
        }

        tx.commit()?;

        tracing::debug!(
            "Inserted series for event {} with {} children",
            parent_id,
            children.len()
        );
        for event in &series {
            self.notify(Change::new(Collection::Events, ChangeKind::Insert, event.id));
        }
        Ok(series)
    }

    fn update_event(&self, id: i64, patch: &EventPatch) -> StoreResult<Event> {
        let mut event = self.require_event(id)?;

        if let Some(title) = &patch.title {
            if title.trim().is_empty() {
                return Err(StoreError::validation("event title is empty"));
            }
            event.title = title.clone();
        }
        if let Some(description) = &patch.description {
            event.description = description.clone();
        }
        if let Some(folder) = &patch.folder {
            event.folder = folder.clone();
        }
        if let Some(scheduled_for) = patch.scheduled_for {
            event.scheduled_for = scheduled_for;
        }
        if let Some(all_day) = patch.all_day {
            event.all_day = all_day;
        }
        if let Some(end_time) = patch.end_time {
            event.end_time = end_time;
        }
        if let (Some(end), Some(start)) = (event.end_time, event.time()) {
            if end < start {
                return Err(StoreError::validation(format!(
                    "end time {} is before start time {}",
                    end.format("%H:%M"),
                    start.format("%H:%M")
                )));
            }
        }

        self.conn.execute(
            "UPDATE events
             SET title = ?1, description = ?2, folder = ?3, scheduled_for = ?4,
                 all_day = ?5, end_time = ?6
             WHERE id = ?7",
            params![
                event.title,
                event.description,
                event.folder,
                format_instant(event.scheduled_for),
                event.all_day,
                event.end_time.map(format_time),
                id
            ],
        )?;

        tracing::debug!("Updated event {}", id);
        self.notify(Change::new(Collection::Events, ChangeKind::Update, id));
        self.require_event(id)
    }

    fn delete_event(&self, id: i64) -> StoreResult<bool> {
        let rows = self.conn.execute("DELETE FROM events WHERE id = ?1", [id])?;
        if rows > 0 {
            tracing::debug!("Deleted event {}", id);
            self.notify(Change::new(Collection::Events, ChangeKind::Delete, id));
        }
        Ok(rows > 0)
    }

    fn delete_event_series(&self, parent_id: i64) -> StoreResult<usize> {
        let mut ids = self.child_ids(parent_id)?;

        let tx = self.conn.unchecked_transaction()?;
        let children = tx.execute("DELETE FROM events WHERE recurrence_parent_id = ?1", [parent_id])?;
        let parent = tx.execute("DELETE FROM events WHERE id = ?1", [parent_id])?;
        tx.commit()?;

        if parent > 0 {
            ids.push(parent_id);
        }
        tracing::debug!("Deleted event {} and {} children", parent_id, children);
        for id in ids {
            self.notify(Change::new(Collection::Events, ChangeKind::Delete, id));
        }
        Ok(children + parent)
    }

    fn detach_children(&self, parent_id: i64) -> StoreResult<usize> {
        let ids = self.child_ids(parent_id)?;
        let rows = self.conn.execute(
            "UPDATE events
             SET recurrence_parent_id = NULL, recurrence_type = NULL, recurrence_interval = NULL,
                 recurrence_end_date = NULL, recurrence_days = NULL, recurrence_count = NULL
             WHERE recurrence_parent_id = ?1",
            [parent_id],
        )?;

        tracing::debug!("Detached {} children from event {}", rows, parent_id);
        for id in ids {
            self.notify(Change::new(Collection::Events, ChangeKind::Update, id));
        }
        Ok(rows)
    }

    fn list_tasks(&self, filter: &TaskFilter) -> StoreResult<Vec<Task>> {
        let sql = format!(
            "SELECT {} FROM tasks
             WHERE (?1 IS NULL OR week_start = ?1)
               AND (?2 IS NULL OR board = ?2)
               AND (?3 IS NULL OR day_of_week = ?3)
             ORDER BY sort_order, id",
            TASK_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let tasks = stmt
            .query_map(
                params![
                    filter.week_start,
                    filter.board,
                    filter.day.map(|d| d.as_str())
                ],
                row_to_task,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tasks)
    }

    fn get_task(&self, id: i64) -> StoreResult<Option<Task>> {
        let sql = format!("SELECT {} FROM tasks WHERE id = ?1", TASK_COLUMNS);
        Ok(self.conn.query_row(&sql, [id], row_to_task).optional()?)
    }

    fn insert_task(&self, draft: &TaskDraft) -> StoreResult<Task> {
        if draft.title.trim().is_empty() {
            return Err(StoreError::validation("task title is empty"));
        }
        let now = format_instant(Utc::now());
        self.conn.execute(
            "INSERT INTO tasks (title, description, folder, board, week_start, day_of_week,
                                priority, completed, sort_order, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, ?8, ?9, ?9)",
            params![
                draft.title,
                draft.description,
                draft.folder,
                draft.board,
                draft.week_start,
                draft.day_of_week.as_str(),
                draft.priority.as_str(),
                draft.sort_order,
                now
            ],
        )?;
        let id = self.conn.last_insert_rowid();

        tracing::debug!("Inserted task {} for board {}", id, draft.board);
        self.notify(Change::new(Collection::Tasks, ChangeKind::Insert, id));
        self.require_task(id)
    }

    fn update_task(&self, id: i64, patch: &TaskPatch) -> StoreResult<Task> {
        let mut task = self.require_task(id)?;

        if let Some(title) = &patch.title {
            if title.trim().is_empty() {
                return Err(StoreError::validation("task title is empty"));
            }
            task.title = title.clone();
        }
        if let Some(description) = &patch.description {
            task.description = description.clone();
        }
        if let Some(folder) = &patch.folder {
            task.folder = folder.clone();
        }
        if let Some(week_start) = &patch.week_start {
            task.week_start = week_start.clone();
        }
        if let Some(day) = patch.day_of_week {
            task.day_of_week = day;
        }
        if let Some(priority) = patch.priority {
            task.priority = priority;
        }
        if let Some(completed) = patch.completed {
            task.completed = completed;
        }
        if let Some(sort_order) = patch.sort_order {
            task.sort_order = sort_order;
        }

        self.conn.execute(
            "UPDATE tasks
             SET title = ?1, description = ?2, folder = ?3, week_start = ?4, day_of_week = ?5,
                 priority = ?6, completed = ?7, sort_order = ?8, updated_at = ?9
             WHERE id = ?10",
            params![
                task.title,
                task.description,
                task.folder,
                task.week_start,
                task.day_of_week.as_str(),
                task.priority.as_str(),
                task.completed,
                task.sort_order,
                format_instant(Utc::now()),
                id
            ],
        )?;

        tracing::debug!("Updated task {}", id);
        self.notify(Change::new(Collection::Tasks, ChangeKind::Update, id));
        self.require_task(id)
    }

    fn delete_task(&self, id: i64) -> StoreResult<bool> {
        let rows = self.conn.execute("DELETE FROM tasks WHERE id = ?1", [id])?;
        if rows > 0 {
            tracing::debug!("Deleted task {}", id);
            self.notify(Change::new(Collection::Tasks, ChangeKind::Delete, id));
        }
        Ok(rows > 0)
    }

    fn list_folders(&self) -> StoreResult<Vec<Folder>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, description, color, sort_order, created_at
             FROM folders ORDER BY sort_order, name",
        )?;
        let folders = stmt
            .query_map([], row_to_folder)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(folders)
    }

    fn insert_folder(&self, draft: &FolderDraft) -> StoreResult<Folder> {
        if draft.name.trim().is_empty() {
            return Err(StoreError::validation("folder name is empty"));
        }
        self.conn.execute(
            "INSERT INTO folders (name, description, color, sort_order, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                draft.name,
                draft.description,
                draft.color,
                draft.sort_order,
                format_instant(Utc::now())
            ],
        )?;
        let id = self.conn.last_insert_rowid();

        tracing::debug!("Inserted folder {}", id);
        self.notify(Change::new(Collection::Folders, ChangeKind::Insert, id));
        fetch_folder(&self.conn, id)?.ok_or_else(|| StoreError::not_found(format!("folder {}", id)))
    }

    fn update_folder(&self, id: i64, patch: &FolderPatch) -> StoreResult<Folder> {
        let mut folder = fetch_folder(&self.conn, id)?
            .ok_or_else(|| StoreError::not_found(format!("folder {}", id)))?;

        if let Some(name) = &patch.name {
            if name.trim().is_empty() {
                return Err(StoreError::validation("folder name is empty"));
            }
            folder.name = name.clone();
        }
        if let Some(description) = &patch.description {
            folder.description = description.clone();
        }
        if let Some(color) = &patch.color {
            folder.color = color.clone();
        }
        if let Some(sort_order) = patch.sort_order {
            folder.sort_order = sort_order;
        }

        self.conn.execute(
            "UPDATE folders SET name = ?1, description = ?2, color = ?3, sort_order = ?4
             WHERE id = ?5",
            params![folder.name, folder.description, folder.color, folder.sort_order, id],
        )?;

        tracing::debug!("Updated folder {}", id);
        self.notify(Change::new(Collection::Folders, ChangeKind::Update, id));
        Ok(folder)
    }

    fn delete_folder(&self, id: i64) -> StoreResult<bool> {
        let rows = self.conn.execute("DELETE FROM folders WHERE id = ?1", [id])?;
        if rows > 0 {
            tracing::debug!("Deleted folder {}", id);
            self.notify(Change::new(Collection::Folders, ChangeKind::Delete, id));
        }
        Ok(rows > 0)
    }

    fn list_notes(&self, week_start: Option<&str>) -> StoreResult<Vec<WeeklyNote>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, content, author, week_start, seen, created_at FROM weekly_notes
             WHERE (?1 IS NULL OR week_start = ?1)
             ORDER BY created_at DESC, id DESC",
        )?;
        let notes = stmt
            .query_map([week_start], row_to_note)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(notes)
    }

    fn insert_note(&self, draft: &NoteDraft) -> StoreResult<WeeklyNote> {
        if draft.content.trim().is_empty() {
            return Err(StoreError::validation("note is empty"));
        }
        self.conn.execute(
            "INSERT INTO weekly_notes (content, author, week_start, seen, created_at)
             VALUES (?1, ?2, ?3, 0, ?4)",
            params![draft.content, draft.author, draft.week_start, format_instant(Utc::now())],
        )?;
        let id = self.conn.last_insert_rowid();

        tracing::debug!("Inserted note {} for week {}", id, draft.week_start);
        self.notify(Change::new(Collection::Notes, ChangeKind::Insert, id));
        fetch_note(&self.conn, id)?.ok_or_else(|| StoreError::not_found(format!("note {}", id)))
    }

    fn set_note_seen(&self, id: i64, seen: bool) -> StoreResult<WeeklyNote> {
        let rows = self
            .conn
            .execute("UPDATE weekly_notes SET seen = ?1 WHERE id = ?2", params![seen, id])?;
        if rows == 0 {
            return Err(StoreError::not_found(format!("note {}", id)));
        }

        tracing::debug!("Marked note {} seen={}", id, seen);
        self.notify(Change::new(Collection::Notes, ChangeKind::Update, id));
        fetch_note(&self.conn, id)?.ok_or_else(|| StoreError::not_found(format!("note {}", id)))
    }

    fn delete_note(&self, id: i64) -> StoreResult<bool> {
        let rows = self.conn.execute("DELETE FROM weekly_notes WHERE id = ?1", [id])?;
        if rows > 0 {
            tracing::debug!("Deleted note {}", id);
            self.notify(Change::new(Collection::Notes, ChangeKind::Delete, id));
        }
        Ok(rows > 0)
    }

    fn get_setting(&self, key: &str) -> StoreResult<Option<Setting>> {
        Ok(self
            .conn
            .query_row(
                "SELECT key, value, updated_at FROM settings WHERE key = ?1",
                [key],
                row_to_setting,
            )
            .optional()?)
    }

    fn list_settings(&self) -> StoreResult<Vec<Setting>> {
        let mut stmt = self
            .conn
            .prepare("SELECT key, value, updated_at FROM settings ORDER BY key")?;
        let settings = stmt
            .query_map([], row_to_setting)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(settings)
    }

    fn put_setting(&self, key: &str, value: &serde_json::Value) -> StoreResult<Setting> {
        if key.trim().is_empty() {
            return Err(StoreError::validation("setting key is empty"));
        }
        let encoded = serde_json::to_string(value).map_err(anyhow::Error::from)?;
        let existed = self.get_setting(key)?.is_some();

        self.conn.execute(
            "INSERT INTO settings (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, encoded, format_instant(Utc::now())],
        )?;

        tracing::debug!("Stored setting {}", key);
        let kind = if existed { ChangeKind::Update } else { ChangeKind::Insert };
        self.notify(Change::setting(kind, key));
        self.get_setting(key)?
            .ok_or_else(|| StoreError::not_found(format!("setting {}", key)))
    }

    fn delete_setting(&self, key: &str) -> StoreResult<bool> {
        let rows = self.conn.execute("DELETE FROM settings WHERE key = ?1", [key])?;
        if rows > 0 {
            tracing::debug!("Deleted setting {}", key);
            self.notify(Change::setting(ChangeKind::Delete, key));
        }
        Ok(rows > 0)
    }

    fn subscribe(&self) -> broadcast::Receiver<Change> {
        self.changes.subscribe()
    }
}

fn format_instant(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn format_time(time: NaiveTime) -> String {
    time.format("%H:%M:%S").to_string()
}

fn conversion_error<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn parse_instant(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

fn insert_event_row(conn: &Connection, draft: &EventDraft) -> rusqlite::Result<i64> {
    let fields = draft
        .recurrence
        .as_ref()
        .map(RecurrenceRule::to_fields)
        .unwrap_or_default();

    conn.execute(
        "INSERT INTO events (title, description, folder, scheduled_for, all_day, end_time,
                             recurrence_type, recurrence_interval, recurrence_end_date,
                             recurrence_days, recurrence_count, recurrence_parent_id, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            draft.title,
            draft.description,
            draft.folder,
            format_instant(draft.scheduled_for),
            draft.all_day,
            draft.end_time.map(format_time),
            fields.kind,
            fields.interval,
            fields.end_date,
            fields.days,
            fields.count,
            draft.recurrence_parent_id,
            format_instant(Utc::now())
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

fn fetch_event(conn: &Connection, id: i64) -> rusqlite::Result<Option<Event>> {
    let sql = format!("SELECT {} FROM events WHERE id = ?1", EVENT_COLUMNS);
    conn.query_row(&sql, [id], row_to_event).optional()
}

fn row_to_event(row: &Row<'_>) -> rusqlite::Result<Event> {
    let end_time = match row.get::<_, Option<String>>(6)? {
        Some(raw) => Some(parse_time_of_day(&raw).map_err(|e| conversion_error(6, e))?),
        None => None,
    };

    let fields = RecurrenceFields {
        kind: row.get(7)?,
        interval: row.get(8)?,
        end_date: row.get(9)?,
        days: row.get(10)?,
        count: row.get(11)?,
    };
    let recurrence = RecurrenceRule::from_fields(&fields).map_err(|e| conversion_error(7, e))?;

    Ok(Event {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        folder: row.get(3)?,
        scheduled_for: parse_instant(row, 4)?,
        all_day: row.get(5)?,
        end_time,
        recurrence,
        recurrence_parent_id: row.get(12)?,
        created_at: parse_instant(row, 13)?,
    })
}

fn row_to_task(row: &Row<'_>) -> rusqlite::Result<Task> {
    let day: String = row.get(6)?;
    let priority: String = row.get(7)?;
    Ok(Task {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        folder: row.get(3)?,
        board: row.get(4)?,
        week_start: row.get(5)?,
        day_of_week: TaskDay::parse(&day),
        priority: Priority::parse(&priority),
        completed: row.get(8)?,
        sort_order: row.get(9)?,
        created_at: parse_instant(row, 10)?,
        updated_at: parse_instant(row, 11)?,
    })
}

fn fetch_folder(conn: &Connection, id: i64) -> rusqlite::Result<Option<Folder>> {
    conn.query_row(
        "SELECT id, name, description, color, sort_order, created_at FROM folders WHERE id = ?1",
        [id],
        row_to_folder,
    )
    .optional()
}

fn row_to_folder(row: &Row<'_>) -> rusqlite::Result<Folder> {
    Ok(Folder {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        color: row.get(3)?,
        sort_order: row.get(4)?,
        created_at: parse_instant(row, 5)?,
    })
}

fn fetch_note(conn: &Connection, id: i64) -> rusqlite::Result<Option<WeeklyNote>> {
    conn.query_row(
        "SELECT id, content, author, week_start, seen, created_at FROM weekly_notes WHERE id = ?1",
        [id],
        row_to_note,
    )
    .optional()
}

fn row_to_note(row: &Row<'_>) -> rusqlite::Result<WeeklyNote> {
    Ok(WeeklyNote {
        id: row.get(0)?,
        content: row.get(1)?,
        author: row.get(2)?,
        week_start: row.get(3)?,
        seen: row.get(4)?,
        created_at: parse_instant(row, 5)?,
    })
}

fn row_to_setting(row: &Row<'_>) -> rusqlite::Result<Setting> {
    let raw: String = row.get(1)?;
    let value = serde_json::from_str(&raw).map_err(|e| conversion_error(1, e))?;
    Ok(Setting {
        key: row.get(0)?,
        value,
        updated_at: parse_instant(row, 2)?,
    })
}
