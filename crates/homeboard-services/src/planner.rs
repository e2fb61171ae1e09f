//! Planner service: the calendar engine wired to a record store.
//!
//! The engine decides (new instants, child occurrences, past flags); the
//! store persists. A refused change never reaches the store.

use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveTime, Utc};
use homeboard_calendar::{
    compute_week_window, default_all_day_cutoff, duplicate_to_date, ensure_not_past, expand,
    is_past_day, is_past_event, move_to_date, move_to_next_week, move_to_tomorrow, parse_date_key, tz,
    week_key_for_date, CalendarResult, Event, EventDraft, RecurrenceRule, WeekWindow,
};
use homeboard_core::{Config, DeletePolicy};
use serde::Serialize;
use tokio::sync::broadcast;

use crate::backend::{Change, EventFilter, RecordStore, StoreError, StoreResult, TaskFilter};
use crate::records::{
    EventPatch, Folder, FolderDraft, FolderPatch, NoteDraft, Setting, Task, TaskDay, TaskDraft,
    TaskPatch, WeeklyNote,
};

/// An event on the board together with its past flag.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoardEvent {
    pub event: Event,
    pub is_past: bool,
}

/// One civil day of the week board.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayColumn {
    pub date: NaiveDate,
    pub date_key: String,
    pub is_past: bool,
    pub events: Vec<BoardEvent>,
    pub tasks: Vec<Task>,
}

/// Everything the dashboard shows for one week.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekBoard {
    pub window: WeekWindow,
    /// Monday..Sunday
    pub days: Vec<DayColumn>,
    /// Tasks of the week not pinned to a day.
    pub overflow: Vec<Task>,
    pub notes: Vec<WeeklyNote>,
}

impl WeekBoard {
    pub fn unseen_notes(&self) -> usize {
        self.notes.iter().filter(|n| !n.seen).count()
    }
}

/// Calendar and board operations on top of a [`RecordStore`].
pub struct Planner<S: RecordStore> {
    store: S,
    all_day_cutoff: NaiveTime,
    delete_policy: DeletePolicy,
    boards: Vec<String>,
}

impl<S: RecordStore> Planner<S> {
    /// Build a planner using the calendar and board settings from `config`.
    pub fn new(store: S, config: &Config) -> Self {
        let all_day_cutoff = config.calendar.cutoff_time().unwrap_or_else(|| {
            tracing::warn!(
                "Invalid all-day cutoff {:?}, using default",
                config.calendar.all_day_cutoff
            );
            default_all_day_cutoff()
        });

        Self {
            store,
            all_day_cutoff,
            delete_policy: config.calendar.delete_policy,
            boards: config.boards.names.clone(),
        }
    }

    /// Build a planner with explicit calendar settings and no board restriction.
    pub fn with_settings(store: S, all_day_cutoff: NaiveTime, delete_policy: DeletePolicy) -> Self {
        Self {
            store,
            all_day_cutoff,
            delete_policy,
            boards: Vec::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn all_day_cutoff(&self) -> NaiveTime {
        self.all_day_cutoff
    }

    pub fn delete_policy(&self) -> DeletePolicy {
        self.delete_policy
    }

    /// Subscribe to committed changes.
    pub fn subscribe(&self) -> broadcast::Receiver<Change> {
        self.store.subscribe()
    }

    // Events

    /// Create an event, expanding `rule` into child occurrences.
    ///
    /// Returns the parent followed by its children. The whole series is
    /// written atomically; an invalid rule or a date before today writes nothing.
    pub fn create_event(
        &self,
        mut draft: EventDraft,
        rule: Option<RecurrenceRule>,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<Event>> {
        ensure_not_past(draft.date(), now).map_err(|err| {
            tracing::warn!("Rejected new event \"{}\": {}", draft.title, err);
            err
        })?;
        draft.recurrence_parent_id = None;

        let rule = match rule.filter(RecurrenceRule::repeats) {
            Some(rule) => rule,
            None => {
                draft.recurrence = None;
                return Ok(vec![self.store.insert_event(&draft)?]);
            }
        };

        rule.validate()?;
        draft.recurrence = Some(rule.clone());

        let expand_children = |parent: &Event| expand(parent, &rule);
        let series = self.store.insert_series(&draft, &expand_children)?;

        tracing::info!(
            "Created {} series \"{}\" with {} occurrences",
            rule.kind.as_str(),
            draft.title,
            series.len()
        );
        Ok(series)
    }

    pub fn event(&self, id: i64) -> StoreResult<Event> {
        self.store
            .get_event(id)?
            .ok_or_else(|| StoreError::not_found(format!("event {}", id)))
    }

    pub fn events(&self, filter: &EventFilter) -> StoreResult<Vec<Event>> {
        self.store.list_events(filter)
    }

    /// Edit title, description, folder or times. Never touches the rest of a series.
    pub fn edit_event(&self, id: i64, patch: &EventPatch) -> StoreResult<Event> {
        if patch.is_empty() {
            return self.event(id);
        }
        self.store.update_event(id, patch)
    }

    /// Move an event one day later, keeping its local time.
    pub fn move_event_to_tomorrow(&self, id: i64, now: DateTime<Utc>) -> StoreResult<Event> {
        self.reschedule(id, "tomorrow", |event| move_to_tomorrow(event, now))
    }

    /// Move an event one week later, keeping its local time.
    pub fn move_event_to_next_week(&self, id: i64, now: DateTime<Utc>) -> StoreResult<Event> {
        self.reschedule(id, "next week", |event| move_to_next_week(event, now))
    }

    /// Move an event to a chosen date, keeping its local time.
    pub fn move_event_to_date(
        &self,
        id: i64,
        target: NaiveDate,
        now: DateTime<Utc>,
    ) -> StoreResult<Event> {
        self.reschedule(id, "picked date", |event| move_to_date(event, target, now))
    }

    /// Copy an event onto `target` as a standalone event.
    pub fn duplicate_event(
        &self,
        id: i64,
        target: NaiveDate,
        now: DateTime<Utc>,
    ) -> StoreResult<Event> {
        let event = self.event(id)?;
        let draft = duplicate_to_date(&event, target, now).map_err(|err| {
            tracing::warn!("Rejected duplicate of event {}: {}", id, err);
            err
        })?;
        self.store.insert_event(&draft)
    }

    /// Delete an event, applying the configured policy to a parent's occurrences.
    ///
    /// Returns the number of events deleted.
    pub fn delete_event(&self, id: i64) -> StoreResult<usize> {
        let event = self.event(id)?;
        if !event.is_recurrence_parent() {
            return Ok(usize::from(self.store.delete_event(id)?));
        }

        match self.delete_policy {
            DeletePolicy::Cascade => self.store.delete_event_series(id),
            DeletePolicy::Orphan => {
                let detached = self.store.detach_children(id)?;
                tracing::debug!("Kept {} occurrences of event {} as standalone", detached, id);
                Ok(usize::from(self.store.delete_event(id)?))
            }
            DeletePolicy::Block => {
                let children = self.store.list_events(&EventFilter::children_of(id))?;
                if !children.is_empty() {
                    return Err(StoreError::HasChildren(id));
                }
                Ok(usize::from(self.store.delete_event(id)?))
            }
        }
    }

    fn reschedule<F>(&self, id: i64, label: &str, compute: F) -> StoreResult<Event>
    where
        F: FnOnce(&Event) -> CalendarResult<DateTime<Utc>>,
    {
        let event = self.event(id)?;
        match compute(&event) {
            Ok(scheduled_for) => {
                tracing::debug!("Moving event {} to {}", id, tz::civil_date(scheduled_for));
                self.store.update_event(id, &EventPatch::reschedule(scheduled_for))
            }
            Err(err) => {
                tracing::warn!("Rejected move of event {} to {}: {}", id, label, err);
                Err(err.into())
            }
        }
    }

    // Week board

    /// Assemble the board for the week containing `now`.
    pub fn week_board(&self, now: DateTime<Utc>) -> StoreResult<WeekBoard> {
        self.board_for(compute_week_window(now), now)
    }

    /// Assemble the board for an arbitrary week, with past flags relative to `now`.
    pub fn board_for(&self, window: WeekWindow, now: DateTime<Utc>) -> StoreResult<WeekBoard> {
        let from = tz::from_civil(window.monday(), NaiveTime::MIN)?;
        let until = tz::from_civil(window.next().monday(), NaiveTime::MIN)?;

        let events = self.store.list_events(&EventFilter::between(from, until))?;
        let tasks = self.store.list_tasks(&TaskFilter::week(window.week_key.as_str()))?;
        let notes = self.store.list_notes(Some(window.week_key.as_str()))?;

        let days = window
            .days
            .iter()
            .map(|&date| {
                let date_key = tz::date_key(date);
                DayColumn {
                    is_past: is_past_day(&date_key, now),
                    date_key,
                    date,
                    events: events
                        .iter()
                        .filter(|e| e.date() == date)
                        .map(|e| BoardEvent {
                            is_past: is_past_event(e, now, self.all_day_cutoff),
                            event: e.clone(),
                        })
                        .collect(),
                    tasks: tasks
                        .iter()
                        .filter(|t| t.day_of_week.weekday() == Some(date.weekday()))
                        .cloned()
                        .collect(),
                }
            })
            .collect();

        let overflow = tasks
            .into_iter()
            .filter(|t| t.day_of_week == TaskDay::Overflow)
            .collect();

        Ok(WeekBoard {
            window,
            days,
            overflow,
            notes,
        })
    }

    // Tasks

    pub fn tasks(&self, filter: &TaskFilter) -> StoreResult<Vec<Task>> {
        self.store.list_tasks(filter)
    }

    /// Add a task to one of the configured boards.
    pub fn add_task(&self, draft: &TaskDraft) -> StoreResult<Task> {
        if !self.boards.is_empty() && !self.boards.iter().any(|b| b == &draft.board) {
            return Err(StoreError::validation(format!("Unknown board: {}", draft.board)));
        }
        parse_date_key(&draft.week_start)?;
        self.store.insert_task(draft)
    }

    pub fn edit_task(&self, id: i64, patch: &TaskPatch) -> StoreResult<Task> {
        self.store.update_task(id, patch)
    }

    /// Flip a task's completed flag.
    pub fn toggle_task(&self, id: i64) -> StoreResult<Task> {
        let task = self.require_task(id)?;
        let patch = TaskPatch {
            completed: Some(!task.completed),
            ..Default::default()
        };
        self.store.update_task(id, &patch)
    }

    /// Carry a task over to the following week, same day column.
    pub fn move_task_to_next_week(&self, id: i64) -> StoreResult<Task> {
        let task = self.require_task(id)?;
        let week_start = parse_date_key(&task.week_start)?;
        let next = week_start
            .checked_add_days(Days::new(7))
            .ok_or_else(|| StoreError::validation(format!("No week after {}", task.week_start)))?;

        let patch = TaskPatch {
            week_start: Some(week_key_for_date(next)),
            ..Default::default()
        };
        self.store.update_task(id, &patch)
    }

    pub fn delete_task(&self, id: i64) -> StoreResult<bool> {
        self.store.delete_task(id)
    }

    fn require_task(&self, id: i64) -> StoreResult<Task> {
        self.store
            .get_task(id)?
            .ok_or_else(|| StoreError::not_found(format!("task {}", id)))
    }

    // Folders

    pub fn folders(&self) -> StoreResult<Vec<Folder>> {
        self.store.list_folders()
    }

    pub fn create_folder(&self, draft: &FolderDraft) -> StoreResult<Folder> {
        self.store.insert_folder(draft)
    }

    pub fn update_folder(&self, id: i64, patch: &FolderPatch) -> StoreResult<Folder> {
        self.store.update_folder(id, patch)
    }

    pub fn delete_folder(&self, id: i64) -> StoreResult<bool> {
        self.store.delete_folder(id)
    }

    // Notes

    pub fn notes_for_week(&self, week_key: &str) -> StoreResult<Vec<WeeklyNote>> {
        self.store.list_notes(Some(week_key))
    }

    pub fn add_note(&self, draft: &NoteDraft) -> StoreResult<WeeklyNote> {
        parse_date_key(&draft.week_start)?;
        self.store.insert_note(draft)
    }

    pub fn mark_note_seen(&self, id: i64) -> StoreResult<WeeklyNote> {
        self.store.set_note_seen(id, true)
    }

    pub fn delete_note(&self, id: i64) -> StoreResult<bool> {
        self.store.delete_note(id)
    }

    // Settings

    pub fn setting(&self, key: &str) -> StoreResult<Option<Setting>> {
        self.store.get_setting(key)
    }

    pub fn settings(&self) -> StoreResult<Vec<Setting>> {
        self.store.list_settings()
    }

    pub fn set_setting(&self, key: &str, value: &serde_json::Value) -> StoreResult<Setting> {
        self.store.put_setting(key, value)
    }

    pub fn delete_setting(&self, key: &str) -> StoreResult<bool> {
        self.store.delete_setting(key)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use crate::sqlite_store::SqliteStore;
    use chrono::Weekday;
    use homeboard_calendar::{CalendarError, EndCondition};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn at(on: NaiveDate, time: NaiveTime) -> DateTime<Utc> {
        tz::from_civil(on, time).unwrap()
    }

    fn planner(policy: DeletePolicy) -> Planner<SqliteStore> {
        Planner::with_settings(SqliteStore::in_memory().unwrap(), default_all_day_cutoff(), policy)
    }

    fn practice(planner: &Planner<SqliteStore>, count: u32) -> Vec<Event> {
        let draft = EventDraft::at("Practice", date(2024, 6, 3), Some(hm(18, 0))).unwrap();
        let rule = RecurrenceRule::weekly(
            vec![Weekday::Mon, Weekday::Wed],
            EndCondition::AfterCount(count),
        );
        planner
            .create_event(draft, Some(rule), at(date(2024, 6, 1), hm(12, 0)))
            .unwrap()
    }

    #[test]
    fn test_create_single_event() {
        let planner = planner(DeletePolicy::Cascade);
        let draft = EventDraft::at("Dentist", date(2024, 6, 5), Some(hm(9, 0))).unwrap();

        let now = at(date(2024, 6, 1), hm(12, 0));

        let created = planner
            .create_event(draft, Some(RecurrenceRule::none()), now)
            .unwrap();

        assert_eq!(created.len(), 1);
        assert!(created[0].recurrence.is_none());
    }

    #[test]
    fn test_create_series() {
        let planner = planner(DeletePolicy::Cascade);
        let series = practice(&planner, 6);

        let dates: Vec<_> = series.iter().map(Event::date).collect();
        assert_eq!(
            dates,
            vec![
                date(2024, 6, 3),
                date(2024, 6, 5),
                date(2024, 6, 10),
                date(2024, 6, 12),
                date(2024, 6, 17),
                date(2024, 6, 19),
            ]
        );
        assert!(series[1..]
            .iter()
            .all(|e| e.recurrence_parent_id == Some(series[0].id)));
    }

    #[test]
    fn test_invalid_rule_writes_nothing() {
        let planner = planner(DeletePolicy::Cascade);
        let draft = EventDraft::at("Practice", date(2024, 6, 3), Some(hm(18, 0))).unwrap();
        let mut rule = RecurrenceRule::every_4_weeks(EndCondition::AfterCount(3));
        rule.interval = 0;

        let result = planner.create_event(draft, Some(rule), at(date(2024, 6, 1), hm(12, 0)));

        assert!(matches!(result, Err(StoreError::Rejected(CalendarError::InvalidRule(_)))));
        assert!(planner.events(&EventFilter::default()).unwrap().is_empty());
    }

    #[test]
    fn test_create_before_today_writes_nothing() {
        let planner = planner(DeletePolicy::Cascade);
        let mut changes = planner.subscribe();
        let now = at(date(2024, 6, 4), hm(8, 0));

        let single = EventDraft::at("Dentist", date(2024, 6, 3), Some(hm(9, 0))).unwrap();
        let result = planner.create_event(single, None, now);
        assert!(matches!(
            result,
            Err(StoreError::Rejected(CalendarError::PastDate { .. }))
        ));

        let parent = EventDraft::at("Practice", date(2024, 6, 3), Some(hm(18, 0))).unwrap();
        let rule = RecurrenceRule::weekly(vec![Weekday::Mon], EndCondition::AfterCount(4));
        let result = planner.create_event(parent, Some(rule), now);
        assert!(matches!(
            result,
            Err(StoreError::Rejected(CalendarError::PastDate { .. }))
        ));

        assert!(planner.events(&EventFilter::default()).unwrap().is_empty());
        assert!(changes.try_recv().is_err());
    }

    #[test]
    fn test_create_today_is_allowed() {
        let planner = planner(DeletePolicy::Cascade);
        let draft = EventDraft::at("Dentist", date(2024, 6, 4), Some(hm(7, 0))).unwrap();
        let now = at(date(2024, 6, 4), hm(20, 0));

        let created = planner.create_event(draft, None, now).unwrap();

        assert_eq!(created.len(), 1);
        assert_eq!(created[0].date(), date(2024, 6, 4));
    }

    #[test]
    fn test_rejected_move_leaves_event_unchanged() {
        let planner = planner(DeletePolicy::Cascade);
        let draft = EventDraft::at("Swim", date(2024, 6, 12), Some(hm(9, 0))).unwrap();
        let now = at(date(2024, 6, 10), hm(12, 0));
        let event = planner.create_event(draft, None, now).unwrap().remove(0);

        let result = planner.move_event_to_date(event.id, date(2024, 6, 9), now);

        assert!(matches!(result, Err(StoreError::Rejected(CalendarError::PastDate { .. }))));
        assert_eq!(planner.event(event.id).unwrap().scheduled_for, event.scheduled_for);
    }

    #[test]
    fn test_moves_keep_local_time() {
        let planner = planner(DeletePolicy::Cascade);
        let draft = EventDraft::at("Swim", date(2024, 3, 8), Some(hm(9, 0))).unwrap();
        let now = at(date(2024, 3, 1), hm(12, 0));
        let event = planner.create_event(draft, None, now).unwrap().remove(0);

        let tomorrow = planner.move_event_to_tomorrow(event.id, now).unwrap();
        assert_eq!(tomorrow.date(), date(2024, 3, 9));

        let next_week = planner.move_event_to_next_week(event.id, now).unwrap();
        assert_eq!(next_week.date(), date(2024, 3, 16));
        assert_eq!(next_week.time(), Some(hm(9, 0)));
    }

    #[test]
    fn test_duplicate_creates_standalone_copy() {
        let planner = planner(DeletePolicy::Cascade);
        let series = practice(&planner, 3);
        let now = at(date(2024, 6, 1), hm(12, 0));

        let copy = planner.duplicate_event(series[1].id, date(2024, 6, 22), now).unwrap();

        assert_eq!(copy.date(), date(2024, 6, 22));
        assert_eq!(copy.time(), Some(hm(18, 0)));
        assert!(copy.recurrence.is_none());
        assert!(copy.recurrence_parent_id.is_none());
        assert_eq!(planner.events(&EventFilter::default()).unwrap().len(), 4);
    }

    #[test]
    fn test_edit_does_not_reexpand() {
        let planner = planner(DeletePolicy::Cascade);
        let series = practice(&planner, 4);
        let patch = EventPatch {
            title: Some("Scrimmage".to_string()),
            ..Default::default()
        };

        planner.edit_event(series[0].id, &patch).unwrap();

        let children = planner.events(&EventFilter::children_of(series[0].id)).unwrap();
        assert_eq!(children.len(), 3);
        assert!(children.iter().all(|c| c.title == "Practice"));
    }

    #[test]
    fn test_delete_policies() {
        let cascade = planner(DeletePolicy::Cascade);
        let series = practice(&cascade, 4);
        assert_eq!(cascade.delete_event(series[0].id).unwrap(), 4);
        assert!(cascade.events(&EventFilter::default()).unwrap().is_empty());

        let orphan = planner(DeletePolicy::Orphan);
        let series = practice(&orphan, 4);
        assert_eq!(orphan.delete_event(series[0].id).unwrap(), 1);
        let left = orphan.events(&EventFilter::default()).unwrap();
        assert_eq!(left.len(), 3);
        assert!(left.iter().all(|e| !e.is_recurrence_child()));

        let block = planner(DeletePolicy::Block);
        let series = practice(&block, 4);
        assert!(matches!(
            block.delete_event(series[0].id),
            Err(StoreError::HasChildren(_))
        ));
        assert_eq!(block.delete_event(series[1].id).unwrap(), 1);
    }

    #[test]
    fn test_week_board_groups_and_flags() {
        let planner = planner(DeletePolicy::Cascade);
        practice(&planner, 6);
        planner
            .add_task(&TaskDraft::new("Library books", "river", "2024-06-10", TaskDay::Wednesday))
            .unwrap();
        planner
            .add_task(&TaskDraft::new("Plan trip", "jaclyn", "2024-06-10", TaskDay::Overflow))
            .unwrap();

        // Wednesday 2024-06-12 at 19:00 local
        let now = at(date(2024, 6, 12), hm(19, 0));
        let board = planner.week_board(now).unwrap();

        assert_eq!(board.window.week_key, "2024-06-10");
        assert_eq!(board.days.len(), 7);

        let monday = &board.days[0];
        assert!(monday.is_past);
        assert_eq!(monday.events.len(), 1);
        assert!(monday.events[0].is_past);

        let wednesday = &board.days[2];
        assert!(!wednesday.is_past);
        assert_eq!(wednesday.events.len(), 1);
        assert!(wednesday.events[0].is_past);
        assert_eq!(wednesday.tasks.len(), 1);

        assert!(board.days[4].events.is_empty());
        assert_eq!(board.overflow.len(), 1);
    }

    #[test]
    fn test_task_operations() {
        let planner = planner(DeletePolicy::Cascade);
        let task = planner
            .add_task(&TaskDraft::new("Recycling", "river", "2024-06-10", TaskDay::Thursday))
            .unwrap();

        assert!(planner.toggle_task(task.id).unwrap().completed);
        assert!(!planner.toggle_task(task.id).unwrap().completed);

        let moved = planner.move_task_to_next_week(task.id).unwrap();
        assert_eq!(moved.week_start, "2024-06-17");
        assert_eq!(moved.day_of_week, TaskDay::Thursday);
    }

    #[test]
    fn test_unknown_board_rejected() {
        let mut config = Config::default();
        config.boards.names = vec!["river".to_string()];
        let planner = Planner::new(SqliteStore::in_memory().unwrap(), &config);

        let result =
            planner.add_task(&TaskDraft::new("Chores", "nobody", "2024-06-10", TaskDay::Monday));
        assert!(matches!(result, Err(StoreError::Validation(_))));
    }

    #[test]
    fn test_notes_seen() {
        let planner = planner(DeletePolicy::Cascade);
        let note = planner
            .add_note(&NoteDraft {
                content: "Field trip forms due".to_string(),
                author: "jaclyn".to_string(),
                week_start: "2024-06-10".to_string(),
            })
            .unwrap();

        let board = planner.week_board(at(date(2024, 6, 11), hm(8, 0))).unwrap();
        assert_eq!(board.unseen_notes(), 1);

        planner.mark_note_seen(note.id).unwrap();
        let board = planner.week_board(at(date(2024, 6, 11), hm(8, 0))).unwrap();
        assert_eq!(board.unseen_notes(), 0);
    }
}
