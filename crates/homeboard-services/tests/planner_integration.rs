//! Integration tests for the planner over an on-disk SQLite database.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use chrono::{DateTime, NaiveDate, NaiveTime, Utc, Weekday};
use homeboard_calendar::{tz, CalendarError, EndCondition, EventDraft, RecurrenceRule};
use homeboard_core::{Config, DeletePolicy};
use homeboard_services::{
    ChangeKind, Collection, EventFilter, Planner, PlannerClient, SqliteStore, StoreError,
    TaskDay, TaskDraft,
};
use tempfile::{tempdir, TempDir};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn hm(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

fn local(on: NaiveDate, at: NaiveTime) -> DateTime<Utc> {
    tz::from_civil(on, at).unwrap()
}

fn config_in(dir: &TempDir, policy: DeletePolicy) -> Config {
    let mut config = Config::default();
    config.config_dir = dir.path().to_path_buf();
    config.storage.database_path = dir.path().join("homeboard.db");
    config.calendar.delete_policy = policy;
    config
}

fn open_client(config: &Config) -> PlannerClient {
    let store = SqliteStore::open(&config.storage.database_path).unwrap();
    PlannerClient::new(Planner::new(store, config))
}

fn before_practice() -> DateTime<Utc> {
    local(date(2024, 6, 1), hm(9, 0))
}

fn practice() -> (EventDraft, RecurrenceRule) {
    let draft = EventDraft::at("Practice", date(2024, 6, 3), Some(hm(18, 0))).unwrap();
    let rule = RecurrenceRule::weekly(
        vec![Weekday::Mon, Weekday::Wed],
        EndCondition::AfterCount(6),
    );
    (draft, rule)
}

#[tokio::test]
async fn practice_series_is_persisted_with_local_times() {
    let dir = tempdir().unwrap();
    let config = config_in(&dir, DeletePolicy::Cascade);
    let client = open_client(&config);

    let (draft, rule) = practice();
    let series = client
        .create_event(draft, Some(rule), before_practice())
        .await
        .unwrap();
    let parent_id = series[0].id;
    drop(client);

    // Reopen from disk
    let client = open_client(&config);
    let children = client
        .events(EventFilter::children_of(parent_id))
        .await
        .unwrap();

    let dates: Vec<_> = children.iter().map(|e| e.date_key()).collect();
    assert_eq!(
        dates,
        vec!["2024-06-05", "2024-06-10", "2024-06-12", "2024-06-17", "2024-06-19"]
    );
    assert!(children.iter().all(|e| e.time() == Some(hm(18, 0))));
    assert!(children
        .iter()
        .all(|e| e.recurrence_parent_id == Some(parent_id)));
}

#[tokio::test]
async fn move_into_past_leaves_stored_event_unchanged() {
    let dir = tempdir().unwrap();
    let client = open_client(&config_in(&dir, DeletePolicy::Cascade));

    let draft = EventDraft::at("Swim lesson", date(2024, 6, 12), Some(hm(9, 0))).unwrap();
    let now = local(date(2024, 6, 10), hm(12, 0));
    let event = client.create_event(draft, None, now).await.unwrap().remove(0);
    assert_eq!(tz::today_key(now), "2024-06-10");

    let result = client
        .move_event_to_date(event.id, date(2024, 6, 9), now)
        .await;

    assert!(matches!(
        result,
        Err(StoreError::Rejected(CalendarError::PastDate { .. }))
    ));
    let stored = client.event(event.id).await.unwrap();
    assert_eq!(stored.scheduled_for, event.scheduled_for);
}

#[tokio::test]
async fn move_across_dst_keeps_wall_clock() {
    let dir = tempdir().unwrap();
    let client = open_client(&config_in(&dir, DeletePolicy::Cascade));

    let draft = EventDraft::at("Piano", date(2024, 3, 8), Some(hm(9, 0))).unwrap();
    let now = local(date(2024, 3, 1), hm(12, 0));
    let event = client.create_event(draft, None, now).await.unwrap().remove(0);

    let moved = client
        .move_event_to_date(event.id, date(2024, 3, 11), now)
        .await
        .unwrap();

    assert_eq!(moved.time(), Some(hm(9, 0)));
    assert_eq!(moved.scheduled_for.format("%H:%M").to_string(), "13:00");
}

#[tokio::test]
async fn series_starting_before_today_is_not_persisted() {
    let dir = tempdir().unwrap();
    let config = config_in(&dir, DeletePolicy::Cascade);
    let client = open_client(&config);

    let (draft, rule) = practice();
    let result = client
        .create_event(draft, Some(rule), local(date(2024, 6, 4), hm(7, 30)))
        .await;
    assert!(matches!(
        result,
        Err(StoreError::Rejected(CalendarError::PastDate { .. }))
    ));
    drop(client);

    let client = open_client(&config);
    let stored = client.events(EventFilter::default()).await.unwrap();
    assert!(stored.is_empty());
}

#[tokio::test]
async fn delete_policy_comes_from_config() {
    for (policy, remaining) in [
        (DeletePolicy::Cascade, 0),
        (DeletePolicy::Orphan, 5),
        (DeletePolicy::Block, 6),
    ] {
        let dir = tempdir().unwrap();
        let client = open_client(&config_in(&dir, policy));
        let (draft, rule) = practice();
        let series = client
            .create_event(draft, Some(rule), before_practice())
            .await
            .unwrap();

        let result = client.delete_event(series[0].id).await;
        if policy == DeletePolicy::Block {
            assert!(matches!(result, Err(StoreError::HasChildren(_))));
        } else {
            assert!(result.is_ok());
        }

        let left = client.events(EventFilter::default()).await.unwrap();
        assert_eq!(left.len(), remaining, "policy {:?}", policy);
    }
}

#[tokio::test]
async fn week_board_reflects_configured_boards() {
    let dir = tempdir().unwrap();
    let client = open_client(&config_in(&dir, DeletePolicy::Cascade));

    client
        .add_task(TaskDraft::new("Soccer cleats", "river", "2024-06-03", TaskDay::Monday))
        .await
        .unwrap();
    let unknown = client
        .add_task(TaskDraft::new("Mystery", "someone", "2024-06-03", TaskDay::Monday))
        .await;
    assert!(matches!(unknown, Err(StoreError::Validation(_))));

    let board = client
        .week_board(local(date(2024, 6, 5), hm(10, 0)))
        .await
        .unwrap();
    assert_eq!(board.window.week_key, "2024-06-03");
    assert_eq!(board.days[0].tasks.len(), 1);
}

#[tokio::test]
async fn subscription_sees_series_inserts() {
    let dir = tempdir().unwrap();
    let client = open_client(&config_in(&dir, DeletePolicy::Cascade));
    let mut events = client.subscribe(Some(Collection::Events));

    let (draft, rule) = practice();
    let series = client
        .create_event(draft, Some(rule), before_practice())
        .await
        .unwrap();

    for event in &series {
        let change = events.recv().await.unwrap();
        assert_eq!(change.kind, ChangeKind::Insert);
        assert_eq!(change.id(), Some(event.id));
    }
}
