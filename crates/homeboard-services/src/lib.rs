pub mod backend;
pub mod client;
pub mod planner;
pub mod records;
pub mod sqlite_store;

pub use backend::{
    Change, ChangeKind, Collection, EventFilter, ExpandFn, RecordKey, RecordStore, StoreError,
    StoreResult, TaskFilter,
};
pub use client::{PlannerClient, Subscription};
pub use planner::{BoardEvent, DayColumn, Planner, WeekBoard};
pub use records::{
    EventPatch, Folder, FolderDraft, FolderPatch, NoteDraft, Priority, Setting, Task, TaskDay,
    TaskDraft, TaskPatch, WeeklyNote,
};
pub use sqlite_store::SqliteStore;
