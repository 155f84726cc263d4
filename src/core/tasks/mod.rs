mod ids;
mod ledger;
mod settings;
mod store;
pub mod types;

use std::path::Path;
use std::sync::Arc;

use rusqlite::Connection;
use tokio::sync::Mutex;
use tracing::info;

use crate::core::error::TaskError;

/// Durable store for task definitions, completion history and the small
/// bot-configuration blob. Sole owner of persisted state; every operation
/// round-trips to SQLite behind a single serialized connection.
pub struct TaskStore {
    db: Arc<Mutex<Connection>>,
}

impl TaskStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, TaskError> {
        let db = Connection::open(path.as_ref())?;
        let store = Self::with_connection(db)?;
        info!("Task store opened at {}", path.as_ref().display());
        Ok(store)
    }

    fn with_connection(db: Connection) -> Result<Self, TaskError> {
        db.execute(
            "CREATE TABLE IF NOT EXISTS tasks (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                frequency_days INTEGER NOT NULL,
                last_done TEXT NOT NULL,
                room TEXT NOT NULL,
                notes TEXT,
                points INTEGER NOT NULL DEFAULT 1
            )",
            [],
        )?;

        db.execute(
            "CREATE TABLE IF NOT EXISTS completed_tasks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL,
                task_id INTEGER NOT NULL,
                task_name TEXT NOT NULL,
                points_earned INTEGER NOT NULL,
                completed_at TEXT NOT NULL
            )",
            [],
        )?;

        db.execute(
            "CREATE TABLE IF NOT EXISTS bot_config (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )?;

        Ok(Self {
            db: Arc::new(Mutex::new(db)),
        })
    }
}

/// In-memory store for tests. Avoids filesystem side-effects.
#[cfg(test)]
pub(crate) fn test_store() -> TaskStore {
    let db = Connection::open_in_memory().expect("open in-memory db");
    TaskStore::with_connection(db).expect("create tables")
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::test_store;
    use crate::core::due::due_tasks;
    use crate::core::error::TaskError;
    use crate::core::frequency::parse_frequency;
    use crate::core::tasks::types::FieldValue;

    // --- Lifecycle ---

    #[tokio::test]
    async fn create_task_and_read_it_back() {
        let store = test_store();
        let id = store
            .create("Clean bathroom", 1, "Bathroom", "Daily cleaning", 1)
            .await
            .unwrap();

        let tasks = store.list(None).await.unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, id);
        assert_eq!(tasks[0].name, "Clean bathroom");
        assert_eq!(tasks[0].frequency_days, 1);
        assert_eq!(tasks[0].room, "Bathroom");
        assert_eq!(tasks[0].notes, "Daily cleaning");
        assert_eq!(tasks[0].points, 1);

        let task = store.get(id).await.unwrap().expect("task exists");
        assert_eq!(task.name, "Clean bathroom");
    }

    #[tokio::test]
    async fn newly_created_task_is_not_due() {
        let store = test_store();
        store.create("Clean kitchen", 1, "Kitchen", "", 1).await.unwrap();

        let tasks = store.list(None).await.unwrap();
        let due = due_tasks(&tasks, Utc::now().naive_utc(), None);
        assert!(due.is_empty(), "a just-created task must not be due");
    }

    #[tokio::test]
    async fn open_creates_database_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.db");
        let store = super::TaskStore::open(&path).unwrap();
        store.create("Dust shelves", 7, "Hall", "", 1).await.unwrap();
        assert!(path.exists());
    }

    // Scenario from the household rotation: create "Vacuum floor" with a
    // one-day frequency, back-date it, mark it done, and watch the due flag
    // flip false -> true -> false.
    #[tokio::test]
    async fn vacuum_floor_due_cycle() {
        let store = test_store();
        let freq = parse_frequency("1d").unwrap();
        let id = store.create("Vacuum floor", freq, "Living room", "", 1).await.unwrap();

        let now = Utc::now().naive_utc();
        let tasks = store.list(None).await.unwrap();
        assert!(due_tasks(&tasks, now, None).is_empty());

        store
            .update_last_done(id, now - Duration::days(2))
            .await
            .unwrap();
        let tasks = store.list(None).await.unwrap();
        let due = due_tasks(&tasks, now, None);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].name, "Vacuum floor");

        store.update_last_done(id, now).await.unwrap();
        let tasks = store.list(None).await.unwrap();
        assert!(due_tasks(&tasks, now, None).is_empty());
    }

    #[tokio::test]
    async fn only_overdue_tasks_show_up_as_due() {
        let store = test_store();
        let daily = store.create("Daily task", 1, "Kitchen", "", 1).await.unwrap();
        let weekly = store.create("Weekly task", 7, "Kitchen", "", 1).await.unwrap();
        store.create("Monthly task", 30, "Kitchen", "", 1).await.unwrap();

        let now = Utc::now().naive_utc();
        store.update_last_done(daily, now - Duration::days(2)).await.unwrap();
        store.update_last_done(weekly, now - Duration::days(8)).await.unwrap();

        let tasks = store.list(None).await.unwrap();
        let due = due_tasks(&tasks, now, None);
        let names: Vec<&str> = due.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(due.len(), 2);
        assert!(names.contains(&"Daily task"));
        assert!(names.contains(&"Weekly task"));
        assert!(!names.contains(&"Monthly task"));
    }

    #[tokio::test]
    async fn completing_one_task_leaves_others_due() {
        let store = test_store();
        let a = store.create("Task A", 1, "Hall", "", 1).await.unwrap();
        let b = store.create("Task B", 1, "Hall", "", 1).await.unwrap();

        let now = Utc::now().naive_utc();
        store.update_last_done(a, now - Duration::days(2)).await.unwrap();
        store.update_last_done(b, now - Duration::days(2)).await.unwrap();

        let tasks = store.list(None).await.unwrap();
        assert_eq!(due_tasks(&tasks, now, None).len(), 2);

        store.update_last_done(a, now).await.unwrap();
        let tasks = store.list(None).await.unwrap();
        let due = due_tasks(&tasks, now, None);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, b);
    }

    // --- Removal ---

    #[tokio::test]
    async fn removed_task_disappears_everywhere() {
        let store = test_store();
        let id = store.create("Task to remove", 1, "Office", "", 1).await.unwrap();
        let now = Utc::now().naive_utc();
        store.update_last_done(id, now - Duration::days(2)).await.unwrap();

        let tasks = store.list(None).await.unwrap();
        assert_eq!(due_tasks(&tasks, now, None).len(), 1);

        store.remove(id).await.unwrap();
        assert!(store.get(id).await.unwrap().is_none());
        assert!(store.list(None).await.unwrap().is_empty());
    }

    // --- Room filtering ---

    #[tokio::test]
    async fn list_filters_by_exact_stored_room() {
        let store = test_store();
        store.create("Scrub sink", 2, "Kitchen", "", 1).await.unwrap();
        store.create("Mop floor", 3, "Bathroom", "", 1).await.unwrap();

        let kitchen = store.list(Some("Kitchen")).await.unwrap();
        assert_eq!(kitchen.len(), 1);
        assert_eq!(kitchen[0].name, "Scrub sink");

        // The store matches the stored value byte-for-byte; callers resolve
        // user input to the canonical spelling before querying.
        assert!(store.list(Some("kitchen")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_is_ordered_by_ascending_id() {
        let store = test_store();
        for i in 0..10 {
            store
                .create(&format!("Task {i}"), 1, "Hall", "", 1)
                .await
                .unwrap();
        }
        let tasks = store.list(None).await.unwrap();
        let ids: Vec<i64> = tasks.iter().map(|t| t.id).collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        assert_eq!(ids, sorted);
    }

    // --- Random ids ---

    #[tokio::test]
    async fn created_ids_are_three_digit_and_distinct() {
        let store = test_store();
        for i in 0..10 {
            store
                .create(&format!("Task {i}"), 1, "Hall", "", 1)
                .await
                .unwrap();
        }
        let tasks = store.list(None).await.unwrap();
        let mut ids: Vec<i64> = tasks.iter().map(|t| t.id).collect();
        assert!(ids.iter().all(|id| (100..=999).contains(id)));
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 10);
    }

    #[tokio::test]
    async fn create_fails_once_id_space_is_exhausted() {
        let store = test_store();
        store.fill_all_ids_for_test().await;
        let err = store.create("One more task", 1, "Hall", "", 1).await.unwrap_err();
        assert!(matches!(err, TaskError::IdSpaceExhausted(_)));
    }

    // --- Field updates ---

    #[tokio::test]
    async fn update_notes_changes_only_notes() {
        let store = test_store();
        let id = store
            .create("Task with notes", 1, "Office", "Original notes", 2)
            .await
            .unwrap();
        let before = store.get(id).await.unwrap().unwrap();

        store
            .update_field(id, "notes", FieldValue::from("Updated notes"))
            .await
            .unwrap();

        let after = store.get(id).await.unwrap().unwrap();
        assert_eq!(after.notes, "Updated notes");
        assert_eq!(after.name, before.name);
        assert_eq!(after.frequency_days, before.frequency_days);
        assert_eq!(after.room, before.room);
        assert_eq!(after.points, before.points);
        assert_eq!(after.last_done, before.last_done);
    }

    #[tokio::test]
    async fn update_name_frequency_room_and_points() {
        let store = test_store();
        let id = store.create("Some task", 1, "Hall", "", 1).await.unwrap();

        store.update_field(id, "name", FieldValue::from("New name")).await.unwrap();
        store.update_field(id, "frequency_days", FieldValue::from(7u32)).await.unwrap();
        store.update_field(id, "room", FieldValue::from("Kitchen")).await.unwrap();
        store.update_field(id, "points", FieldValue::from(5u32)).await.unwrap();

        let task = store.get(id).await.unwrap().unwrap();
        assert_eq!(task.name, "New name");
        assert_eq!(task.frequency_days, 7);
        assert_eq!(task.room, "Kitchen");
        assert_eq!(task.points, 5);
    }

    #[tokio::test]
    async fn operations_on_missing_ids_report_not_found() {
        let store = test_store();
        let now = Utc::now().naive_utc();
        assert!(matches!(
            store.remove(404).await,
            Err(TaskError::NotFound(404))
        ));
        assert!(matches!(
            store.update_last_done(404, now).await,
            Err(TaskError::NotFound(404))
        ));
        assert!(matches!(
            store.update_field(404, "name", FieldValue::from("x")).await,
            Err(TaskError::NotFound(404))
        ));
        assert!(store.get(404).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_rejects_unknown_field() {
        let store = test_store();
        let id = store.create("Test task", 1, "Hall", "", 1).await.unwrap();
        let err = store
            .update_field(id, "last_done", FieldValue::from("2024-01-01T00:00:00"))
            .await
            .unwrap_err();
        assert!(matches!(err, TaskError::InvalidField(f) if f == "last_done"));
    }

    #[tokio::test]
    async fn zero_frequency_is_rejected_everywhere() {
        let store = test_store();
        assert!(matches!(
            store.create("Broken", 0, "Hall", "", 1).await,
            Err(TaskError::ZeroFrequency)
        ));

        let id = store.create("Fine", 1, "Hall", "", 1).await.unwrap();
        assert!(matches!(
            store.update_field(id, "frequency_days", FieldValue::Int(0)).await,
            Err(TaskError::ZeroFrequency)
        ));
    }

    #[tokio::test]
    async fn zero_points_are_rejected() {
        let store = test_store();
        assert!(matches!(
            store.create("Broken", 1, "Hall", "", 0).await,
            Err(TaskError::ZeroPoints)
        ));

        let id = store.create("Fine", 1, "Hall", "", 1).await.unwrap();
        assert!(matches!(
            store.update_field(id, "points", FieldValue::Int(0)).await,
            Err(TaskError::ZeroPoints)
        ));
    }
}
