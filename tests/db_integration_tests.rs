//! Integration tests for the database layer.
//!
//! These tests verify task CRUD and the watcher singleton using an
//! in-memory SQLite database.

use taskboard_stream::db::Database;
use taskboard_stream::types::{TaskInput, TaskPatch, TaskPriority, TaskStatus};

/// Helper to create a fresh in-memory database for testing.
fn setup_db() -> Database {
    Database::open_in_memory().expect("Failed to create in-memory database")
}

fn input(title: &str) -> TaskInput {
    TaskInput {
        title: title.to_string(),
        ..Default::default()
    }
}

mod task_tests {
    use super::*;

    #[test]
    fn create_task_applies_defaults() {
        let db = setup_db();

        let task = db.create_task(input("Ship it")).expect("Failed to create task");

        assert_eq!(task.title, "Ship it");
        assert_eq!(task.status, TaskStatus::Todo);
        assert_eq!(task.priority, TaskPriority::Medium);
        assert_eq!(task.progress, 0);
        assert!(!task.is_blocked);
        assert!(task.worked_by.is_empty());
        assert!(task.created_at > 0);
        assert_eq!(task.created_at, task.updated_at);
    }

    #[test]
    fn create_task_with_custom_values() {
        let db = setup_db();

        let task = db
            .create_task(TaskInput {
                title: "Review PR".to_string(),
                description: Some("second pass".to_string()),
                status: Some(TaskStatus::InReview),
                assignee: Some("kara".to_string()),
                priority: Some(TaskPriority::High),
                progress: Some(150), // clamped
                project_id: Some("proj-1".to_string()),
                ..Default::default()
            })
            .expect("Failed to create task");

        assert_eq!(task.status, TaskStatus::InReview);
        assert_eq!(task.priority, TaskPriority::High);
        assert_eq!(task.progress, 100);
        assert_eq!(task.assignee.as_deref(), Some("kara"));
        assert_eq!(task.worked_by, vec!["kara"]);
    }

    #[test]
    fn create_then_get_roundtrips() {
        let db = setup_db();
        let created = db.create_task(input("Roundtrip")).unwrap();

        let fetched = db.get_task(&created.id).unwrap().expect("task missing");
        assert_eq!(fetched.id, created.id);
        assert_eq!(fetched.title, created.title);
        assert_eq!(fetched.status, created.status);
        assert_eq!(fetched.updated_at, created.updated_at);
    }

    #[test]
    fn get_missing_task_returns_none() {
        let db = setup_db();
        assert!(db.get_task("nope").unwrap().is_none());
    }

    #[test]
    fn list_tasks_preserves_creation_order() {
        let db = setup_db();
        let a = db.create_task(input("first")).unwrap();
        let b = db.create_task(input("second")).unwrap();
        let c = db.create_task(input("third")).unwrap();

        let titles: Vec<String> = db
            .list_tasks()
            .unwrap()
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(titles, vec!["first", "second", "third"]);
        assert!(a.created_at <= b.created_at && b.created_at <= c.created_at);
    }

    #[test]
    fn update_bumps_updated_at_strictly() {
        let db = setup_db();
        let task = db.create_task(input("Monotonic")).unwrap();

        // Two back-to-back updates, likely within the same millisecond
        let first = db
            .update_task(
                &task.id,
                TaskPatch {
                    status: Some(TaskStatus::InProgress),
                    ..Default::default()
                },
            )
            .unwrap()
            .unwrap();
        let second = db
            .update_task(
                &task.id,
                TaskPatch {
                    status: Some(TaskStatus::Testing),
                    ..Default::default()
                },
            )
            .unwrap()
            .unwrap();

        assert!(first.updated_at > task.updated_at);
        assert!(second.updated_at > first.updated_at);
    }

    #[test]
    fn patch_touches_only_provided_fields() {
        let db = setup_db();
        let task = db
            .create_task(TaskInput {
                title: "Partial".to_string(),
                description: Some("keep me".to_string()),
                ..Default::default()
            })
            .unwrap();

        let updated = db
            .update_task(
                &task.id,
                TaskPatch {
                    progress: Some(40),
                    ..Default::default()
                },
            )
            .unwrap()
            .unwrap();

        assert_eq!(updated.progress, 40);
        assert_eq!(updated.title, "Partial");
        assert_eq!(updated.description.as_deref(), Some("keep me"));
        assert_eq!(updated.status, TaskStatus::Todo);
    }

    #[test]
    fn unblocking_clears_the_reason() {
        let db = setup_db();
        let task = db.create_task(input("Blocked")).unwrap();

        let blocked = db
            .update_task(
                &task.id,
                TaskPatch {
                    is_blocked: Some(true),
                    blocked_reason: Some("waiting on deploy".to_string()),
                    ..Default::default()
                },
            )
            .unwrap()
            .unwrap();
        assert!(blocked.is_blocked);
        assert_eq!(blocked.blocked_reason.as_deref(), Some("waiting on deploy"));

        let unblocked = db
            .update_task(
                &task.id,
                TaskPatch {
                    is_blocked: Some(false),
                    ..Default::default()
                },
            )
            .unwrap()
            .unwrap();
        assert!(!unblocked.is_blocked);
        assert!(unblocked.blocked_reason.is_none());
    }

    #[test]
    fn assignees_accumulate_in_worked_by_without_duplicates() {
        let db = setup_db();
        let task = db
            .create_task(TaskInput {
                title: "Handoff".to_string(),
                assignee: Some("alex".to_string()),
                ..Default::default()
            })
            .unwrap();

        for name in ["robin", "alex", "sam"] {
            db.update_task(
                &task.id,
                TaskPatch {
                    assignee: Some(name.to_string()),
                    ..Default::default()
                },
            )
            .unwrap()
            .unwrap();
        }

        let task = db.get_task(&task.id).unwrap().unwrap();
        assert_eq!(task.worked_by, vec!["alex", "robin", "sam"]);
        assert_eq!(task.assignee.as_deref(), Some("sam"));
    }

    #[test]
    fn delete_task_reports_whether_row_existed() {
        let db = setup_db();
        let task = db.create_task(input("Doomed")).unwrap();

        assert!(db.delete_task(&task.id).unwrap());
        assert!(!db.delete_task(&task.id).unwrap());
        assert!(db.get_task(&task.id).unwrap().is_none());
    }

    #[test]
    fn update_missing_task_returns_none() {
        let db = setup_db();
        let result = db
            .update_task(
                "ghost",
                TaskPatch {
                    title: Some("boo".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(result.is_none());
    }
}

mod watcher_tests {
    use super::*;

    #[test]
    fn singleton_is_seeded_stopped() {
        let db = setup_db();
        let config = db.watcher_config().unwrap();

        assert!(!config.is_running);
        assert!(config.last_run.is_none());
        assert!(config.current_task_id.is_none());
        assert!(config.active_task_ids.is_empty());
    }

    #[test]
    fn heartbeat_marks_running_and_records_held_tasks() {
        let db = setup_db();
        let config = db
            .record_watcher_heartbeat(
                Some("task-1".to_string()),
                vec!["task-1".to_string(), "task-2".to_string()],
            )
            .unwrap();

        assert!(config.is_running);
        assert!(config.last_run.is_some());
        assert_eq!(config.current_task_id.as_deref(), Some("task-1"));
        assert_eq!(config.active_task_ids, vec!["task-1", "task-2"]);
    }

    #[test]
    fn stopping_clears_held_tasks() {
        let db = setup_db();
        db.record_watcher_heartbeat(Some("task-1".to_string()), vec!["task-1".to_string()])
            .unwrap();

        let stopped = db.set_watcher_running(false).unwrap();
        assert!(!stopped.is_running);
        assert!(stopped.current_task_id.is_none());
        assert!(stopped.active_task_ids.is_empty());
        // last_run is history, not activity; it survives the stop
        assert!(stopped.last_run.is_some());
    }

    #[test]
    fn toggling_on_preserves_state() {
        let db = setup_db();
        let config = db.set_watcher_running(true).unwrap();
        assert!(config.is_running);
        assert!(config.last_run.is_none());
    }
}

mod persistence_tests {
    use super::*;

    #[test]
    fn data_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("board.db");

        let id = {
            let db = Database::open(&path).unwrap();
            db.create_task(input("Durable")).unwrap().id
        };

        let db = Database::open(&path).unwrap();
        let task = db.get_task(&id).unwrap().expect("task lost across reopen");
        assert_eq!(task.title, "Durable");
    }
}
