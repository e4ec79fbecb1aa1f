//! Task CRUD operations.

use super::{now_ms, Database};
use crate::types::{Task, TaskInput, TaskPatch, TaskPriority, TaskStatus};
use anyhow::Result;
use rusqlite::{params, OptionalExtension, Row};
use uuid::Uuid;

/// Map a parse failure on a column into a rusqlite conversion error.
fn column_parse_err(
    idx: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(err))
}

/// Parse a full task row in column order of the `tasks` table.
pub fn parse_task_row(row: &Row) -> rusqlite::Result<Task> {
    let status_text: String = row.get("status")?;
    let priority_text: String = row.get("priority")?;
    let worked_by_json: String = row.get("worked_by")?;

    Ok(Task {
        id: row.get("id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        status: status_text
            .parse::<TaskStatus>()
            .map_err(|e| column_parse_err(3, e))?,
        assignee: row.get("assignee")?,
        priority: priority_text
            .parse::<TaskPriority>()
            .map_err(|e| column_parse_err(5, e))?,
        due_date: row.get("due_date")?,
        estimated_hours: row.get("estimated_hours")?,
        time_spent: row.get("time_spent")?,
        progress: row.get("progress")?,
        is_blocked: row.get::<_, i64>("is_blocked")? != 0,
        blocked_reason: row.get("blocked_reason")?,
        agent_context: row.get("agent_context")?,
        project_id: row.get("project_id")?,
        worked_by: serde_json::from_str(&worked_by_json).map_err(|e| column_parse_err(15, e))?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

const TASK_COLUMNS: &str = "id, title, description, status, assignee, priority, due_date, \
     estimated_hours, time_spent, progress, is_blocked, blocked_reason, \
     agent_context, project_id, worked_by, created_at, updated_at";

/// Append a contributor to the ordered worked_by set if not already present.
fn record_contributor(worked_by: &mut Vec<String>, name: &str) {
    if !worked_by.iter().any(|w| w == name) {
        worked_by.push(name.to_string());
    }
}

impl Database {
    /// Create a task. Status defaults to `todo`, priority to `medium`.
    pub fn create_task(&self, input: TaskInput) -> Result<Task> {
        let now = now_ms();
        let mut worked_by = Vec::new();
        if let Some(assignee) = &input.assignee {
            record_contributor(&mut worked_by, assignee);
        }
        let task = Task {
            id: Uuid::new_v4().to_string(),
            title: input.title,
            description: input.description,
            status: input.status.unwrap_or(TaskStatus::Todo),
            assignee: input.assignee,
            priority: input.priority.unwrap_or_default(),
            due_date: input.due_date,
            estimated_hours: input.estimated_hours,
            time_spent: None,
            progress: input.progress.unwrap_or(0).clamp(0, 100),
            is_blocked: input.is_blocked.unwrap_or(false),
            blocked_reason: input.blocked_reason.filter(|_| input.is_blocked.unwrap_or(false)),
            agent_context: input.agent_context,
            project_id: input.project_id,
            worked_by,
            created_at: now,
            updated_at: now,
        };

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO tasks (id, title, description, status, assignee, priority, \
                 due_date, estimated_hours, time_spent, progress, is_blocked, blocked_reason, \
                 agent_context, project_id, worked_by, created_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
                params![
                    task.id,
                    task.title,
                    task.description,
                    task.status.as_str(),
                    task.assignee,
                    task.priority.as_str(),
                    task.due_date,
                    task.estimated_hours,
                    task.time_spent,
                    task.progress,
                    task.is_blocked as i64,
                    task.blocked_reason,
                    task.agent_context,
                    task.project_id,
                    serde_json::to_string(&task.worked_by)?,
                    task.created_at,
                    task.updated_at,
                ],
            )?;
            Ok(())
        })?;

        Ok(task)
    }

    /// Fetch one task by id.
    pub fn get_task(&self, id: &str) -> Result<Option<Task>> {
        self.with_conn(|conn| {
            let task = conn
                .query_row(
                    &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"),
                    params![id],
                    parse_task_row,
                )
                .optional()?;
            Ok(task)
        })
    }

    /// Fetch all tasks in creation order. The stable ordering matters: the
    /// change-detection fingerprint is a sequence, so reads must not reorder
    /// between ticks.
    pub fn list_tasks(&self) -> Result<Vec<Task>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {TASK_COLUMNS} FROM tasks ORDER BY created_at, id"
            ))?;
            let tasks = stmt
                .query_map([], parse_task_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(tasks)
        })
    }

    /// Apply a partial update. Returns `None` when the task does not exist.
    ///
    /// `updated_at` always advances strictly, even for two writes inside the
    /// same millisecond, so change detection never misses a mutation.
    pub fn update_task(&self, id: &str, patch: TaskPatch) -> Result<Option<Task>> {
        self.with_conn(|conn| {
            let Some(mut task) = conn
                .query_row(
                    &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"),
                    params![id],
                    parse_task_row,
                )
                .optional()?
            else {
                return Ok(None);
            };

            if let Some(title) = patch.title {
                task.title = title;
            }
            if let Some(description) = patch.description {
                task.description = Some(description);
            }
            if let Some(status) = patch.status {
                task.status = status;
            }
            if let Some(assignee) = patch.assignee {
                record_contributor(&mut task.worked_by, &assignee);
                task.assignee = Some(assignee);
            }
            if let Some(priority) = patch.priority {
                task.priority = priority;
            }
            if let Some(due_date) = patch.due_date {
                task.due_date = Some(due_date);
            }
            if let Some(estimated_hours) = patch.estimated_hours {
                task.estimated_hours = Some(estimated_hours);
            }
            if let Some(time_spent) = patch.time_spent {
                task.time_spent = Some(time_spent);
            }
            if let Some(progress) = patch.progress {
                task.progress = progress.clamp(0, 100);
            }
            if let Some(is_blocked) = patch.is_blocked {
                task.is_blocked = is_blocked;
                if !is_blocked {
                    task.blocked_reason = None;
                }
            }
            if let Some(blocked_reason) = patch.blocked_reason {
                task.blocked_reason = Some(blocked_reason);
            }
            if let Some(agent_context) = patch.agent_context {
                task.agent_context = Some(agent_context);
            }
            if let Some(project_id) = patch.project_id {
                task.project_id = Some(project_id);
            }

            task.updated_at = now_ms().max(task.updated_at + 1);

            conn.execute(
                "UPDATE tasks SET title = ?2, description = ?3, status = ?4, assignee = ?5, \
                 priority = ?6, due_date = ?7, estimated_hours = ?8, time_spent = ?9, \
                 progress = ?10, is_blocked = ?11, blocked_reason = ?12, agent_context = ?13, \
                 project_id = ?14, worked_by = ?15, updated_at = ?16 \
                 WHERE id = ?1",
                params![
                    task.id,
                    task.title,
                    task.description,
                    task.status.as_str(),
                    task.assignee,
                    task.priority.as_str(),
                    task.due_date,
                    task.estimated_hours,
                    task.time_spent,
                    task.progress,
                    task.is_blocked as i64,
                    task.blocked_reason,
                    task.agent_context,
                    task.project_id,
                    serde_json::to_string(&task.worked_by)?,
                    task.updated_at,
                ],
            )?;

            Ok(Some(task))
        })
    }

    /// Delete a task. Returns whether a row was removed.
    pub fn delete_task(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let affected = conn.execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
            Ok(affected > 0)
        })
    }
}
