//! Core types for the task board streaming service.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error returned when parsing a status or priority from its text form.
#[derive(Debug, Error)]
#[error("unknown {kind}: {value}")]
pub struct ParseEnumError {
    kind: &'static str,
    value: String,
}

/// Pipeline status of a task. Tasks move todo -> in_progress -> testing ->
/// in_review -> done, though no transition is enforced server-side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Testing,
    InReview,
    Done,
}

impl TaskStatus {
    /// All statuses in pipeline order.
    pub const ALL: [TaskStatus; 5] = [
        TaskStatus::Todo,
        TaskStatus::InProgress,
        TaskStatus::Testing,
        TaskStatus::InReview,
        TaskStatus::Done,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Testing => "testing",
            TaskStatus::InReview => "in_review",
            TaskStatus::Done => "done",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "todo" => Ok(TaskStatus::Todo),
            "in_progress" => Ok(TaskStatus::InProgress),
            "testing" => Ok(TaskStatus::Testing),
            "in_review" => Ok(TaskStatus::InReview),
            "done" => Ok(TaskStatus::Done),
            other => Err(ParseEnumError {
                kind: "task status",
                value: other.to_string(),
            }),
        }
    }
}

/// Task priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
}

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "low",
            TaskPriority::Medium => "medium",
            TaskPriority::High => "high",
        }
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskPriority {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(TaskPriority::Low),
            "medium" => Ok(TaskPriority::Medium),
            "high" => Ok(TaskPriority::High),
            other => Err(ParseEnumError {
                kind: "task priority",
                value: other.to_string(),
            }),
        }
    }
}

/// A task on the board.
///
/// `updated_at` advances on every mutation and is the basis for server-side
/// change detection. It is deliberately excluded from the client's
/// visible-field equality (see `client::merge::visibly_equal`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub assignee: Option<String>,
    pub priority: TaskPriority,
    /// Due date as milliseconds since the epoch.
    pub due_date: Option<i64>,
    pub estimated_hours: Option<f64>,
    pub time_spent: Option<f64>,
    /// Completion percentage, 0-100.
    pub progress: i64,
    pub is_blocked: bool,
    pub blocked_reason: Option<String>,
    /// Free-form context written by automated agents.
    pub agent_context: Option<String>,
    pub project_id: Option<String>,
    /// Ordered set of contributor names, first touch first.
    pub worked_by: Vec<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Singleton record describing the automated agent loop: whether it is
/// running, when it last phoned home, and which tasks it currently holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatcherConfig {
    pub is_running: bool,
    pub last_run: Option<i64>,
    pub current_task_id: Option<String>,
    pub active_task_ids: Vec<String>,
}

/// Payload for creating a task.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskInput {
    pub title: String,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub assignee: Option<String>,
    pub priority: Option<TaskPriority>,
    pub due_date: Option<i64>,
    pub estimated_hours: Option<f64>,
    pub progress: Option<i64>,
    pub is_blocked: Option<bool>,
    pub blocked_reason: Option<String>,
    pub agent_context: Option<String>,
    pub project_id: Option<String>,
}

/// Partial update for a task. Only provided fields are applied.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub assignee: Option<String>,
    pub priority: Option<TaskPriority>,
    pub due_date: Option<i64>,
    pub estimated_hours: Option<f64>,
    pub time_spent: Option<f64>,
    pub progress: Option<i64>,
    pub is_blocked: Option<bool>,
    pub blocked_reason: Option<String>,
    pub agent_context: Option<String>,
    pub project_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serde_roundtrip() {
        for status in TaskStatus::ALL {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
            let back: TaskStatus = serde_json::from_str(&json).unwrap();
            assert_eq!(back, status);
        }
    }

    #[test]
    fn status_from_str_rejects_unknown() {
        assert!("archived".parse::<TaskStatus>().is_err());
        assert_eq!("in_review".parse::<TaskStatus>().unwrap(), TaskStatus::InReview);
    }

    #[test]
    fn priority_default_is_medium() {
        assert_eq!(TaskPriority::default(), TaskPriority::Medium);
        assert_eq!("high".parse::<TaskPriority>().unwrap(), TaskPriority::High);
    }
}
