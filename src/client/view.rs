//! Client view model: the in-process mirror of the board.
//!
//! Pushed snapshots flow through the merge layer; a drag in progress keeps
//! its optimistic status on top of whatever the server still reports, so a
//! push never visually reverts an in-flight drag. Persisting the finished
//! drag is the caller's explicit update call, independent of the stream.

use crate::client::merge::{merge_tasks, visibly_equal, TaskList};
use crate::types::{Task, TaskStatus};
use arc_swap::ArcSwap;
use std::sync::{Arc, Mutex};

/// The one locally active drag. Tracking a single drag at a time is the
/// intended invariant; starting a new drag replaces the previous one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveDrag {
    pub task_id: String,
    pub status: TaskStatus,
}

/// Shared board state: current task list plus the active drag.
pub struct BoardViewModel {
    tasks: ArcSwap<Vec<Arc<Task>>>,
    active_drag: Mutex<Option<ActiveDrag>>,
}

impl BoardViewModel {
    pub fn new() -> Self {
        Self {
            tasks: ArcSwap::from_pointee(Vec::new()),
            active_drag: Mutex::new(None),
        }
    }

    /// Current snapshot of the board.
    pub fn tasks(&self) -> TaskList {
        self.tasks.load_full()
    }

    /// Start dragging a task toward `status`. The optimistic status shows
    /// immediately and overrides server pushes until the drag ends.
    pub fn begin_drag(&self, task_id: &str, status: TaskStatus) {
        *self.active_drag.lock().unwrap() = Some(ActiveDrag {
            task_id: task_id.to_string(),
            status,
        });

        let current = self.tasks.load_full();
        let mut changed = false;
        let updated: Vec<Arc<Task>> = current
            .iter()
            .map(|task| {
                if task.id == task_id && task.status != status {
                    let mut optimistic = (**task).clone();
                    optimistic.status = status;
                    changed = true;
                    Arc::new(optimistic)
                } else {
                    Arc::clone(task)
                }
            })
            .collect();
        if changed {
            self.tasks.store(Arc::new(updated));
        }
    }

    /// End the drag, returning what was dragged so the caller can issue the
    /// persisting update call.
    pub fn complete_drag(&self) -> Option<ActiveDrag> {
        self.active_drag.lock().unwrap().take()
    }

    /// Abandon the drag. The next snapshot restores the server's status.
    pub fn cancel_drag(&self) {
        self.active_drag.lock().unwrap().take();
    }

    pub fn active_drag(&self) -> Option<ActiveDrag> {
        self.active_drag.lock().unwrap().clone()
    }

    /// Apply a pushed snapshot. Returns true when the stored list actually
    /// changed (callers treat false as "skip the render pass").
    pub fn apply_snapshot(&self, mut incoming: Vec<Task>) -> bool {
        if let Some(drag) = self.active_drag.lock().unwrap().as_ref() {
            if let Some(task) = incoming.iter_mut().find(|t| t.id == drag.task_id) {
                task.status = drag.status;
            }
        }

        let current = self.tasks.load_full();
        let merged = merge_tasks(&current, incoming);
        if Arc::ptr_eq(&merged, &current) {
            return false;
        }
        self.tasks.store(merged);
        true
    }
}

impl Default for BoardViewModel {
    fn default() -> Self {
        Self::new()
    }
}

/// Detail view subscribed to a single task by id. Applies the same
/// visible-field equality before replacing its copy, so an open inspector
/// does not churn on unrelated background ticks.
pub struct TaskInspector {
    task_id: String,
    current: Option<Arc<Task>>,
}

impl TaskInspector {
    pub fn new(task_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            current: None,
        }
    }

    pub fn task(&self) -> Option<&Arc<Task>> {
        self.current.as_ref()
    }

    /// Refresh from a board snapshot. Returns true when the inspected copy
    /// was replaced (appeared, disappeared, or visibly changed).
    pub fn apply(&mut self, tasks: &TaskList) -> bool {
        let found = tasks.iter().find(|t| t.id == self.task_id);
        match (found, &self.current) {
            (Some(incoming), Some(current)) if visibly_equal(incoming, current) => false,
            (Some(incoming), _) => {
                self.current = Some(Arc::clone(incoming));
                true
            }
            (None, Some(_)) => {
                self.current = None;
                true
            }
            (None, None) => false,
        }
    }
}
