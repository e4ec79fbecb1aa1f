//! Snapshot reconciliation.
//!
//! Incoming full snapshots are merged into the local list so that unchanged
//! tasks keep their existing `Arc`, and a snapshot that changes nothing
//! returns the original list untouched. Downstream consumers can then use
//! pointer identity (`Arc::ptr_eq`) to skip work, the way memoized renderers
//! use object identity.

use crate::types::Task;
use std::collections::HashMap;
use std::sync::Arc;

/// Shared snapshot of the board. Cloning is a pointer bump.
pub type TaskList = Arc<Vec<Arc<Task>>>;

/// Field-level equality over everything the UI renders. `created_at` and
/// `updated_at` are excluded on purpose: they change on every write but are
/// not independently rendered, and including them would force a re-render
/// on every timestamp bump.
pub fn visibly_equal(a: &Task, b: &Task) -> bool {
    a.id == b.id
        && a.title == b.title
        && a.description == b.description
        && a.status == b.status
        && a.priority == b.priority
        && a.assignee == b.assignee
        && a.due_date == b.due_date
        && a.estimated_hours == b.estimated_hours
        && a.time_spent == b.time_spent
        && a.progress == b.progress
        && a.is_blocked == b.is_blocked
        && a.blocked_reason == b.blocked_reason
        && a.project_id == b.project_id
        && a.agent_context == b.agent_context
        && a.worked_by == b.worked_by
}

/// Merge an incoming snapshot into the current list.
///
/// - Length differs: a task was added or removed — replace wholesale.
/// - Same length: per id, keep the current `Arc` when the task is visibly
///   equal; otherwise take the incoming record.
/// - Nothing changed at all: return the current list itself, so a caller's
///   own identity check sees no update.
pub fn merge_tasks(current: &TaskList, incoming: Vec<Task>) -> TaskList {
    if current.len() != incoming.len() {
        return Arc::new(incoming.into_iter().map(Arc::new).collect());
    }

    let by_id: HashMap<&str, &Arc<Task>> =
        current.iter().map(|t| (t.id.as_str(), t)).collect();

    let mut changed = false;
    let merged: Vec<Arc<Task>> = incoming
        .into_iter()
        .map(|inc| match by_id.get(inc.id.as_str()) {
            Some(cur) if visibly_equal(cur, &inc) => Arc::clone(cur),
            // Unknown id at equal length means a swap happened; that is a
            // change like any other.
            _ => {
                changed = true;
                Arc::new(inc)
            }
        })
        .collect();

    if !changed
        && merged
            .iter()
            .zip(current.iter())
            .all(|(m, c)| Arc::ptr_eq(m, c))
    {
        return Arc::clone(current);
    }

    Arc::new(merged)
}

#[cfg(test)]
pub(crate) fn make_task(id: &str, status: crate::types::TaskStatus, updated_at: i64) -> Task {
    Task {
        id: id.to_string(),
        title: format!("Task {id}"),
        description: None,
        status,
        assignee: None,
        priority: crate::types::TaskPriority::Medium,
        due_date: None,
        estimated_hours: None,
        time_spent: None,
        progress: 0,
        is_blocked: false,
        blocked_reason: None,
        agent_context: None,
        project_id: None,
        worked_by: vec![],
        created_at: 1,
        updated_at,
    }
}
