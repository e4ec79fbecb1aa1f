//! State fingerprints for change detection.
//!
//! A fingerprint is a cheap serialized summary compared tick-to-tick to
//! decide whether a full snapshot must be re-broadcast. Tasks fingerprint as
//! the ordered sequence of `(id, status, updated_at)` triples: free-text
//! fields are excluded, but `updated_at` advances on every mutation, so all
//! true changes are still caught without field-by-field diffing here.

use crate::types::{Task, WatcherConfig};
use std::fmt::Write;

/// Fingerprint a task list as ordered `id:status:updated_at` triples.
pub fn tasks_fingerprint(tasks: &[Task]) -> String {
    let mut out = String::with_capacity(tasks.len() * 32);
    for task in tasks {
        // String write is infallible
        let _ = write!(out, "{}:{}:{};", task.id, task.status, task.updated_at);
    }
    out
}

/// Fingerprint the watcher singleton as its full serialized form.
pub fn watcher_fingerprint(config: &WatcherConfig) -> String {
    serde_json::to_string(config).unwrap_or_default()
}

/// Last-sent fingerprints for one stream connection.
///
/// Each connection owns its own tracker; sharing one pair of fingerprints
/// across connections would let the first client's view suppress legitimate
/// pushes to a newly connected one.
#[derive(Debug, Default)]
pub struct ConnectionTracker {
    tasks: Option<String>,
    watcher: Option<String>,
}

impl ConnectionTracker {
    /// Record the current task state. Returns true when the fingerprint
    /// moved forward, i.e. a `tasks` snapshot must be sent.
    pub fn observe_tasks(&mut self, tasks: &[Task]) -> bool {
        let fingerprint = tasks_fingerprint(tasks);
        if self.tasks.as_deref() == Some(fingerprint.as_str()) {
            return false;
        }
        self.tasks = Some(fingerprint);
        true
    }

    /// Record the current watcher state. Returns true on change.
    pub fn observe_watcher(&mut self, config: &WatcherConfig) -> bool {
        let fingerprint = watcher_fingerprint(config);
        if self.watcher.as_deref() == Some(fingerprint.as_str()) {
            return false;
        }
        self.watcher = Some(fingerprint);
        true
    }
}
