//! Watcher singleton operations.
//!
//! One row ever exists (enforced by the schema). The record is toggled by
//! user action and refreshed by heartbeats from an external agent process.

use super::{now_ms, Database};
use crate::types::WatcherConfig;
use anyhow::Result;
use rusqlite::{params, Row};

fn parse_watcher_row(row: &Row) -> rusqlite::Result<WatcherConfig> {
    let active_json: String = row.get("active_task_ids")?;
    Ok(WatcherConfig {
        is_running: row.get::<_, i64>("is_running")? != 0,
        last_run: row.get("last_run")?,
        current_task_id: row.get("current_task_id")?,
        active_task_ids: serde_json::from_str(&active_json).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
        })?,
    })
}

impl Database {
    /// Read the watcher singleton.
    pub fn watcher_config(&self) -> Result<WatcherConfig> {
        self.with_conn(|conn| {
            let config = conn.query_row(
                "SELECT is_running, last_run, current_task_id, active_task_ids \
                 FROM watcher_config WHERE id = 1",
                [],
                parse_watcher_row,
            )?;
            Ok(config)
        })
    }

    /// Toggle the agent loop on or off. Stopping clears the held tasks.
    pub fn set_watcher_running(&self, is_running: bool) -> Result<WatcherConfig> {
        self.with_conn(|conn| {
            if is_running {
                conn.execute(
                    "UPDATE watcher_config SET is_running = 1 WHERE id = 1",
                    [],
                )?;
            } else {
                conn.execute(
                    "UPDATE watcher_config SET is_running = 0, current_task_id = NULL, \
                     active_task_ids = '[]' WHERE id = 1",
                    [],
                )?;
            }
            Ok(())
        })?;
        self.watcher_config()
    }

    /// Heartbeat from the agent process: marks the loop running, stamps
    /// `last_run`, and records the tasks it currently holds.
    pub fn record_watcher_heartbeat(
        &self,
        current_task_id: Option<String>,
        active_task_ids: Vec<String>,
    ) -> Result<WatcherConfig> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE watcher_config SET is_running = 1, last_run = ?1, \
                 current_task_id = ?2, active_task_ids = ?3 WHERE id = 1",
                params![
                    now_ms(),
                    current_task_id,
                    serde_json::to_string(&active_task_ids)?
                ],
            )?;
            Ok(())
        })?;
        self.watcher_config()
    }
}
