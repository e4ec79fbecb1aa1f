//! Client stream session: connection state machine with reconnect backoff.
//!
//! A supervisor task owns the single live stream. The caller's enable flag
//! rides a watch channel, so disabling cancels an in-flight connect, a
//! running stream, or a pending backoff sleep at the next `select!` point —
//! there is never a second concurrent reconnect timer.

use crate::client::sse::parse_sse_frame;
use crate::config::BackoffConfig;
use crate::types::{Task, WatcherConfig};
use futures::StreamExt;
use reqwest::header;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Connection state exposed for UI indicators (the "Live" badge).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
        };
        f.write_str(s)
    }
}

/// Callbacks invoked by the session. All default to no-ops so a consumer
/// can implement only what it renders.
pub trait StreamObserver: Send + Sync {
    fn on_connect(&self) {}
    fn on_disconnect(&self) {}
    fn on_tasks_update(&self, _tasks: Vec<Task>) {}
    fn on_watcher_update(&self, _config: WatcherConfig) {}
}

/// Session settings.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Server base URL, e.g. `http://127.0.0.1:31870`.
    pub base_url: String,
    pub backoff: BackoffConfig,
}

/// Backoff delay after the `failures`-th consecutive connection failure
/// (1-based). `None` once the attempt budget is exhausted.
pub fn reconnect_delay(failures: u32, backoff: &BackoffConfig) -> Option<Duration> {
    if failures == 0 || failures >= backoff.max_attempts {
        return None;
    }
    let exp = (failures - 1).min(31);
    let delay_ms = backoff.base_delay_ms.saturating_mul(1u64 << exp);
    Some(Duration::from_millis(delay_ms.min(backoff.max_delay_ms)))
}

/// Handle to a running stream session. Dropping it stops the supervisor.
pub struct StreamSession {
    enabled_tx: watch::Sender<bool>,
    state_rx: watch::Receiver<ConnectionState>,
    supervisor: JoinHandle<()>,
}

impl StreamSession {
    /// Spawn a session, enabled and connecting immediately.
    pub fn spawn(config: SessionConfig, observer: Arc<dyn StreamObserver>) -> Self {
        let (enabled_tx, enabled_rx) = watch::channel(true);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let supervisor = tokio::spawn(run_session(config, observer, enabled_rx, state_tx));
        Self {
            enabled_tx,
            state_rx,
            supervisor,
        }
    }

    /// Enable live updates and (re)connect. No-op when already enabled.
    pub fn connect(&self) {
        self.set_enabled(true);
    }

    /// Disable live updates: close any open stream, cancel any pending
    /// reconnect, and stay disconnected. Idempotent.
    pub fn disconnect(&self) {
        self.set_enabled(false);
    }

    /// The user-facing live-updates switch.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled_tx.send_if_modified(|current| {
            if *current == enabled {
                false
            } else {
                *current = enabled;
                true
            }
        });
    }

    pub fn is_enabled(&self) -> bool {
        *self.enabled_tx.borrow()
    }

    /// Current connection state.
    pub fn connection_state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// Watch connection state transitions.
    pub fn state_watch(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    /// Stop the session outright.
    pub fn shutdown(self) {
        self.supervisor.abort();
    }
}

impl Drop for StreamSession {
    fn drop(&mut self) {
        self.supervisor.abort();
    }
}

enum StreamOutcome {
    /// The enable switch turned off.
    Disabled,
    /// Transport-level failure or server-side end of stream.
    TransportError,
}

async fn run_session(
    config: SessionConfig,
    observer: Arc<dyn StreamObserver>,
    mut enabled_rx: watch::Receiver<bool>,
    state_tx: watch::Sender<ConnectionState>,
) {
    let client = reqwest::Client::new();
    let url = format!("{}/api/events", config.base_url.trim_end_matches('/'));
    let mut failures: u32 = 0;

    loop {
        if !*enabled_rx.borrow_and_update() {
            if enabled_rx.changed().await.is_err() {
                return;
            }
            // Manual re-enable starts with a fresh attempt budget
            failures = 0;
            continue;
        }

        let _ = state_tx.send(ConnectionState::Connecting);
        let outcome = run_stream(
            &client,
            &url,
            &observer,
            &mut enabled_rx,
            &state_tx,
            &mut failures,
        )
        .await;

        let _ = state_tx.send(ConnectionState::Disconnected);
        observer.on_disconnect();

        match outcome {
            StreamOutcome::Disabled => {
                failures = 0;
            }
            StreamOutcome::TransportError => {
                failures += 1;
                match reconnect_delay(failures, &config.backoff) {
                    Some(delay) => {
                        debug!(attempt = failures, ?delay, "scheduling reconnect");
                        tokio::select! {
                            _ = tokio::time::sleep(delay) => {}
                            _ = wait_disabled(&mut enabled_rx) => {
                                failures = 0;
                            }
                        }
                    }
                    None => {
                        error!(
                            "giving up after {failures} failed connection attempts; \
                             toggle live updates to retry"
                        );
                        // Terminal until the switch is cycled
                        wait_disabled(&mut enabled_rx).await;
                        failures = 0;
                    }
                }
            }
        }
    }
}

/// Open one stream and pump it until it fails or the switch turns off.
async fn run_stream(
    client: &reqwest::Client,
    url: &str,
    observer: &Arc<dyn StreamObserver>,
    enabled_rx: &mut watch::Receiver<bool>,
    state_tx: &watch::Sender<ConnectionState>,
    failures: &mut u32,
) -> StreamOutcome {
    let request = client
        .get(url)
        .header(header::ACCEPT, "text/event-stream")
        .send();

    let response = tokio::select! {
        response = request => response,
        _ = wait_disabled(enabled_rx) => return StreamOutcome::Disabled,
    };

    let response = match response.and_then(|r| r.error_for_status()) {
        Ok(response) => response,
        Err(e) => {
            warn!("event stream connect failed: {e}");
            return StreamOutcome::TransportError;
        }
    };

    let mut stream = response.bytes_stream();
    let mut buffer = String::new();

    loop {
        let chunk = tokio::select! {
            chunk = stream.next() => chunk,
            _ = wait_disabled(enabled_rx) => return StreamOutcome::Disabled,
        };

        let chunk = match chunk {
            Some(Ok(chunk)) => chunk,
            Some(Err(e)) => {
                warn!("event stream read error: {e}");
                return StreamOutcome::TransportError;
            }
            None => {
                info!("event stream ended by server");
                return StreamOutcome::TransportError;
            }
        };

        buffer.push_str(&String::from_utf8_lossy(&chunk));
        while let Some(frame) = parse_sse_frame(&mut buffer) {
            match frame.event.as_str() {
                "connected" => {
                    *failures = 0;
                    let _ = state_tx.send(ConnectionState::Connected);
                    observer.on_connect();
                }
                "tasks" => match serde_json::from_str::<Vec<Task>>(&frame.data) {
                    Ok(tasks) => observer.on_tasks_update(tasks),
                    // A single malformed message is dropped; the session
                    // stays connected.
                    Err(e) => warn!("dropping malformed tasks event: {e}"),
                },
                "watcher" => match serde_json::from_str::<WatcherConfig>(&frame.data) {
                    Ok(config) => observer.on_watcher_update(config),
                    Err(e) => warn!("dropping malformed watcher event: {e}"),
                },
                other => debug!("ignoring unknown event '{other}'"),
            }
        }
    }
}

/// Resolves when the enable switch turns off (or the session handle is
/// dropped, which aborts the supervisor anyway).
async fn wait_disabled(enabled_rx: &mut watch::Receiver<bool>) {
    while *enabled_rx.borrow_and_update() {
        if enabled_rx.changed().await.is_err() {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backoff() -> BackoffConfig {
        BackoffConfig::default()
    }

    #[test]
    fn delays_double_from_base() {
        let cfg = backoff();
        assert_eq!(reconnect_delay(1, &cfg), Some(Duration::from_millis(1_000)));
        assert_eq!(reconnect_delay(2, &cfg), Some(Duration::from_millis(2_000)));
        assert_eq!(reconnect_delay(3, &cfg), Some(Duration::from_millis(4_000)));
        assert_eq!(reconnect_delay(5, &cfg), Some(Duration::from_millis(16_000)));
    }

    #[test]
    fn delays_cap_at_max() {
        let cfg = backoff();
        // 1000 * 2^5 = 32000 exceeds the 30000 cap
        assert_eq!(reconnect_delay(6, &cfg), Some(Duration::from_millis(30_000)));
        assert_eq!(reconnect_delay(9, &cfg), Some(Duration::from_millis(30_000)));
    }

    #[test]
    fn gives_up_at_max_attempts() {
        let cfg = backoff();
        assert!(reconnect_delay(9, &cfg).is_some());
        assert_eq!(reconnect_delay(10, &cfg), None);
        assert_eq!(reconnect_delay(11, &cfg), None);
    }

    #[test]
    fn no_delay_before_any_failure() {
        assert_eq!(reconnect_delay(0, &backoff()), None);
    }

    #[test]
    fn huge_attempt_counts_do_not_overflow() {
        let cfg = BackoffConfig {
            base_delay_ms: u64::MAX / 2,
            max_delay_ms: 30_000,
            max_attempts: u32::MAX,
        };
        assert_eq!(
            reconnect_delay(40, &cfg),
            Some(Duration::from_millis(30_000))
        );
    }
}
