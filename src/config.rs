//! Configuration for the event stream and client reconnection.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default port for the HTTP API and event stream.
pub const DEFAULT_PORT: u16 = 31870;

/// Interval of the server-side change-detection loop, in milliseconds.
/// Fixed in the current design; the heartbeat rides on the same tick.
pub const POLL_INTERVAL_MS: u64 = 2_000;

/// Server-side stream settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Change-detection poll interval in milliseconds (default: 2000).
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl StreamConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

fn default_poll_interval_ms() -> u64 {
    POLL_INTERVAL_MS
}

/// Client reconnection parameters. The cap is deliberately much larger than
/// the poll interval so a flapping network does not reconnect in lockstep
/// with the server's ticks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackoffConfig {
    /// First retry delay in milliseconds (default: 1000).
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Maximum retry delay in milliseconds (default: 30000).
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Connection attempts before giving up (default: 10).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            max_attempts: default_max_attempts(),
        }
    }
}

fn default_base_delay_ms() -> u64 {
    1_000
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_max_attempts() -> u32 {
    10
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_fields() {
        let config: BackoffConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.base_delay_ms, 1_000);
        assert_eq!(config.max_delay_ms, 30_000);
        assert_eq!(config.max_attempts, 10);

        let stream: StreamConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(stream.poll_interval(), Duration::from_millis(2_000));
    }
}
