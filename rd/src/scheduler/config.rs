//! Scheduler configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Floor for the polling interval. Requests below this are clamped up, not
/// rejected, to keep a mistyped value from turning into a sub-second
/// polling loop against the search engine.
pub const MIN_INTERVAL_MS: u64 = 1_000;

/// Interval used when none was ever configured
pub const DEFAULT_INTERVAL_MS: u64 = 60_000;

/// Scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Polling interval in milliseconds
    #[serde(default = "default_interval_ms", rename = "interval-ms")]
    pub interval_ms: u64,
}

fn default_interval_ms() -> u64 {
    DEFAULT_INTERVAL_MS
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_INTERVAL_MS,
        }
    }
}

impl SchedulerConfig {
    /// Get the configured interval as a Duration, floor applied
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(MIN_INTERVAL_MS))
    }
}
