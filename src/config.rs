//! Runtime configuration.

use std::time::Duration;

/// Period between change-detection passes when none is configured.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(10);

/// Settings for a [`Runtime`](crate::pipeline::Runtime).
///
/// # Example
///
/// ```ignore
/// let config = Config::default().tick_interval(Duration::from_millis(16));
/// let runtime = Runtime::with_config(Document::with_mount_point(), config);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Period of the polling scheduler.
    pub tick_interval: Duration,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tick_interval: DEFAULT_TICK_INTERVAL,
        }
    }
}
