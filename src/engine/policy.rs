//! Adaptive poll cadence

use std::time::Duration;

use crate::config::PollingSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollTimings {
    /// Something is audibly playing
    pub playing: Duration,
    pub idle: Duration,
    pub error_base: Duration,
    pub error_max: Duration,
}

impl Default for PollTimings {
    fn default() -> Self {
        Self::from(&PollingSettings::default())
    }
}

impl From<&PollingSettings> for PollTimings {
    fn from(settings: &PollingSettings) -> Self {
        Self {
            playing: Duration::from_millis(settings.playing_ms),
            idle: Duration::from_millis(settings.idle_ms),
            error_base: Duration::from_millis(settings.error_base_ms),
            error_max: Duration::from_millis(settings.error_max_ms),
        }
    }
}

impl PollTimings {
    /// `min(error_base * 2^(level-1), error_max)` for backoff level >= 1.
    pub fn error_delay(&self, level: u32) -> Duration {
        let factor = 2u32.saturating_pow(level.saturating_sub(1));
        self.error_base.saturating_mul(factor).min(self.error_max)
    }
}

/// Poller bookkeeping. `epoch` changes on every start and stop so a loop
/// can tell it has been superseded.
#[derive(Debug, Default)]
pub struct PollingPolicy {
    pub active: bool,
    pub backoff_level: u32,
    pub epoch: u64,
}

impl PollingPolicy {
    pub fn on_success(&mut self) {
        self.backoff_level = 0;
    }

    /// Bump the backoff level and return the delay before the next poll.
    pub fn on_failure(&mut self, timings: &PollTimings) -> Duration {
        self.backoff_level = self.backoff_level.saturating_add(1);
        timings.error_delay(self.backoff_level)
    }
}
