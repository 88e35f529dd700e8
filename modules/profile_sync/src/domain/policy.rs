use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Bounded fixed-delay retry used while a freshly created profile is not yet
/// visible to reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryPolicy {
    /// Total number of fetches, the first one included.
    pub max_attempts: u32,
    /// Pause between two consecutive fetches.
    #[serde(with = "humantime_serde")]
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// Zero-delay policy, handy in tests.
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO)
    }

    /// A policy never performs fewer than one fetch.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Upper bound of the time spent sleeping for one exhausted sequence.
    pub fn total_delay(&self) -> Duration {
        self.delay * (self.attempts() - 1)
    }
}
