//! Append retry policy.
//!
//! Conditional appends can lose a race against another writer.  The appender
//! re-reads the tip and tries again, at most `max_attempts` times in total,
//! sleeping `backoff * attempt` between tries.  There is deliberately no
//! `Default`: the retry budget is an explicit deployment decision.

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppendPolicy {
    /// Total attempts including the first.  Always at least 1.
    pub max_attempts: u32,
    /// Base delay; attempt `n` (1-based) waits `backoff * n` before retrying.
    pub backoff: Duration,
}

impl AppendPolicy {
    /// Build a policy.  `max_attempts` of 0 is raised to 1.
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// A single attempt with no retry.
    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Delay to wait after the failed attempt number `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(attempt)
    }
}
