use std::time::Duration;

use crate::foundation::error::ReelResult;

/// Retry schedule shared by the asset loader and the encode sink.
///
/// Delays grow exponentially from `initial_delay` and are capped at `max_delay`. There is no
/// jitter: identical inputs produce identical schedules.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first one.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub initial_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Single attempt, never retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Delay to wait before attempt `attempt` (0-indexed). The first attempt never waits.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let factor = 1u32 << (attempt - 1).min(16);
        self.initial_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// The full backoff schedule, one entry per retry.
    pub fn schedule(&self) -> Vec<Duration> {
        (1..self.max_attempts.max(1))
            .map(|a| self.delay_for_attempt(a))
            .collect()
    }

    /// Run `op` until it succeeds, fails with a non-transient error, or attempts run out.
    ///
    /// `op` receives the 0-based attempt number. The last error is returned on exhaustion.
    pub fn run<T>(&self, label: &str, mut op: impl FnMut(u32) -> ReelResult<T>) -> ReelResult<T> {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 0u32;
        loop {
            let delay = self.delay_for_attempt(attempt);
            if !delay.is_zero() {
                std::thread::sleep(delay);
            }
            match op(attempt) {
                Ok(v) => return Ok(v),
                Err(e) if e.is_transient() && attempt + 1 < attempts => {
                    tracing::debug!(label, attempt, error = %e, "retrying after transient failure");
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/retry.rs"]
mod tests;
