//! Exponential backoff with jitter
//!
//! Used for REST server-error retries and gateway reconnect attempts.

use rand::Rng;
use std::time::Duration;

/// Backoff policy
#[derive(Debug, Clone)]
pub struct Backoff {
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
    /// Growth factor per attempt
    pub multiplier: f64,
    /// Jitter factor (0.0 - 1.0)
    pub jitter: f64,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            jitter: 0.25,
        }
    }
}

impl Backoff {
    /// Create a policy with the given bounds and default growth
    #[must_use]
    pub fn new(base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            base_delay,
            max_delay,
            ..Self::default()
        }
    }

    /// Same policy without randomness
    #[must_use]
    pub fn without_jitter(mut self) -> Self {
        self.jitter = 0.0;
        self
    }

    /// Calculate delay for a given attempt (0-indexed)
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base = self.base_delay.as_millis() as f64;
        let delay = base * self.multiplier.powi(attempt.min(31) as i32);
        let delay = delay.min(self.max_delay.as_millis() as f64);

        // Apply jitter
        let jitter_range = delay * self.jitter;
        let jitter = if jitter_range > 0.0 {
            rand::thread_rng().gen_range(-jitter_range..=jitter_range)
        } else {
            0.0
        };
        let final_delay = (delay + jitter).clamp(0.0, self.max_delay.as_millis() as f64);

        Duration::from_millis(final_delay as u64)
    }
}
