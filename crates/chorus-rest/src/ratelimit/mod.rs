//! Rate limiting - per-route buckets and the global gate

mod bucket;
mod headers;

pub use bucket::Bucket;
pub use headers::RateLimitHeaders;

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Bucket registry plus the global gate
///
/// Each bucket sits behind a fair `tokio::sync::Mutex`, so waiters on one route are
/// released in arrival order and only one request per route is in flight.
#[derive(Debug, Default)]
pub struct RateLimiter {
    buckets: DashMap<String, Arc<Mutex<Bucket>>>,
    global_reset: parking_lot::Mutex<Option<Instant>>,
}

impl RateLimiter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bucket for `key`, created on first use
    pub fn bucket(&self, key: &str) -> Arc<Mutex<Bucket>> {
        if let Some(existing) = self.buckets.get(key) {
            return Arc::clone(existing.value());
        }
        Arc::clone(
            self.buckets
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(Bucket::new())))
                .value(),
        )
    }

    /// Number of known buckets
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Close the global gate for `delay`; an already longer closure is kept
    pub fn close_global(&self, delay: Duration) {
        let until = Instant::now() + delay;
        let mut gate = self.global_reset.lock();
        if gate.is_none_or(|current| current < until) {
            *gate = Some(until);
        }
    }

    /// When the global gate reopens, if it is closed
    pub fn global_reset(&self) -> Option<Instant> {
        let gate = *self.global_reset.lock();
        gate.filter(|until| *until > Instant::now())
    }

    /// Wait until the global gate is open
    pub async fn wait_global(&self) {
        // The gate can be pushed further out while sleeping
        while let Some(until) = self.global_reset() {
            tracing::debug!(
                wait_ms = until.saturating_duration_since(Instant::now()).as_millis() as u64,
                "Waiting for global rate limit"
            );
            tokio::time::sleep_until(until).await;
        }
    }
}
