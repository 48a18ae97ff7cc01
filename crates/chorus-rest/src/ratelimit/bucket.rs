//! Per-route rate-limit bucket

use std::time::Duration;

use tokio::time::Instant;

use super::headers::RateLimitHeaders;

/// Budget of one route bucket
///
/// Unknown until the first response; an unknown bucket lets one request through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket {
    pub limit: Option<u32>,
    pub remaining: u32,
    pub reset_at: Option<Instant>,
}

impl Default for Bucket {
    fn default() -> Self {
        Self::new()
    }
}

impl Bucket {
    #[must_use]
    pub fn new() -> Self {
        Self {
            limit: None,
            remaining: 1,
            reset_at: None,
        }
    }

    /// How long the next request must wait; refills the bucket if its window has passed
    pub fn wait_time(&mut self, now: Instant) -> Option<Duration> {
        let reset_at = self.reset_at?;
        if now >= reset_at {
            self.remaining = self.limit.unwrap_or(1).max(1);
            self.reset_at = None;
            return None;
        }
        (self.remaining == 0).then(|| reset_at - now)
    }

    /// Count a request that is about to be sent
    pub fn consume(&mut self) {
        self.remaining = self.remaining.saturating_sub(1);
    }

    /// Refresh from response headers
    pub fn update(&mut self, headers: &RateLimitHeaders, now: Instant) {
        if let Some(limit) = headers.limit {
            self.limit = Some(limit);
        }
        if let Some(remaining) = headers.remaining {
            self.remaining = remaining;
        }
        if let Some(reset_after) = headers.reset_after {
            self.reset_at = Some(now + reset_after);
        }
    }

    /// Hold every request until `now + delay`
    pub fn exhaust_for(&mut self, delay: Duration, now: Instant) {
        self.remaining = 0;
        self.reset_at = Some(now + delay);
    }
}
