//! Identify queue shared by every shard
//!
//! The gateway accepts one Identify per interval. Shards reserve slots in arrival
//! order and wait for their slot without holding any lock.

use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

/// FIFO identify slots spaced `interval` apart
#[derive(Debug)]
pub struct IdentifyQueue {
    interval: Duration,
    last_slot: Mutex<Option<Instant>>,
}

impl IdentifyQueue {
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_slot: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Reserve the next slot, no earlier than now
    pub fn reserve(&self) -> Instant {
        self.reserve_after(Instant::now())
    }

    /// Reserve the next slot, no earlier than `earliest`
    pub fn reserve_after(&self, earliest: Instant) -> Instant {
        let mut last = self.last_slot.lock();
        let slot = match *last {
            Some(previous) => earliest.max(previous + self.interval),
            None => earliest,
        };
        *last = Some(slot);
        slot
    }
}
