//! Heartbeat/keepalive tracking
//!
//! The shard owns one `Heartbeat` per connection and polls `next_beat()` in its loop.

use std::time::Duration;

use tokio::time::Instant;

/// What the shard should do when the heartbeat timer fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatAction {
    /// Send a heartbeat now
    Beat,
    /// The last beat went unacknowledged; count it and beat again
    BeatAfterMiss,
    /// `max_missed_acks` beats in a row went unacknowledged; the connection is a zombie
    Zombie,
}

/// Heartbeat state of one connection
#[derive(Debug, Clone)]
pub struct Heartbeat {
    interval: Duration,
    max_missed_acks: u32,
    next_beat: Instant,
    awaiting_ack: bool,
    missed_acks: u32,
    last_sent: Option<Instant>,
    latency: Option<Duration>,
}

impl Heartbeat {
    /// Start tracking; the first beat is due after `interval * jitter`
    #[must_use]
    pub fn start(interval: Duration, max_missed_acks: u32, jitter: f64, now: Instant) -> Self {
        Self {
            interval,
            max_missed_acks: max_missed_acks.max(1),
            next_beat: now + interval.mul_f64(jitter.clamp(0.0, 1.0)),
            awaiting_ack: false,
            missed_acks: 0,
            last_sent: None,
            latency: None,
        }
    }

    /// Start with a random jitter in `[0, 1)`
    #[must_use]
    pub fn start_jittered(interval: Duration, max_missed_acks: u32, now: Instant) -> Self {
        Self::start(interval, max_missed_acks, rand::random::<f64>(), now)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// When the timer fires next
    pub fn next_beat(&self) -> Instant {
        self.next_beat
    }

    /// Consecutive beats that went unacknowledged
    pub fn missed_acks(&self) -> u32 {
        self.missed_acks
    }

    /// Round trip of the last acknowledged beat
    pub fn latency(&self) -> Option<Duration> {
        self.latency
    }

    /// Timer fired; decide and schedule the next tick
    pub fn tick(&mut self, now: Instant) -> HeartbeatAction {
        self.next_beat = now + self.interval;

        if !self.awaiting_ack {
            return HeartbeatAction::Beat;
        }

        self.missed_acks += 1;
        if self.missed_acks >= self.max_missed_acks {
            HeartbeatAction::Zombie
        } else {
            HeartbeatAction::BeatAfterMiss
        }
    }

    /// A heartbeat was sent
    pub fn sent(&mut self, now: Instant) {
        self.awaiting_ack = true;
        self.last_sent = Some(now);
    }

    /// The server acknowledged the last heartbeat
    pub fn acked(&mut self, now: Instant) {
        self.awaiting_ack = false;
        self.missed_acks = 0;
        self.latency = self.last_sent.map(|sent| now.saturating_duration_since(sent));
    }
}
