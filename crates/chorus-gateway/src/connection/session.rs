//! Session management
//!
//! A shard's resumable session: the id from READY, the last sequence number seen,
//! and where to reconnect for a resume.

use std::time::Duration;

use tokio::time::Instant;

/// How long after the last sign of life a session may still be resumed
pub const DEFAULT_RESUME_WINDOW: Duration = Duration::from_secs(180);

/// Session state of one shard
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewaySession {
    session_id: Option<String>,
    sequence: Option<u64>,
    resume_url: Option<String>,
    shard: [u32; 2],
    /// READY, RESUMED or the last heartbeat ack
    last_alive: Option<Instant>,
    resume_window: Duration,
}

impl GatewaySession {
    /// Create an empty session for `[shard_id, shard_count]`
    #[must_use]
    pub fn new(shard_id: u32, shard_count: u32) -> Self {
        Self {
            session_id: None,
            sequence: None,
            resume_url: None,
            shard: [shard_id, shard_count],
            last_alive: None,
            resume_window: DEFAULT_RESUME_WINDOW,
        }
    }

    #[must_use]
    pub fn with_resume_window(mut self, window: Duration) -> Self {
        self.resume_window = window;
        self
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Last sequence number accepted
    pub fn sequence(&self) -> Option<u64> {
        self.sequence
    }

    pub fn resume_url(&self) -> Option<&str> {
        self.resume_url.as_deref()
    }

    /// `[shard_id, shard_count]`
    pub fn shard(&self) -> [u32; 2] {
        self.shard
    }

    /// Check if a resume can be attempted at `now`
    ///
    /// Needs a session id and a sign of life no older than the resume window.
    pub fn can_resume(&self, now: Instant) -> bool {
        self.session_id.is_some()
            && self
                .last_alive
                .is_some_and(|alive| now.saturating_duration_since(alive) <= self.resume_window)
    }

    /// Check if a session id is held, fresh or not
    pub fn has_session(&self) -> bool {
        self.session_id.is_some()
    }

    /// Record the session created by READY
    pub fn start(&mut self, session_id: impl Into<String>, resume_url: Option<String>, now: Instant) {
        self.session_id = Some(session_id.into());
        self.resume_url = resume_url;
        self.last_alive = Some(now);
    }

    /// The gateway answered: a heartbeat ack or RESUMED
    pub fn alive(&mut self, now: Instant) {
        if self.session_id.is_some() {
            self.last_alive = Some(now);
        }
    }

    /// Accept a dispatch sequence number
    ///
    /// Returns false for stale or duplicate numbers, which must be dropped.
    pub fn observe(&mut self, sequence: u64) -> bool {
        if self.sequence.is_some_and(|current| sequence <= current) {
            return false;
        }
        self.sequence = Some(sequence);
        true
    }

    /// Forget the session so the next connection identifies from scratch
    pub fn invalidate(&mut self) {
        self.session_id = None;
        self.sequence = None;
        self.resume_url = None;
        self.last_alive = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_is_monotonic() {
        let mut session = GatewaySession::new(0, 1);
        let mut accepted = Vec::new();
        let mut stored = Vec::new();

        for seq in [1, 2, 2, 1, 3] {
            accepted.push(session.observe(seq));
            stored.push(session.sequence().unwrap());
        }

        assert_eq!(accepted, vec![true, true, false, false, true]);
        assert_eq!(stored, vec![1, 2, 2, 2, 3]);
    }

    #[test]
    fn test_resume_requires_session_id() {
        let now = Instant::now();
        let mut session = GatewaySession::new(2, 4);
        assert!(!session.can_resume(now));
        assert_eq!(session.shard(), [2, 4]);

        session.alive(now);
        assert!(!session.can_resume(now));

        session.start("abc", Some("wss://resume.example".to_string()), now);
        session.observe(7);
        assert!(session.can_resume(now));
        assert_eq!(session.session_id(), Some("abc"));
        assert_eq!(session.resume_url(), Some("wss://resume.example"));
    }

    #[test]
    fn test_resume_window_counts_from_last_sign_of_life() {
        let start = Instant::now();
        let mut session = GatewaySession::new(0, 1).with_resume_window(Duration::from_secs(10));
        session.start("abc", None, start);

        assert!(session.can_resume(start + Duration::from_secs(10)));
        assert!(!session.can_resume(start + Duration::from_secs(11)));
        assert!(session.has_session());

        session.alive(start + Duration::from_secs(8));
        assert!(session.can_resume(start + Duration::from_secs(15)));
        assert!(!session.can_resume(start + Duration::from_secs(19)));
    }

    #[test]
    fn test_invalidate_resets_sequence() {
        let now = Instant::now();
        let mut session = GatewaySession::new(0, 1);
        session.start("abc", None, now);
        session.observe(10);

        session.invalidate();
        assert!(!session.can_resume(now));
        assert!(!session.has_session());
        assert_eq!(session.sequence(), None);
        assert_eq!(session.shard(), [0, 1]);

        // A fresh READY starts counting from 1 again
        assert!(session.observe(1));
    }
}
