//! Shard connection states

use std::fmt;

/// State of one shard's connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShardState {
    /// Not started
    Disconnected,
    /// Opening the WebSocket
    Connecting,
    /// Waiting for the identify slot or READY
    Identifying,
    /// Session established; outbound packets flow
    Connected,
    /// Resume sent, waiting for RESUMED
    Resuming,
    /// Connection lost, waiting to reconnect
    Reconnecting,
    /// Stopped for good, with the close code that stopped it
    Closed(u16),
}

impl ShardState {
    #[must_use]
    pub const fn is_connected(self) -> bool {
        matches!(self, Self::Connected)
    }

    #[must_use]
    pub const fn is_closed(self) -> bool {
        matches!(self, Self::Closed(_))
    }

    /// Get the name of this state
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Disconnected => "Disconnected",
            Self::Connecting => "Connecting",
            Self::Identifying => "Identifying",
            Self::Connected => "Connected",
            Self::Resuming => "Resuming",
            Self::Reconnecting => "Reconnecting",
            Self::Closed(_) => "Closed",
        }
    }
}

impl fmt::Display for ShardState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed(code) => write!(f, "Closed ({code})"),
            other => f.write_str(other.name()),
        }
    }
}
