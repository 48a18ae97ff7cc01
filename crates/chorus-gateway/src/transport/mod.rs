//! WebSocket transport seam
//!
//! Shards talk to the gateway through `GatewayTransport`, opened by a `Connector`.
//! The tungstenite implementation is used in production; the in-memory one lets tests
//! play the server side.

mod memory;
mod tungstenite;

pub use memory::{memory_gateway, MemoryConnector, MemoryPeer, MemoryServer, MemoryTransport};
pub use tungstenite::{TungsteniteConnector, TungsteniteTransport};

use async_trait::async_trait;

/// Close code reported when the peer closed without one
pub const NO_STATUS_CODE: u16 = 1005;

/// One WebSocket frame as the shard sees it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Close { code: u16, reason: String },
}

impl Frame {
    /// Create a close frame
    #[must_use]
    pub fn close(code: u16, reason: impl Into<String>) -> Self {
        Self::Close {
            code,
            reason: reason.into(),
        }
    }
}

/// Transport failures
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error("Failed to connect: {0}")]
    Connect(String),

    #[error("Connection attempt timed out")]
    Timeout,

    #[error("Failed to send frame: {0}")]
    Send(String),

    #[error("Failed to receive frame: {0}")]
    Receive(String),

    #[error("Connection is closed")]
    Closed,
}

/// One open WebSocket connection
#[async_trait]
pub trait GatewayTransport: Send {
    /// Send a frame; sending `Frame::Close` closes the connection
    async fn send(&mut self, frame: Frame) -> Result<(), TransportError>;

    /// Next frame, or `None` once the connection is gone
    ///
    /// Must be cancel-safe: the shard polls it inside `tokio::select!`.
    async fn recv(&mut self) -> Option<Result<Frame, TransportError>>;
}

/// Opens transports
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn connect(&self, url: &str) -> Result<Box<dyn GatewayTransport>, TransportError>;
}
