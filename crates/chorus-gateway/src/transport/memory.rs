//! In-memory transport
//!
//! `memory_gateway()` returns a connector for shards and a server handle that accepts
//! each connection as a `MemoryPeer`, which plays the gateway side of the protocol.

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{Connector, Frame, GatewayTransport, TransportError};
use crate::protocol::GatewayMessage;

/// Create a connected connector/server pair
#[must_use]
pub fn memory_gateway() -> (MemoryConnector, MemoryServer) {
    let (tx, rx) = mpsc::unbounded_channel();
    (MemoryConnector { accept: tx }, MemoryServer { incoming: rx })
}

/// Connector that hands every connection to a `MemoryServer`
#[derive(Debug, Clone)]
pub struct MemoryConnector {
    accept: mpsc::UnboundedSender<MemoryPeer>,
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn GatewayTransport>, TransportError> {
        let (client_tx, server_rx) = mpsc::unbounded_channel();
        let (server_tx, client_rx) = mpsc::unbounded_channel();

        let peer = MemoryPeer {
            url: url.to_string(),
            outbound: server_tx,
            inbound: server_rx,
        };
        self.accept
            .send(peer)
            .map_err(|_| TransportError::Connect("memory server is gone".to_string()))?;

        Ok(Box::new(MemoryTransport {
            outbound: Some(client_tx),
            inbound: client_rx,
        }))
    }
}

/// Accepts in-memory connections
#[derive(Debug)]
pub struct MemoryServer {
    incoming: mpsc::UnboundedReceiver<MemoryPeer>,
}

impl MemoryServer {
    /// Wait for the next connection
    pub async fn accept(&mut self) -> Option<MemoryPeer> {
        self.incoming.recv().await
    }
}

/// Client side of an in-memory connection
#[derive(Debug)]
pub struct MemoryTransport {
    outbound: Option<mpsc::UnboundedSender<Frame>>,
    inbound: mpsc::UnboundedReceiver<Frame>,
}

#[async_trait]
impl GatewayTransport for MemoryTransport {
    async fn send(&mut self, frame: Frame) -> Result<(), TransportError> {
        let outbound = self.outbound.as_ref().ok_or(TransportError::Closed)?;
        let closing = matches!(frame, Frame::Close { .. });
        outbound.send(frame).map_err(|_| TransportError::Closed)?;
        if closing {
            self.outbound = None;
        }
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<Frame, TransportError>> {
        self.inbound.recv().await.map(Ok)
    }
}

/// Server side of an in-memory connection
///
/// Dropping the peer drops the connection without a close frame.
#[derive(Debug)]
pub struct MemoryPeer {
    url: String,
    outbound: mpsc::UnboundedSender<Frame>,
    inbound: mpsc::UnboundedReceiver<Frame>,
}

impl MemoryPeer {
    /// URL the client connected to
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Send a gateway message to the client; false if the client hung up
    pub fn send(&self, message: &GatewayMessage) -> bool {
        match message.to_json() {
            Ok(json) => self.send_frame(Frame::Text(json)),
            Err(_) => false,
        }
    }

    /// Send a raw frame to the client
    pub fn send_frame(&self, frame: Frame) -> bool {
        self.outbound.send(frame).is_ok()
    }

    /// Close the connection with a code
    pub fn close(&self, code: u16) -> bool {
        self.send_frame(Frame::close(code, ""))
    }

    /// Next frame from the client
    pub async fn recv(&mut self) -> Option<Frame> {
        self.inbound.recv().await
    }

    /// Next gateway message from the client; `None` on a close frame, hang-up, or bad JSON
    pub async fn recv_message(&mut self) -> Option<GatewayMessage> {
        match self.recv().await? {
            Frame::Text(text) => GatewayMessage::from_json(&text).ok(),
            Frame::Close { .. } => None,
        }
    }
}
