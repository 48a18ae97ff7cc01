//! Event fan-out to subscribers
//!
//! Every subscriber owns an unbounded queue, so a slow listener never loses events and
//! never blocks a shard. Events arrive in the order shards emitted them.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::GatewayEvent;

#[derive(Debug, Default)]
struct Subscribers {
    senders: Vec<mpsc::UnboundedSender<GatewayEvent>>,
    closed: bool,
}

/// Sending side shared by the manager and its shards
#[derive(Debug, Clone, Default)]
pub struct EventHub {
    inner: Arc<Mutex<Subscribers>>,
}

impl EventHub {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// New stream that receives every event emitted from now on
    #[must_use]
    pub fn subscribe(&self) -> EventStream {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.inner.lock();
        if !inner.closed {
            inner.senders.push(tx);
        }
        EventStream { rx }
    }

    /// Deliver `event` to every live subscriber; returns how many received it
    pub fn emit(&self, event: GatewayEvent) -> usize {
        let mut inner = self.inner.lock();
        inner.senders.retain(|tx| tx.send(event.clone()).is_ok());
        inner.senders.len()
    }

    /// End every stream once it has drained; later subscribers get an ended stream
    pub fn close(&self) {
        let mut inner = self.inner.lock();
        inner.closed = true;
        inner.senders.clear();
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().senders.len()
    }
}

/// Receiving side of one subscription
#[derive(Debug)]
pub struct EventStream {
    rx: mpsc::UnboundedReceiver<GatewayEvent>,
}

impl EventStream {
    /// Next event; `None` once the gateway shut down and the queue is drained
    pub async fn recv(&mut self) -> Option<GatewayEvent> {
        self.rx.recv().await
    }

    /// Next event if one is queued
    pub fn try_recv(&mut self) -> Option<GatewayEvent> {
        self.rx.try_recv().ok()
    }

    /// Events queued and not yet received
    #[must_use]
    pub fn pending(&self) -> usize {
        self.rx.len()
    }
}
