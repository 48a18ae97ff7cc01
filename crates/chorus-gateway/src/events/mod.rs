//! Gateway events
//!
//! What shards report to the application, and how dispatches update the cache.

pub mod cache_sync;
mod event_types;
mod hub;

pub use event_types::GatewayEventType;
pub use hub::{EventHub, EventStream};

use chorus_core::Snowflake;
use serde_json::Value;

/// Event stream item produced by the gateway manager
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayEvent {
    /// A shard identified and received READY
    Ready {
        shard_id: u32,
        session_id: String,
        user_id: Option<Snowflake>,
    },
    /// A shard resumed its session
    Resumed { shard_id: u32 },
    /// A shard lost its connection and will reconnect
    Disconnected {
        shard_id: u32,
        /// Close code, if the connection was closed rather than dropped
        code: Option<u16>,
        /// Whether the next connection resumes the session
        resumable: bool,
    },
    /// A shard stopped for good
    Fatal { shard_id: u32, code: u16 },
    /// A dispatch, after it was applied to the cache
    Dispatch(DispatchEvent),
}

impl GatewayEvent {
    /// Shard that produced the event
    #[must_use]
    pub fn shard_id(&self) -> u32 {
        match self {
            Self::Ready { shard_id, .. }
            | Self::Resumed { shard_id }
            | Self::Disconnected { shard_id, .. }
            | Self::Fatal { shard_id, .. } => *shard_id,
            Self::Dispatch(dispatch) => dispatch.shard_id,
        }
    }
}

/// A dispatched event (op 0)
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchEvent {
    pub shard_id: u32,
    pub sequence: Option<u64>,
    /// Event name, e.g. `MESSAGE_CREATE`
    pub name: String,
    pub data: Value,
}

impl DispatchEvent {
    /// Typed event name, if the cache knows it
    #[must_use]
    pub fn kind(&self) -> Option<GatewayEventType> {
        GatewayEventType::from_name(&self.name)
    }
}
