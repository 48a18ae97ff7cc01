//! # chorus-gateway
//!
//! Gateway client: the wire protocol, one state machine task per shard, cache
//! synchronisation for dispatches, and the manager that fans packets out to shards.

pub mod connection;
pub mod error;
pub mod events;
pub mod protocol;
pub mod transport;

// Re-export commonly used types at crate root
pub use connection::{GatewayManager, ShardState};
pub use error::GatewayError;
pub use events::{DispatchEvent, EventStream, GatewayEvent, GatewayEventType};
pub use protocol::{
    CloseCode, GatewayMessage, OpCode, PresenceUpdatePayload, RequestGuildMembersPayload,
};
pub use transport::{
    memory_gateway, Connector, Frame, GatewayTransport, MemoryConnector, MemoryPeer, MemoryServer,
    TransportError, TungsteniteConnector,
};
