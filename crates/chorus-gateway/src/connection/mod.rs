//! Shard connections
//!
//! One task per shard runs the gateway state machine; the manager owns the shards and
//! routes packets to them.

mod heartbeat;
mod identify_queue;
mod manager;
mod session;
mod shard;
mod state;

pub use heartbeat::{Heartbeat, HeartbeatAction};
pub use identify_queue::IdentifyQueue;
pub use manager::GatewayManager;
pub use session::GatewaySession;
pub use shard::ShardConfig;
pub use state::ShardState;
