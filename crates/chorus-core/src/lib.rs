//! # chorus-core
//!
//! Domain layer containing snowflakes, entity models, presence value objects, and the
//! entity store that REST responses and gateway events both feed.
//! This crate has zero dependencies on transport (HTTP, WebSocket, etc.).

pub mod entities;
pub mod error;
pub mod store;
pub mod value_objects;

// Re-export commonly used types at crate root
pub use entities::{
    Attachment, CategoryChannel, Channel, ChannelType, DmChannel, Entity, FactoryContext,
    GroupDmChannel, Guild, Invite, InviteOptions, Message, Presence, TextBased, TextChannel,
    User, VoiceChannel,
};
pub use error::ModelError;
pub use store::{Cache, EntityRef, Store, DEFAULT_MESSAGE_LIMIT};
pub use value_objects::{
    Activity, ActivityType, ClientPresence, PresenceUpdate, Snowflake, SnowflakeParseError,
    Status,
};
