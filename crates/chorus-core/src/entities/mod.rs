//! Domain entities - platform objects built from raw payloads

mod channel;
mod fields;
mod guild;
mod invite;
mod message;
mod presence;
mod user;

pub use channel::{
    CategoryChannel, Channel, ChannelType, DmChannel, GroupDmChannel, TextBased, TextChannel,
    VoiceChannel,
};
pub use guild::Guild;
pub use invite::{Invite, InviteOptions, INVITE_URL};
pub use message::{Attachment, Message};
pub use presence::Presence;
pub use user::User;

use serde_json::Value;

use crate::error::ModelError;
use crate::value_objects::Snowflake;

/// Context handed to entity constructors
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FactoryContext {
    /// Shard that delivered the payload, if it came from the gateway
    pub shard_id: Option<u32>,
}

impl FactoryContext {
    /// Context for a payload delivered by `shard_id`
    #[must_use]
    pub fn for_shard(shard_id: u32) -> Self {
        Self {
            shard_id: Some(shard_id),
        }
    }
}

/// An object kept in a [`Store`](crate::store::Store)
pub trait Entity: Clone + Send + Sync + Sized + 'static {
    /// Short name used in errors and logs
    const KIND: &'static str;

    /// Key of this entity in its store
    fn id(&self) -> Snowflake;

    /// Key a raw payload would be stored under
    fn id_of(raw: &Value) -> Result<Snowflake, ModelError> {
        fields::Fields::new(raw, Self::KIND)?.required("id")
    }

    /// Build a new entity from a full payload
    fn from_raw(raw: &Value, ctx: &FactoryContext) -> Result<Self, ModelError>;

    /// Apply a (possibly partial) payload; absent fields keep their values
    ///
    /// May leave `self` half-updated on error; the store patches a copy.
    fn patch(&mut self, raw: &Value) -> Result<(), ModelError>;
}
