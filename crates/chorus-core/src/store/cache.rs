//! Entity cache shared by REST callers and gateway dispatch

use std::sync::Arc;

use parking_lot::RwLock;

use super::store::{EntityRef, Store};
use crate::entities::{Channel, Guild, Message, Presence, User};
use crate::value_objects::Snowflake;

/// Default number of messages kept in memory
pub const DEFAULT_MESSAGE_LIMIT: usize = 1_000;

/// Bundle of entity stores plus the identity of the client user
#[derive(Debug)]
pub struct Cache {
    pub users: Store<User>,
    pub guilds: Store<Guild>,
    pub channels: Store<Channel>,
    pub messages: Store<Message>,
    pub presences: Store<Presence>,
    current_user: RwLock<Option<Snowflake>>,
}

impl Cache {
    /// Create an empty cache keeping at most `message_limit` messages
    #[must_use]
    pub fn new(message_limit: usize) -> Self {
        Self {
            users: Store::new(),
            guilds: Store::new(),
            channels: Store::new(),
            messages: Store::bounded(message_limit),
            presences: Store::new(),
            current_user: RwLock::new(None),
        }
    }

    /// Create an empty cache behind an `Arc`
    #[must_use]
    pub fn shared(message_limit: usize) -> Arc<Self> {
        Arc::new(Self::new(message_limit))
    }

    /// ID of the client user, known after the first READY
    pub fn current_user_id(&self) -> Option<Snowflake> {
        *self.current_user.read()
    }

    /// Record the client user's ID
    pub fn set_current_user_id(&self, id: Snowflake) {
        *self.current_user.write() = Some(id);
    }

    /// The client user's cached entity
    pub fn current_user(&self) -> Option<EntityRef<User>> {
        self.current_user_id().and_then(|id| self.users.get(id))
    }

    /// Remove a guild together with its channels; returns the guild handle if it was cached
    ///
    /// Presences seen in other guilds stay cached.
    pub fn remove_guild(&self, guild_id: Snowflake) -> Option<EntityRef<Guild>> {
        let removed = self.guilds.delete(guild_id);
        let channels = self.channels.retain(|c| c.guild_id() != Some(guild_id));

        let orphaned: Vec<Snowflake> = self
            .presences
            .values()
            .into_iter()
            .filter_map(|handle| {
                let mut presence = handle.write();
                let user_id = presence.user_id;
                presence.forget_guild(guild_id).then_some(user_id)
            })
            .collect();
        let presences = orphaned
            .into_iter()
            .filter(|id| self.presences.delete(*id).is_some())
            .count();
        tracing::debug!(
            guild_id = %guild_id,
            channels_removed = channels,
            presences_removed = presences,
            "Removed guild from cache"
        );
        removed
    }

    /// Drop everything
    pub fn clear(&self) {
        self.users.clear();
        self.guilds.clear();
        self.channels.clear();
        self.messages.clear();
        self.presences.clear();
        *self.current_user.write() = None;
    }
}

impl Default for Cache {
    fn default() -> Self {
        Self::new(DEFAULT_MESSAGE_LIMIT)
    }
}
