//! Client context - state shared by the dispatcher, the gateway, and the facade
//!
//! Passed explicitly instead of living in globals.

use std::sync::Arc;

use chorus_common::ClientConfig;
use chorus_core::{Cache, ClientPresence};
use parking_lot::RwLock;

/// Client context containing the configuration, the entity cache, and the client's presence
#[derive(Clone)]
pub struct ClientContext {
    config: Arc<ClientConfig>,
    cache: Arc<Cache>,
    presence: Arc<RwLock<ClientPresence>>,
}

impl ClientContext {
    /// Create a context; the presence starts from the configured one
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        let presence = ClientPresence {
            afk: config.presence.afk,
            since: None,
            status: config.presence.status,
            activity: config.presence.activity.clone(),
        };

        Self {
            cache: Cache::shared(config.cache.message_limit),
            presence: Arc::new(RwLock::new(presence)),
            config: Arc::new(config),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    #[must_use]
    pub fn cache(&self) -> &Arc<Cache> {
        &self.cache
    }

    /// Shared presence every shard identifies with
    #[must_use]
    pub fn presence(&self) -> &Arc<RwLock<ClientPresence>> {
        &self.presence
    }

    /// Copy of the current presence
    #[must_use]
    pub fn presence_snapshot(&self) -> ClientPresence {
        self.presence.read().clone()
    }
}

impl std::fmt::Debug for ClientContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientContext")
            .field("presence", &*self.presence.read())
            .finish_non_exhaustive()
    }
}
