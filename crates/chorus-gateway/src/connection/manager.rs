//! Gateway manager
//!
//! Owns every shard of one client using DashMap for concurrent access, fans packets out
//! to them, and merges their events into one stream.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use chorus_common::GatewayConfig;
use chorus_core::{Cache, ClientPresence, Snowflake};
use dashmap::DashMap;
use futures_util::stream::{FuturesUnordered, StreamExt};
use parking_lot::RwLock;
use tokio::sync::mpsc;

use super::identify_queue::IdentifyQueue;
use super::shard::{Shard, ShardCommand, ShardConfig, ShardHandle, ShardShared};
use super::state::ShardState;
use crate::error::GatewayError;
use crate::events::{EventHub, EventStream};
use crate::protocol::{
    GatewayMessage, PresenceUpdatePayload, RequestGuildMembersPayload, NORMAL_CLOSE,
};
use crate::transport::Connector;

/// Manages the shards of one client
pub struct GatewayManager {
    config: GatewayConfig,
    token: String,
    connector: Arc<dyn Connector>,
    cache: Arc<Cache>,
    presence: Arc<RwLock<ClientPresence>>,

    /// Running shards by shard id
    shards: DashMap<u32, ShardHandle>,
    shard_count: AtomicU32,
    events: EventHub,
    started: AtomicBool,
    closed: AtomicBool,
}

impl GatewayManager {
    /// Create a manager; nothing connects until `start`
    #[must_use]
    pub fn new(
        config: GatewayConfig,
        token: impl Into<String>,
        connector: Arc<dyn Connector>,
        cache: Arc<Cache>,
        presence: Arc<RwLock<ClientPresence>>,
    ) -> Self {
        Self {
            config,
            token: token.into(),
            connector,
            cache,
            presence,
            shards: DashMap::new(),
            shard_count: AtomicU32::new(0),
            events: EventHub::new(),
            started: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        }
    }

    /// Spawn `shard_count` shards and wait until each is connected
    ///
    /// Identifies go through one shared queue, so they are spaced at least
    /// `identify_interval` apart. A shard that closes fatally fails the start; the
    /// other shards keep running.
    pub async fn start(&self, shard_count: u32) -> Result<(), GatewayError> {
        if shard_count == 0 {
            return Err(GatewayError::InvalidShardCount);
        }
        if self.closed.load(Ordering::Acquire) {
            return Err(GatewayError::ShuttingDown);
        }
        if self.started.swap(true, Ordering::AcqRel) {
            return Err(GatewayError::AlreadyStarted);
        }

        self.shard_count.store(shard_count, Ordering::Release);
        let shared = Arc::new(ShardShared {
            config: ShardConfig::new(&self.config, self.token.clone(), shard_count),
            connector: Arc::clone(&self.connector),
            cache: Arc::clone(&self.cache),
            presence: Arc::clone(&self.presence),
            identify_queue: IdentifyQueue::new(self.config.identify_interval()),
            events: self.events.clone(),
        });

        tracing::info!(
            shard_count = shard_count,
            identify_interval_ms = self.config.identify_interval_ms,
            "Starting gateway shards"
        );

        let mut pending = FuturesUnordered::new();
        for shard_id in 0..shard_count {
            let handle = Shard::spawn(shard_id, Arc::clone(&shared));
            let mut state = handle.state.clone();
            self.shards.insert(shard_id, handle);

            pending.push(async move {
                let settled = state
                    .wait_for(|state| state.is_connected() || state.is_closed())
                    .await
                    .map(|state| *state);
                (shard_id, settled)
            });
        }

        while let Some((shard_id, settled)) = pending.next().await {
            match settled {
                Ok(ShardState::Closed(NORMAL_CLOSE)) => return Err(GatewayError::ShuttingDown),
                Ok(ShardState::Closed(code)) => {
                    return Err(GatewayError::Fatal { shard_id, code });
                }
                Ok(_) => tracing::debug!(shard_id = shard_id, "Shard connected"),
                Err(_) => return Err(GatewayError::ShardClosed(shard_id)),
            }
        }

        tracing::info!(shard_count = shard_count, "All shards connected");
        Ok(())
    }

    /// Queue a packet on every live shard; returns how many accepted it
    pub async fn broadcast(&self, message: GatewayMessage) -> usize {
        if !message.op.is_client_op() {
            tracing::warn!(op = %message.op, "Refusing to broadcast a server op");
            return 0;
        }
        let mut delivered = 0;
        for (shard_id, commands) in self.senders() {
            if commands.send(ShardCommand::Send(message.clone())).await.is_ok() {
                delivered += 1;
            } else {
                tracing::debug!(shard_id = shard_id, op = %message.op, "Shard is gone, packet dropped");
            }
        }
        delivered
    }

    /// Queue a packet on one shard
    pub async fn send(&self, shard_id: u32, message: GatewayMessage) -> Result<(), GatewayError> {
        if !message.op.is_client_op() {
            return Err(GatewayError::NotSendable(message.op));
        }
        self.check_shard(shard_id)?;

        let commands = self
            .shards
            .get(&shard_id)
            .map(|handle| handle.commands.clone())
            .ok_or(GatewayError::ShardClosed(shard_id))?;

        commands
            .send(ShardCommand::Send(message))
            .await
            .map_err(|_| GatewayError::ShardClosed(shard_id))
    }

    /// Fail unless `shard_id` names a shard of a running manager
    pub fn check_shard(&self, shard_id: u32) -> Result<(), GatewayError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(GatewayError::ShuttingDown);
        }
        let shard_count = self.shard_count();
        if shard_id >= shard_count {
            return Err(GatewayError::ShardOutOfRange {
                shard_id,
                shard_count,
            });
        }
        Ok(())
    }

    /// Shard that receives a guild's events: `guild_id % shard_count`
    #[must_use]
    pub fn shard_for(&self, guild_id: Snowflake) -> u32 {
        guild_id.shard_for(self.shard_count())
    }

    /// Ask the shard owning the guild for its member list
    pub async fn request_guild_members(
        &self,
        payload: &RequestGuildMembersPayload,
    ) -> Result<(), GatewayError> {
        let shard_id = self.shard_for(payload.guild_id);
        tracing::debug!(guild_id = %payload.guild_id, shard_id = shard_id, "Requesting guild members");
        self.send(shard_id, GatewayMessage::request_guild_members(payload))
            .await
    }

    /// Send a status update to one shard, or to every shard when `shard_id` is `None`
    ///
    /// Returns the number of shards that queued the packet.
    pub async fn update_presence(
        &self,
        presence: &PresenceUpdatePayload,
        shard_id: Option<u32>,
    ) -> Result<usize, GatewayError> {
        let message = GatewayMessage::presence_update(presence);
        match shard_id {
            Some(shard_id) => self.send(shard_id, message).await.map(|()| 1),
            None => {
                if self.closed.load(Ordering::Acquire) {
                    return Err(GatewayError::ShuttingDown);
                }
                Ok(self.broadcast(message).await)
            }
        }
    }

    /// Current state of a shard
    #[must_use]
    pub fn shard_state(&self, shard_id: u32) -> Option<ShardState> {
        self.shards.get(&shard_id).map(|handle| *handle.state.borrow())
    }

    /// Number of shards this manager owns, 0 before `start`
    #[must_use]
    pub fn shard_count(&self) -> u32 {
        self.shard_count.load(Ordering::Acquire)
    }

    /// Subscribe to events from every shard
    ///
    /// Nothing is dropped for a slow subscriber; the stream ends after `shutdown`.
    #[must_use]
    pub fn events(&self) -> EventStream {
        self.events.subscribe()
    }

    /// Close every shard with code 1000 and wait for their tasks
    pub async fn shutdown(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        tracing::info!(shard_count = self.shard_count(), "Shutting down gateway");

        for (_, commands) in self.senders() {
            let _ = commands.send(ShardCommand::Shutdown).await;
        }

        let ids: Vec<u32> = self.shards.iter().map(|entry| *entry.key()).collect();
        for shard_id in ids {
            let Some((_, handle)) = self.shards.remove(&shard_id) else {
                continue;
            };
            if let Err(e) = handle.task.await {
                tracing::error!(shard_id = shard_id, error = %e, "Shard task failed");
            }
        }
        self.events.close();

        tracing::info!("Gateway shut down");
    }

    /// Command senders by shard id, in shard order
    fn senders(&self) -> Vec<(u32, mpsc::Sender<ShardCommand>)> {
        let mut senders: Vec<_> = self
            .shards
            .iter()
            .map(|entry| (*entry.key(), entry.commands.clone()))
            .collect();
        senders.sort_unstable_by_key(|(shard_id, _)| *shard_id);
        senders
    }
}

impl Drop for GatewayManager {
    fn drop(&mut self) {
        for entry in &self.shards {
            entry.task.abort();
        }
    }
}
