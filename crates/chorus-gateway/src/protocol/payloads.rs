//! Payload definitions
//!
//! The `d` field of the frames this client sends, plus the few it reads itself.

use chorus_core::{Activity, ClientPresence, Snowflake, Status};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Payload for op 10 (Hello)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelloPayload {
    /// Heartbeat interval in milliseconds
    pub heartbeat_interval: u64,
}

/// Payload for op 2 (Identify)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentifyPayload {
    pub token: String,
    pub properties: IdentifyProperties,
    /// `[shard_id, shard_count]`
    pub shard: [u32; 2],
    pub intents: u64,
    pub large_threshold: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence: Option<PresenceUpdatePayload>,
}

/// Connection properties announced in Identify
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifyProperties {
    /// Operating system
    pub os: String,
    /// Library name
    pub browser: String,
    /// Library name
    pub device: String,
}

impl IdentifyProperties {
    /// Properties describing this library on the current OS
    #[must_use]
    pub fn new() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            browser: env!("CARGO_PKG_NAME").to_string(),
            device: env!("CARGO_PKG_NAME").to_string(),
        }
    }
}

impl Default for IdentifyProperties {
    fn default() -> Self {
        Self::new()
    }
}

/// Payload for op 3 (Presence Update), also embedded in Identify
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceUpdatePayload {
    /// Unix time (milliseconds) since the client went idle
    pub since: Option<i64>,
    pub activities: Vec<Activity>,
    pub status: Status,
    pub afk: bool,
}

impl From<&ClientPresence> for PresenceUpdatePayload {
    fn from(presence: &ClientPresence) -> Self {
        Self {
            since: presence.since,
            activities: presence.activity.iter().cloned().collect(),
            status: presence.status,
            afk: presence.afk,
        }
    }
}

/// Payload for op 6 (Resume)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResumePayload {
    pub token: String,
    pub session_id: String,
    /// Last sequence number received
    pub seq: Option<u64>,
}

/// Payload for op 8 (Request Guild Members)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestGuildMembersPayload {
    pub guild_id: Snowflake,
    /// Username prefix; empty string requests everyone
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    /// Maximum members to send, 0 for no limit
    pub limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presences: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_ids: Option<Vec<Snowflake>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
}

impl RequestGuildMembersPayload {
    /// Request every member of a guild
    #[must_use]
    pub fn all(guild_id: Snowflake) -> Self {
        Self {
            guild_id,
            query: Some(String::new()),
            limit: 0,
            presences: None,
            user_ids: None,
            nonce: None,
        }
    }

    /// Request specific members of a guild
    #[must_use]
    pub fn users(guild_id: Snowflake, user_ids: Vec<Snowflake>) -> Self {
        Self {
            guild_id,
            query: None,
            limit: 0,
            presences: None,
            user_ids: Some(user_ids),
            nonce: None,
        }
    }

    #[must_use]
    pub fn with_presences(mut self, presences: bool) -> Self {
        self.presences = Some(presences);
        self
    }

    #[must_use]
    pub fn with_nonce(mut self, nonce: impl Into<String>) -> Self {
        self.nonce = Some(nonce.into());
        self
    }
}

/// The parts of the READY dispatch the session needs
#[derive(Debug, Clone, Deserialize)]
pub struct ReadyPayload {
    pub session_id: String,
    #[serde(default)]
    pub resume_gateway_url: Option<String>,
    /// The client user, left raw for the entity factory
    #[serde(default)]
    pub user: Value,
}
