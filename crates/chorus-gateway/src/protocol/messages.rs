//! Gateway message format
//!
//! Every frame, in either direction, is one `GatewayMessage` encoded as JSON.

use super::{
    HelloPayload, IdentifyPayload, OpCode, PresenceUpdatePayload, ReadyPayload,
    RequestGuildMembersPayload, ResumePayload,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Gateway message format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayMessage {
    /// Operation code
    pub op: OpCode,

    /// Event data payload
    #[serde(default)]
    pub d: Value,

    /// Sequence number (dispatches only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s: Option<u64>,

    /// Event name (dispatches only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t: Option<String>,
}

impl GatewayMessage {
    fn with_data(op: OpCode, d: Value) -> Self {
        Self { op, d, s: None, t: None }
    }

    // === Client Messages ===

    /// Create a Heartbeat message (op=1) carrying the last sequence seen
    #[must_use]
    pub fn heartbeat(last_sequence: Option<u64>) -> Self {
        Self::with_data(
            OpCode::Heartbeat,
            last_sequence.map_or(Value::Null, |s| Value::Number(s.into())),
        )
    }

    /// Create an Identify message (op=2)
    #[must_use]
    pub fn identify(payload: &IdentifyPayload) -> Self {
        Self::with_data(OpCode::Identify, serde_json::to_value(payload).unwrap_or_default())
    }

    /// Create a Presence Update message (op=3)
    #[must_use]
    pub fn presence_update(payload: &PresenceUpdatePayload) -> Self {
        Self::with_data(OpCode::PresenceUpdate, serde_json::to_value(payload).unwrap_or_default())
    }

    /// Create a Resume message (op=6)
    #[must_use]
    pub fn resume(payload: &ResumePayload) -> Self {
        Self::with_data(OpCode::Resume, serde_json::to_value(payload).unwrap_or_default())
    }

    /// Create a Request Guild Members message (op=8)
    #[must_use]
    pub fn request_guild_members(payload: &RequestGuildMembersPayload) -> Self {
        Self::with_data(
            OpCode::RequestGuildMembers,
            serde_json::to_value(payload).unwrap_or_default(),
        )
    }

    // === Server Messages ===

    /// Create a Dispatch message (op=0)
    #[must_use]
    pub fn dispatch(event_type: impl Into<String>, sequence: u64, data: Value) -> Self {
        Self {
            op: OpCode::Dispatch,
            d: data,
            s: Some(sequence),
            t: Some(event_type.into()),
        }
    }

    /// Create a Hello message (op=10)
    #[must_use]
    pub fn hello(heartbeat_interval: u64) -> Self {
        Self::with_data(OpCode::Hello, serde_json::json!({ "heartbeat_interval": heartbeat_interval }))
    }

    /// Create a Heartbeat ACK message (op=11)
    #[must_use]
    pub fn heartbeat_ack() -> Self {
        Self::with_data(OpCode::HeartbeatAck, Value::Null)
    }

    /// Create a Reconnect message (op=7)
    #[must_use]
    pub fn reconnect() -> Self {
        Self::with_data(OpCode::Reconnect, Value::Null)
    }

    /// Create an Invalid Session message (op=9)
    #[must_use]
    pub fn invalid_session(resumable: bool) -> Self {
        Self::with_data(OpCode::InvalidSession, Value::Bool(resumable))
    }

    // === Parsing ===

    /// Try to parse as a Hello payload (op=10)
    pub fn as_hello(&self) -> Option<HelloPayload> {
        if self.op != OpCode::Hello {
            return None;
        }
        serde_json::from_value(self.d.clone()).ok()
    }

    /// Whether an Invalid Session (op=9) allows resuming; a missing flag means no
    pub fn as_invalid_session(&self) -> Option<bool> {
        if self.op != OpCode::InvalidSession {
            return None;
        }
        Some(self.d.as_bool().unwrap_or(false))
    }

    /// Try to parse a READY dispatch
    pub fn as_ready(&self) -> Option<ReadyPayload> {
        if self.op != OpCode::Dispatch || self.t.as_deref() != Some("READY") {
            return None;
        }
        serde_json::from_value(self.d.clone()).ok()
    }

    /// Try to parse an Identify payload (op=2)
    pub fn as_identify(&self) -> Option<IdentifyPayload> {
        if self.op != OpCode::Identify {
            return None;
        }
        serde_json::from_value(self.d.clone()).ok()
    }

    /// Try to parse a Resume payload (op=6)
    pub fn as_resume(&self) -> Option<ResumePayload> {
        if self.op != OpCode::Resume {
            return None;
        }
        serde_json::from_value(self.d.clone()).ok()
    }

    /// Try to parse a Presence Update payload (op=3)
    pub fn as_presence_update(&self) -> Option<PresenceUpdatePayload> {
        if self.op != OpCode::PresenceUpdate {
            return None;
        }
        serde_json::from_value(self.d.clone()).ok()
    }

    // === Utilities ===

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl std::fmt::Display for GatewayMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(t) = &self.t {
            write!(f, "GatewayMessage(op={}, t={}", self.op, t)?;
            if let Some(s) = self.s {
                write!(f, ", s={s}")?;
            }
            write!(f, ")")
        } else {
            write!(f, "GatewayMessage(op={})", self.op)
        }
    }
}
