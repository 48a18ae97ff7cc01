//! Gateway operation codes
//!
//! Every frame exchanged with the gateway carries one of these in its `op` field.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Gateway operation codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpCode {
    /// An event was dispatched (receive)
    Dispatch = 0,
    /// Keep the connection alive (send/receive)
    Heartbeat = 1,
    /// Start a new session (send)
    Identify = 2,
    /// Update the client's presence (send)
    PresenceUpdate = 3,
    /// Resume a previous session (send)
    Resume = 6,
    /// The server asks for a reconnect and resume (receive)
    Reconnect = 7,
    /// Request members of a guild (send)
    RequestGuildMembers = 8,
    /// The session was invalidated (receive)
    InvalidSession = 9,
    /// First frame after connecting, carries the heartbeat interval (receive)
    Hello = 10,
    /// A heartbeat was acknowledged (receive)
    HeartbeatAck = 11,
}

impl OpCode {
    /// Create an `OpCode` from a raw integer value
    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Dispatch),
            1 => Some(Self::Heartbeat),
            2 => Some(Self::Identify),
            3 => Some(Self::PresenceUpdate),
            6 => Some(Self::Resume),
            7 => Some(Self::Reconnect),
            8 => Some(Self::RequestGuildMembers),
            9 => Some(Self::InvalidSession),
            10 => Some(Self::Hello),
            11 => Some(Self::HeartbeatAck),
            _ => None,
        }
    }

    /// Get the raw integer value
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Check if the client may send this op code
    #[must_use]
    pub const fn is_client_op(self) -> bool {
        matches!(
            self,
            Self::Heartbeat
                | Self::Identify
                | Self::PresenceUpdate
                | Self::Resume
                | Self::RequestGuildMembers
        )
    }

    /// Check if the server may send this op code
    #[must_use]
    pub const fn is_server_op(self) -> bool {
        matches!(
            self,
            Self::Dispatch
                | Self::Heartbeat
                | Self::Reconnect
                | Self::InvalidSession
                | Self::Hello
                | Self::HeartbeatAck
        )
    }

    /// Get the name of this op code
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Dispatch => "Dispatch",
            Self::Heartbeat => "Heartbeat",
            Self::Identify => "Identify",
            Self::PresenceUpdate => "PresenceUpdate",
            Self::Resume => "Resume",
            Self::Reconnect => "Reconnect",
            Self::RequestGuildMembers => "RequestGuildMembers",
            Self::InvalidSession => "InvalidSession",
            Self::Hello => "Hello",
            Self::HeartbeatAck => "HeartbeatAck",
        }
    }
}

impl Serialize for OpCode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u8(self.as_u8())
    }
}

impl<'de> Deserialize<'de> for OpCode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = u8::deserialize(deserializer)?;
        Self::from_u8(value).ok_or_else(|| serde::de::Error::custom(format!("invalid op code: {value}")))
    }
}

impl std::fmt::Display for OpCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name(), self.as_u8())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcode_from_u8() {
        assert_eq!(OpCode::from_u8(0), Some(OpCode::Dispatch));
        assert_eq!(OpCode::from_u8(6), Some(OpCode::Resume));
        assert_eq!(OpCode::from_u8(7), Some(OpCode::Reconnect));
        assert_eq!(OpCode::from_u8(8), Some(OpCode::RequestGuildMembers));
        assert_eq!(OpCode::from_u8(9), Some(OpCode::InvalidSession));
        assert_eq!(OpCode::from_u8(11), Some(OpCode::HeartbeatAck));
        // Voice ops are not spoken here
        assert_eq!(OpCode::from_u8(4), None);
        assert_eq!(OpCode::from_u8(5), None);
        assert_eq!(OpCode::from_u8(255), None);
    }

    #[test]
    fn test_op_direction() {
        assert!(OpCode::Identify.is_client_op());
        assert!(OpCode::RequestGuildMembers.is_client_op());
        assert!(!OpCode::Hello.is_client_op());

        assert!(OpCode::InvalidSession.is_server_op());
        assert!(!OpCode::Resume.is_server_op());

        // Heartbeats flow both ways
        assert!(OpCode::Heartbeat.is_client_op());
        assert!(OpCode::Heartbeat.is_server_op());
    }

    #[test]
    fn test_opcode_serialization() {
        assert_eq!(serde_json::to_string(&OpCode::Hello).unwrap(), "10");
        assert_eq!(serde_json::from_str::<OpCode>("6").unwrap(), OpCode::Resume);
        assert!(serde_json::from_str::<OpCode>("5").is_err());
    }

    #[test]
    fn test_opcode_display() {
        assert_eq!(format!("{}", OpCode::Hello), "Hello (10)");
        assert_eq!(format!("{}", OpCode::InvalidSession), "InvalidSession (9)");
    }
}
