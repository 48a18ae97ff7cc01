//! WebSocket close codes
//!
//! Close codes the gateway uses, and what a shard does after each one.

use serde::{Deserialize, Serialize};

/// Normal closure; the session is discarded
pub const NORMAL_CLOSE: u16 = 1000;

/// Gateway close codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum CloseCode {
    /// Unknown error; also sent by the client to drop a zombie connection
    UnknownError = 4000,
    /// Invalid opcode sent
    UnknownOpcode = 4001,
    /// Invalid payload sent
    DecodeError = 4002,
    /// Sent a payload before identifying
    NotAuthenticated = 4003,
    /// Invalid token
    AuthenticationFailed = 4004,
    /// Sent Identify twice
    AlreadyAuthenticated = 4005,
    /// Invalid sequence number for Resume
    InvalidSequence = 4007,
    /// Too many payloads
    RateLimited = 4008,
    /// Session timed out
    SessionTimedOut = 4009,
    /// Invalid shard in Identify
    InvalidShard = 4010,
    /// Too many guilds for one shard
    ShardingRequired = 4011,
    /// Invalid or outdated API version
    InvalidApiVersion = 4012,
    /// Invalid intents
    InvalidIntents = 4013,
    /// Intents the application may not use
    DisallowedIntents = 4014,
}

/// What a shard does after its connection closes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CloseAction {
    /// Reconnect and resume the session
    Resume,
    /// Reconnect with a fresh session
    Reidentify,
    /// Stop for good
    Fatal,
}

impl CloseCode {
    /// Create a `CloseCode` from a raw u16 value
    #[must_use]
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            4000 => Some(Self::UnknownError),
            4001 => Some(Self::UnknownOpcode),
            4002 => Some(Self::DecodeError),
            4003 => Some(Self::NotAuthenticated),
            4004 => Some(Self::AuthenticationFailed),
            4005 => Some(Self::AlreadyAuthenticated),
            4007 => Some(Self::InvalidSequence),
            4008 => Some(Self::RateLimited),
            4009 => Some(Self::SessionTimedOut),
            4010 => Some(Self::InvalidShard),
            4011 => Some(Self::ShardingRequired),
            4012 => Some(Self::InvalidApiVersion),
            4013 => Some(Self::InvalidIntents),
            4014 => Some(Self::DisallowedIntents),
            _ => None,
        }
    }

    /// Get the raw u16 value
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Check if this code forbids reconnecting
    #[must_use]
    pub const fn is_fatal(self) -> bool {
        matches!(
            self,
            Self::AuthenticationFailed
                | Self::InvalidShard
                | Self::ShardingRequired
                | Self::InvalidApiVersion
                | Self::InvalidIntents
                | Self::DisallowedIntents
        )
    }

    /// Get the description for this close code
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::UnknownError => "Unknown error occurred",
            Self::UnknownOpcode => "Invalid opcode sent",
            Self::DecodeError => "Invalid payload sent",
            Self::NotAuthenticated => "Not authenticated",
            Self::AuthenticationFailed => "Authentication failed",
            Self::AlreadyAuthenticated => "Already authenticated",
            Self::InvalidSequence => "Invalid sequence number",
            Self::RateLimited => "Rate limited",
            Self::SessionTimedOut => "Session timed out",
            Self::InvalidShard => "Invalid shard",
            Self::ShardingRequired => "Sharding required",
            Self::InvalidApiVersion => "Invalid API version",
            Self::InvalidIntents => "Invalid intents",
            Self::DisallowedIntents => "Disallowed intents",
        }
    }

    /// Get the name of this close code
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::UnknownError => "UnknownError",
            Self::UnknownOpcode => "UnknownOpcode",
            Self::DecodeError => "DecodeError",
            Self::NotAuthenticated => "NotAuthenticated",
            Self::AuthenticationFailed => "AuthenticationFailed",
            Self::AlreadyAuthenticated => "AlreadyAuthenticated",
            Self::InvalidSequence => "InvalidSequence",
            Self::RateLimited => "RateLimited",
            Self::SessionTimedOut => "SessionTimedOut",
            Self::InvalidShard => "InvalidShard",
            Self::ShardingRequired => "ShardingRequired",
            Self::InvalidApiVersion => "InvalidApiVersion",
            Self::InvalidIntents => "InvalidIntents",
            Self::DisallowedIntents => "DisallowedIntents",
        }
    }
}

impl CloseAction {
    /// Classify any raw close code, including ones outside the gateway range
    #[must_use]
    pub fn for_code(code: u16) -> Self {
        match CloseCode::from_u16(code) {
            Some(known) if known.is_fatal() => Self::Fatal,
            Some(CloseCode::InvalidSequence | CloseCode::SessionTimedOut) => Self::Reidentify,
            _ if code == NORMAL_CLOSE => Self::Reidentify,
            _ => Self::Resume,
        }
    }
}

impl std::fmt::Display for CloseCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}): {}", self.name(), self.as_u16(), self.description())
    }
}

impl From<CloseCode> for u16 {
    fn from(code: CloseCode) -> Self {
        code.as_u16()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_code_from_u16() {
        assert_eq!(CloseCode::from_u16(4000), Some(CloseCode::UnknownError));
        assert_eq!(CloseCode::from_u16(4014), Some(CloseCode::DisallowedIntents));
        assert_eq!(CloseCode::from_u16(1000), None);
        assert_eq!(CloseCode::from_u16(4006), None);
    }

    #[test]
    fn test_fatal_codes() {
        for code in [4004, 4010, 4011, 4012, 4013, 4014] {
            assert_eq!(CloseAction::for_code(code), CloseAction::Fatal, "code {code}");
        }
    }

    #[test]
    fn test_reidentify_codes() {
        for code in [4007, 4009, NORMAL_CLOSE] {
            assert_eq!(CloseAction::for_code(code), CloseAction::Reidentify, "code {code}");
        }
    }

    #[test]
    fn test_everything_else_resumes() {
        for code in [1001, 1006, 4000, 4001, 4002, 4003, 4005, 4008, 4999] {
            assert_eq!(CloseAction::for_code(code), CloseAction::Resume, "code {code}");
        }
    }

    #[test]
    fn test_close_code_display() {
        let display = format!("{}", CloseCode::AuthenticationFailed);
        assert!(display.contains("4004"));
        assert!(display.contains("Authentication"));
    }
}
