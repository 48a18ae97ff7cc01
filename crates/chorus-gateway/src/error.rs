//! Gateway error types

use chorus_common::FaultKind;
use thiserror::Error;

use crate::protocol::{CloseCode, OpCode};

/// Gateway manager errors
///
/// Recoverable connection problems never surface here; shards handle them and report
/// them as lifecycle events.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// A shard was closed with a code that forbids reconnecting
    #[error("Shard {shard_id} closed fatally with code {code}")]
    Fatal { shard_id: u32, code: u16 },

    /// The shard id is not owned by this manager
    #[error("Shard {shard_id} is out of range (shard count {shard_count})")]
    ShardOutOfRange { shard_id: u32, shard_count: u32 },

    /// The shard task has ended
    #[error("Shard {0} is closed")]
    ShardClosed(u32),

    /// Only client ops may be sent
    #[error("Op {0} can not be sent by a client")]
    NotSendable(OpCode),

    #[error("Shard count must be at least 1")]
    InvalidShardCount,

    #[error("Gateway manager is already started")]
    AlreadyStarted,

    #[error("Gateway manager is shutting down")]
    ShuttingDown,
}

impl GatewayError {
    /// Fault classification
    #[must_use]
    pub fn kind(&self) -> FaultKind {
        match self {
            Self::Fatal { .. } => FaultKind::FatalGateway,
            Self::ShardOutOfRange { .. }
            | Self::NotSendable(_)
            | Self::InvalidShardCount
            | Self::AlreadyStarted => {
                FaultKind::InvalidArgument
            }
            Self::ShardClosed(_) | Self::ShuttingDown => FaultKind::Shutdown,
        }
    }

    /// The known gateway close code behind a fatal error
    #[must_use]
    pub fn close_code(&self) -> Option<CloseCode> {
        match self {
            Self::Fatal { code, .. } => CloseCode::from_u16(*code),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        let fatal = GatewayError::Fatal { shard_id: 1, code: 4004 };
        assert_eq!(fatal.kind(), FaultKind::FatalGateway);
        assert_eq!(fatal.close_code(), Some(CloseCode::AuthenticationFailed));
        assert!(fatal.is_fatal());

        let range = GatewayError::ShardOutOfRange { shard_id: 4, shard_count: 4 };
        assert_eq!(range.kind(), FaultKind::InvalidArgument);
        assert!(range.to_string().contains("shard count 4"));

        assert_eq!(GatewayError::ShardClosed(0).kind(), FaultKind::Shutdown);
        assert!(!GatewayError::ShardClosed(0).kind().is_retryable());
    }
}
