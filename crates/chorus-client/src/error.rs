//! Client error types
//!
//! Wraps the errors of every layer the facade drives.

use chorus_common::{ConfigError, FaultKind};
use chorus_core::{ModelError, Snowflake};
use chorus_gateway::GatewayError;
use chorus_rest::RestError;
use thiserror::Error;

/// Client facade errors
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Rest(#[from] RestError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Model(#[from] ModelError),

    /// The caller passed an unusable argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A text operation was used on a channel that carries no messages
    #[error("Channel {0} is not text-based")]
    NotTextBased(Snowflake),
}

/// Result type alias for client operations
pub type ClientResult<T> = Result<T, ClientError>;

impl ClientError {
    /// Create an invalid argument error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Fault classification
    #[must_use]
    pub fn kind(&self) -> FaultKind {
        match self {
            Self::Config(e) => e.kind(),
            Self::Rest(e) => e.kind(),
            Self::Gateway(e) => e.kind(),
            Self::Model(_) => FaultKind::UnknownField,
            Self::InvalidArgument(_) | Self::NotTextBased(_) => FaultKind::InvalidArgument,
        }
    }

    /// Check if the operation may succeed when repeated
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}
