//! REST error types

use std::fmt;
use std::time::Duration;

use chorus_common::FaultKind;
use chorus_core::ModelError;
use serde::Deserialize;

use crate::transport::TransportError;

/// Error body returned by the platform for rejected requests
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ApiErrorBody {
    /// Platform error code (e.g. 50001 Missing Access)
    #[serde(default)]
    pub code: Option<u64>,
    #[serde(default)]
    pub message: String,
    /// Per-field validation errors, when present
    #[serde(default)]
    pub errors: Option<serde_json::Value>,
}

impl ApiErrorBody {
    /// Decode a response body, falling back to the raw text
    #[must_use]
    pub fn parse(body: &[u8]) -> Self {
        serde_json::from_slice(body).unwrap_or_else(|_| Self {
            message: String::from_utf8_lossy(body).into_owned(),
            ..Self::default()
        })
    }
}

impl fmt::Display for ApiErrorBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "{} (code {code})", self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// REST dispatcher errors
///
/// Every variant produced by a network round trip carries the number of attempts made.
#[derive(Debug, thiserror::Error)]
pub enum RestError {
    #[error("Rate limited on {route} after {attempts} attempts (retry after {retry_after:?})")]
    RateLimited {
        route: String,
        retry_after: Duration,
        global: bool,
        attempts: u32,
    },

    #[error("Request to {route} rejected with status {status}: {body}")]
    Permanent {
        route: String,
        status: u16,
        body: ApiErrorBody,
        attempts: u32,
    },

    #[error("Server error {status} on {route} after {attempts} attempts")]
    Server {
        route: String,
        status: u16,
        attempts: u32,
    },

    #[error("Transport failure on {route} after {attempts} attempts: {source}")]
    Transport {
        route: String,
        #[source]
        source: TransportError,
        attempts: u32,
    },

    #[error("Failed to decode response from {route}: {source}")]
    Decode {
        route: String,
        #[source]
        source: serde_json::Error,
        attempts: u32,
    },

    #[error("Expected {expected} in response from {route}")]
    UnexpectedShape {
        route: String,
        expected: &'static str,
    },

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("REST dispatcher is shutting down")]
    ShuttingDown,
}

impl RestError {
    /// Fault classification
    #[must_use]
    pub fn kind(&self) -> FaultKind {
        match self {
            Self::RateLimited { .. } => FaultKind::RateLimit,
            Self::Permanent { .. } => FaultKind::PermanentRequest,
            Self::Server { .. } | Self::Transport { .. } => FaultKind::TransientNetwork,
            Self::Decode { .. } | Self::UnexpectedShape { .. } | Self::Model(_) => {
                FaultKind::UnknownField
            }
            Self::InvalidRequest(_) => FaultKind::InvalidArgument,
            Self::ShuttingDown => FaultKind::Shutdown,
        }
    }

    /// Number of HTTP attempts made before this error surfaced
    #[must_use]
    pub fn attempts(&self) -> u32 {
        match self {
            Self::RateLimited { attempts, .. }
            | Self::Permanent { attempts, .. }
            | Self::Server { attempts, .. }
            | Self::Transport { attempts, .. }
            | Self::Decode { attempts, .. } => *attempts,
            Self::UnexpectedShape { .. } => 1,
            Self::Model(_) | Self::InvalidRequest(_) | Self::ShuttingDown => 0,
        }
    }

    /// HTTP status code, if the platform answered
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RateLimited { .. } => Some(429),
            Self::Permanent { status, .. } | Self::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Check if this is a 404
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}
