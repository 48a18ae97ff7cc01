//! Model errors - failures while turning raw payloads into entities

use thiserror::Error;

/// Model layer errors
#[derive(Debug, Error)]
pub enum ModelError {
    // =========================================================================
    // Payload Shape Errors
    // =========================================================================
    #[error("Expected a JSON object for {kind}")]
    NotAnObject { kind: &'static str },

    #[error("Missing required field `{field}` in {kind} payload")]
    MissingField {
        kind: &'static str,
        field: &'static str,
    },

    #[error("Invalid value for field `{field}` in {kind} payload: {source}")]
    InvalidField {
        kind: &'static str,
        field: &'static str,
        #[source]
        source: serde_json::Error,
    },

    // =========================================================================
    // Variant Errors
    // =========================================================================
    #[error("Unknown channel type: {0}")]
    UnknownChannelType(u64),
}

impl ModelError {
    /// Get an error code string for logs and metrics
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotAnObject { .. } => "NOT_AN_OBJECT",
            Self::MissingField { .. } => "MISSING_FIELD",
            Self::InvalidField { .. } => "INVALID_FIELD",
            Self::UnknownChannelType(_) => "UNKNOWN_CHANNEL_TYPE",
        }
    }

    /// Name of the offending field, if the error concerns one
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::MissingField { field, .. } | Self::InvalidField { field, .. } => Some(field),
            Self::NotAnObject { .. } | Self::UnknownChannelType(_) => None,
        }
    }
}
