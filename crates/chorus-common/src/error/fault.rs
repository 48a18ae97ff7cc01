//! Fault taxonomy shared by every layer

use std::fmt;

/// Classification of a failure, independent of the layer that raised it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultKind {
    /// Connection dropped, timed out, or the server answered 5xx
    TransientNetwork,
    /// The platform asked us to slow down
    RateLimit,
    /// The platform rejected the request; repeating it will not help
    PermanentRequest,
    /// The gateway session can no longer be resumed
    SessionInvalid,
    /// The gateway closed with a code that forbids reconnecting
    FatalGateway,
    /// A required field in a payload was missing or malformed
    UnknownField,
    /// Local configuration is missing or invalid
    Configuration,
    /// The caller passed an unusable argument
    InvalidArgument,
    /// The client is shutting down
    Shutdown,
}

impl FaultKind {
    /// Check if the operation may succeed when repeated
    #[must_use]
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            Self::TransientNetwork | Self::RateLimit | Self::SessionInvalid
        )
    }

    /// Get a code string for logs
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::TransientNetwork => "TRANSIENT_NETWORK",
            Self::RateLimit => "RATE_LIMIT",
            Self::PermanentRequest => "PERMANENT_REQUEST",
            Self::SessionInvalid => "SESSION_INVALID",
            Self::FatalGateway => "FATAL_GATEWAY",
            Self::UnknownField => "UNKNOWN_FIELD",
            Self::Configuration => "CONFIGURATION",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::Shutdown => "SHUTDOWN",
        }
    }
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
