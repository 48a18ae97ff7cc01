//! # chorus-common
//!
//! Shared utilities including configuration, the fault taxonomy, retry backoff, and telemetry.

pub mod backoff;
pub mod config;
pub mod error;
pub mod telemetry;

// Re-export commonly used types at crate root
pub use backoff::Backoff;
pub use config::{
    CacheConfig, ClientConfig, ConfigError, GatewayConfig, PresenceConfig, RestConfig,
};
pub use error::FaultKind;
pub use telemetry::{
    try_init_tracing, try_init_tracing_with_config, LogFormat, TracingConfig, TracingError,
};
