//! Configuration structs

mod client_config;

pub use client_config::{
    with_gateway_query, CacheConfig, ClientConfig, ConfigError, GatewayConfig, PresenceConfig,
    RestConfig,
};
