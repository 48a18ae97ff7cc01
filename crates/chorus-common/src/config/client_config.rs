//! Client configuration structs
//!
//! Loads configuration from `CHORUS_*` environment variables (and a `.env` file if present).

use chorus_core::{Activity, Status};
use std::collections::HashMap;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Main client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Bot token, sent as `Authorization: Bot {token}` and in IDENTIFY
    pub token: String,
    pub rest: RestConfig,
    pub gateway: GatewayConfig,
    pub presence: PresenceConfig,
    pub cache: CacheConfig,
}

/// REST dispatcher configuration
#[derive(Debug, Clone)]
pub struct RestConfig {
    pub api_url: String,
    pub user_agent: String,
    pub request_timeout_secs: u64,
    /// Retries after a 429 before giving up
    pub max_rate_limit_retries: u32,
    /// Retries after a 5xx or transport failure before giving up
    pub max_server_retries: u32,
    pub retry_base_delay_ms: u64,
    pub retry_max_delay_ms: u64,
    /// Route name → HTTP verb (uppercase)
    pub method_overrides: HashMap<String, String>,
}

/// Gateway configuration
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub url: String,
    pub version: u8,
    pub shard_count: u32,
    pub intents: u64,
    pub large_threshold: u32,
    /// Minimum spacing between two IDENTIFY packets across all shards
    pub identify_interval_ms: u64,
    /// Consecutive unacknowledged heartbeats before the connection counts as a zombie
    pub max_missed_acks: u32,
    /// How long after the last heartbeat ack a dropped session may still be resumed
    pub resume_window_secs: u64,
    pub reconnect_base_delay_ms: u64,
    pub reconnect_max_delay_ms: u64,
    pub connect_timeout_secs: u64,
    /// Capacity of each shard's command channel
    pub command_buffer: usize,
}

/// Presence announced on IDENTIFY
#[derive(Debug, Clone, Default)]
pub struct PresenceConfig {
    pub status: Status,
    pub afk: bool,
    pub activity: Option<Activity>,
}

/// Entity cache configuration
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub message_limit: usize,
}

// Default value functions
fn default_api_url() -> String {
    "https://discord.com/api/v10".to_string()
}

fn default_user_agent() -> String {
    concat!("DiscordBot (chorus, ", env!("CARGO_PKG_VERSION"), ")").to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_max_rate_limit_retries() -> u32 {
    3
}

fn default_max_server_retries() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    500
}

fn default_retry_max_delay_ms() -> u64 {
    30_000
}

fn default_gateway_url() -> String {
    "wss://gateway.discord.gg".to_string()
}

fn default_gateway_version() -> u8 {
    10
}

fn default_shard_count() -> u32 {
    1
}

fn default_intents() -> u64 {
    // GUILDS | GUILD_MESSAGES | DIRECT_MESSAGES
    (1 << 0) | (1 << 9) | (1 << 12)
}

fn default_large_threshold() -> u32 {
    250
}

fn default_identify_interval_ms() -> u64 {
    5_000
}

fn default_max_missed_acks() -> u32 {
    2
}

fn default_resume_window_secs() -> u64 {
    180
}

fn default_reconnect_base_delay_ms() -> u64 {
    1_000
}

fn default_reconnect_max_delay_ms() -> u64 {
    60_000
}

fn default_connect_timeout_secs() -> u64 {
    30
}

fn default_command_buffer() -> usize {
    256
}

fn default_message_limit() -> usize {
    chorus_core::DEFAULT_MESSAGE_LIMIT
}

impl Default for RestConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            user_agent: default_user_agent(),
            request_timeout_secs: default_request_timeout_secs(),
            max_rate_limit_retries: default_max_rate_limit_retries(),
            max_server_retries: default_max_server_retries(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
            method_overrides: HashMap::new(),
        }
    }
}

impl RestConfig {
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            url: default_gateway_url(),
            version: default_gateway_version(),
            shard_count: default_shard_count(),
            intents: default_intents(),
            large_threshold: default_large_threshold(),
            identify_interval_ms: default_identify_interval_ms(),
            max_missed_acks: default_max_missed_acks(),
            resume_window_secs: default_resume_window_secs(),
            reconnect_base_delay_ms: default_reconnect_base_delay_ms(),
            reconnect_max_delay_ms: default_reconnect_max_delay_ms(),
            connect_timeout_secs: default_connect_timeout_secs(),
            command_buffer: default_command_buffer(),
        }
    }
}

impl GatewayConfig {
    /// Gateway URL with version and encoding query parameters
    #[must_use]
    pub fn connect_url(&self) -> String {
        with_gateway_query(&self.url, self.version)
    }

    #[must_use]
    pub fn identify_interval(&self) -> Duration {
        Duration::from_millis(self.identify_interval_ms)
    }

    #[must_use]
    pub fn resume_window(&self) -> Duration {
        Duration::from_secs(self.resume_window_secs)
    }

    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// Append `?v={version}&encoding=json` unless the URL already carries a query
#[must_use]
pub fn with_gateway_query(url: &str, version: u8) -> String {
    if url.contains('?') {
        url.to_string()
    } else {
        format!("{}/?v={version}&encoding=json", url.trim_end_matches('/'))
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            message_limit: default_message_limit(),
        }
    }
}

impl ClientConfig {
    /// Configuration with defaults for everything but the token
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            rest: RestConfig::default(),
            gateway: GatewayConfig::default(),
            presence: PresenceConfig::default(),
            cache: CacheConfig::default(),
        }
    }

    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if `CHORUS_TOKEN` is missing or a variable has an invalid value
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key → value source
    ///
    /// # Errors
    /// Returns an error if `CHORUS_TOKEN` is missing or a variable has an invalid value
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &'static str| lookup(key).filter(|v| !v.trim().is_empty());

        let token = var("CHORUS_TOKEN").ok_or(ConfigError::MissingVar("CHORUS_TOKEN"))?;

        let config = Self {
            token,
            rest: RestConfig {
                api_url: var("CHORUS_API_URL").unwrap_or_else(default_api_url),
                user_agent: var("CHORUS_USER_AGENT").unwrap_or_else(default_user_agent),
                request_timeout_secs: parse_or(
                    "CHORUS_REST_TIMEOUT_SECS",
                    var("CHORUS_REST_TIMEOUT_SECS"),
                    default_request_timeout_secs,
                )?,
                max_rate_limit_retries: parse_or(
                    "CHORUS_REST_MAX_RATE_LIMIT_RETRIES",
                    var("CHORUS_REST_MAX_RATE_LIMIT_RETRIES"),
                    default_max_rate_limit_retries,
                )?,
                max_server_retries: parse_or(
                    "CHORUS_REST_MAX_SERVER_RETRIES",
                    var("CHORUS_REST_MAX_SERVER_RETRIES"),
                    default_max_server_retries,
                )?,
                retry_base_delay_ms: parse_or(
                    "CHORUS_REST_RETRY_BASE_DELAY_MS",
                    var("CHORUS_REST_RETRY_BASE_DELAY_MS"),
                    default_retry_base_delay_ms,
                )?,
                retry_max_delay_ms: parse_or(
                    "CHORUS_REST_RETRY_MAX_DELAY_MS",
                    var("CHORUS_REST_RETRY_MAX_DELAY_MS"),
                    default_retry_max_delay_ms,
                )?,
                method_overrides: var("CHORUS_REST_METHOD_OVERRIDES")
                    .map(|raw| parse_method_overrides(&raw))
                    .transpose()?
                    .unwrap_or_default(),
            },
            gateway: GatewayConfig {
                url: var("CHORUS_GATEWAY_URL").unwrap_or_else(default_gateway_url),
                version: parse_or(
                    "CHORUS_GATEWAY_VERSION",
                    var("CHORUS_GATEWAY_VERSION"),
                    default_gateway_version,
                )?,
                shard_count: parse_or(
                    "CHORUS_SHARD_COUNT",
                    var("CHORUS_SHARD_COUNT"),
                    default_shard_count,
                )?,
                intents: parse_or("CHORUS_INTENTS", var("CHORUS_INTENTS"), default_intents)?,
                large_threshold: parse_or(
                    "CHORUS_LARGE_THRESHOLD",
                    var("CHORUS_LARGE_THRESHOLD"),
                    default_large_threshold,
                )?,
                identify_interval_ms: parse_or(
                    "CHORUS_IDENTIFY_INTERVAL_MS",
                    var("CHORUS_IDENTIFY_INTERVAL_MS"),
                    default_identify_interval_ms,
                )?,
                max_missed_acks: parse_or(
                    "CHORUS_MAX_MISSED_ACKS",
                    var("CHORUS_MAX_MISSED_ACKS"),
                    default_max_missed_acks,
                )?,
                resume_window_secs: parse_or(
                    "CHORUS_RESUME_WINDOW_SECS",
                    var("CHORUS_RESUME_WINDOW_SECS"),
                    default_resume_window_secs,
                )?,
                reconnect_base_delay_ms: parse_or(
                    "CHORUS_RECONNECT_BASE_DELAY_MS",
                    var("CHORUS_RECONNECT_BASE_DELAY_MS"),
                    default_reconnect_base_delay_ms,
                )?,
                reconnect_max_delay_ms: parse_or(
                    "CHORUS_RECONNECT_MAX_DELAY_MS",
                    var("CHORUS_RECONNECT_MAX_DELAY_MS"),
                    default_reconnect_max_delay_ms,
                )?,
                connect_timeout_secs: parse_or(
                    "CHORUS_CONNECT_TIMEOUT_SECS",
                    var("CHORUS_CONNECT_TIMEOUT_SECS"),
                    default_connect_timeout_secs,
                )?,
                command_buffer: parse_or(
                    "CHORUS_COMMAND_BUFFER",
                    var("CHORUS_COMMAND_BUFFER"),
                    default_command_buffer,
                )?,
            },
            presence: PresenceConfig {
                status: var("CHORUS_PRESENCE_STATUS")
                    .map(|s| {
                        s.parse::<Status>()
                            .map_err(|e| ConfigError::InvalidValue("CHORUS_PRESENCE_STATUS", e))
                    })
                    .transpose()?
                    .unwrap_or_default(),
                afk: parse_or("CHORUS_PRESENCE_AFK", var("CHORUS_PRESENCE_AFK"), || false)?,
                activity: var("CHORUS_PRESENCE_ACTIVITY").map(Activity::playing),
            },
            cache: CacheConfig {
                message_limit: parse_or(
                    "CHORUS_MESSAGE_CACHE_LIMIT",
                    var("CHORUS_MESSAGE_CACHE_LIMIT"),
                    default_message_limit,
                )?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints
    ///
    /// # Errors
    /// Returns `InvalidValue` naming the first offending setting
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.token.trim().is_empty() {
            return Err(ConfigError::MissingVar("CHORUS_TOKEN"));
        }
        if self.gateway.shard_count == 0 {
            return Err(ConfigError::InvalidValue(
                "CHORUS_SHARD_COUNT",
                "must be at least 1".to_string(),
            ));
        }
        if self.gateway.max_missed_acks == 0 {
            return Err(ConfigError::InvalidValue(
                "CHORUS_MAX_MISSED_ACKS",
                "must be at least 1".to_string(),
            ));
        }
        if self.gateway.command_buffer == 0 {
            return Err(ConfigError::InvalidValue(
                "CHORUS_COMMAND_BUFFER",
                "must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_or<T>(
    key: &'static str,
    value: Option<String>,
    default: impl FnOnce() -> T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidValue(key, format!("{raw:?}: {e}"))),
        None => Ok(default()),
    }
}

const HTTP_VERBS: [&str; 5] = ["GET", "POST", "PUT", "PATCH", "DELETE"];

/// Parse `name=VERB,name=VERB` into a route → verb map
fn parse_method_overrides(raw: &str) -> Result<HashMap<String, String>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (name, verb) = pair.split_once('=').ok_or_else(|| {
                ConfigError::InvalidValue("CHORUS_REST_METHOD_OVERRIDES", format!("{pair:?} is not name=VERB"))
            })?;
            let verb = verb.trim().to_uppercase();
            if !HTTP_VERBS.contains(&verb.as_str()) {
                return Err(ConfigError::InvalidValue(
                    "CHORUS_REST_METHOD_OVERRIDES",
                    format!("unsupported verb {verb:?}"),
                ));
            }
            Ok((name.trim().to_string(), verb))
        })
        .collect()
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}

impl ConfigError {
    /// Fault classification
    #[must_use]
    pub fn kind(&self) -> crate::FaultKind {
        crate::FaultKind::Configuration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_missing_token() {
        let err = ClientConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar("CHORUS_TOKEN")));
    }

    #[test]
    fn test_default_values() {
        let config = ClientConfig::from_lookup(lookup(&[("CHORUS_TOKEN", "abc")])).unwrap();

        assert_eq!(config.token, "abc");
        assert_eq!(config.rest.max_rate_limit_retries, 3);
        assert_eq!(config.rest.max_server_retries, 3);
        assert_eq!(config.gateway.shard_count, 1);
        assert_eq!(config.gateway.identify_interval(), Duration::from_secs(5));
        assert_eq!(config.gateway.max_missed_acks, 2);
        assert_eq!(config.gateway.resume_window(), Duration::from_secs(180));
        assert_eq!(config.presence.status, Status::Online);
        assert!(config.rest.method_overrides.is_empty());
    }

    #[test]
    fn test_overrides() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("CHORUS_TOKEN", "abc"),
            ("CHORUS_SHARD_COUNT", "4"),
            ("CHORUS_PRESENCE_STATUS", "idle"),
            ("CHORUS_PRESENCE_ACTIVITY", "with fire"),
            ("CHORUS_REST_METHOD_OVERRIDES", "create_channel_invite=get, trigger_typing=POST"),
        ]))
        .unwrap();

        assert_eq!(config.gateway.shard_count, 4);
        assert_eq!(config.presence.status, Status::Idle);
        assert_eq!(config.presence.activity, Some(Activity::playing("with fire")));
        assert_eq!(
            config.rest.method_overrides.get("create_channel_invite").map(String::as_str),
            Some("GET")
        );
        assert_eq!(config.rest.method_overrides.len(), 2);
    }

    #[test]
    fn test_invalid_values() {
        let err = ClientConfig::from_lookup(lookup(&[
            ("CHORUS_TOKEN", "abc"),
            ("CHORUS_SHARD_COUNT", "many"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue("CHORUS_SHARD_COUNT", _)));

        let err = ClientConfig::from_lookup(lookup(&[
            ("CHORUS_TOKEN", "abc"),
            ("CHORUS_SHARD_COUNT", "0"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue("CHORUS_SHARD_COUNT", _)));

        let err = ClientConfig::from_lookup(lookup(&[
            ("CHORUS_TOKEN", "abc"),
            ("CHORUS_REST_METHOD_OVERRIDES", "create_channel_invite=FETCH"),
        ]))
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue("CHORUS_REST_METHOD_OVERRIDES", _)
        ));
    }

    #[test]
    fn test_connect_url() {
        let gateway = GatewayConfig::default();
        assert_eq!(gateway.connect_url(), "wss://gateway.discord.gg/?v=10&encoding=json");
        assert_eq!(with_gateway_query("ws://127.0.0.1:9000/", 10), "ws://127.0.0.1:9000/?v=10&encoding=json");
        assert_eq!(with_gateway_query("ws://x/?v=9", 10), "ws://x/?v=9");
    }
}
