//! Tracing and logging setup
//!
//! Installs a `tracing` subscriber. `RUST_LOG` overrides everything; otherwise the
//! filter is built from the client level plus a quieter level for the HTTP and
//! WebSocket stacks underneath.

use std::str::FromStr;

use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Crates whose logs describe wire traffic rather than client behavior
const WIRE_CRATES: [&str; 4] = ["hyper", "reqwest", "tungstenite", "tokio_tungstenite"];

/// Output format of log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Multi-line, human readable
    #[default]
    Pretty,
    /// One line per event
    Compact,
    /// One JSON object per event
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format: {other}")),
        }
    }
}

/// Tracing configuration options
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Level for the chorus crates
    pub level: Level,
    /// Level for the HTTP and WebSocket crates
    pub wire_level: Level,
    pub format: LogFormat,
    /// Log span open and close, which shows REST request timings
    pub span_events: bool,
    /// Include file and line numbers
    pub file_line: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            wire_level: Level::WARN,
            format: LogFormat::Compact,
            span_events: false,
            file_line: false,
        }
    }
}

impl TracingConfig {
    /// Verbose settings for working on the client itself
    #[must_use]
    pub fn development() -> Self {
        Self {
            level: Level::DEBUG,
            format: LogFormat::Pretty,
            span_events: true,
            file_line: true,
            ..Self::default()
        }
    }

    /// Read `CHORUS_LOG_LEVEL`, `CHORUS_WIRE_LOG_LEVEL` and `CHORUS_LOG_FORMAT`
    ///
    /// Unparseable values fall back to the defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let var = |key: &str| std::env::var(key).ok();
        let mut config = Self::default();

        if let Some(level) = var("CHORUS_LOG_LEVEL").and_then(|s| Level::from_str(&s).ok()) {
            config.level = level;
        }
        if let Some(level) = var("CHORUS_WIRE_LOG_LEVEL").and_then(|s| Level::from_str(&s).ok()) {
            config.wire_level = level;
        }
        if let Some(format) = var("CHORUS_LOG_FORMAT").and_then(|s| s.parse().ok()) {
            config.format = format;
        }
        config.span_events = config.level >= Level::DEBUG;
        config.file_line = config.level >= Level::DEBUG;
        config
    }

    /// Filter directives used when `RUST_LOG` is not set
    #[must_use]
    pub fn directives(&self) -> String {
        let mut directives = self.level.to_string().to_lowercase();
        for krate in WIRE_CRATES {
            directives.push_str(&format!(",{krate}={}", self.wire_level.to_string().to_lowercase()));
        }
        directives
    }

    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.directives()))
    }

    fn span_events(&self) -> FmtSpan {
        if self.span_events {
            FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        }
    }
}

/// Try to initialize tracing with the default configuration
pub fn try_init_tracing() -> Result<(), TracingError> {
    try_init_tracing_with_config(&TracingConfig::default())
}

/// Try to initialize tracing; fails if a global subscriber is already set
pub fn try_init_tracing_with_config(config: &TracingConfig) -> Result<(), TracingError> {
    let layer = fmt::layer()
        .with_file(config.file_line)
        .with_line_number(config.file_line)
        .with_span_events(config.span_events());
    let registry = tracing_subscriber::registry().with(config.env_filter());

    let installed = match config.format {
        LogFormat::Pretty => registry.with(layer.pretty()).try_init(),
        LogFormat::Compact => registry.with(layer.compact()).try_init(),
        LogFormat::Json => registry.with(layer.json()).try_init(),
    };
    installed.map_err(|_| TracingError::AlreadyInitialized)
}

/// Tracing initialization errors
#[derive(Debug, thiserror::Error)]
pub enum TracingError {
    #[error("Tracing subscriber already initialized")]
    AlreadyInitialized,
}
