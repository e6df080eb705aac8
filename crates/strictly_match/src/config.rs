//! Match client and server configuration.

use crate::clock::{DEFAULT_INCREMENT, DEFAULT_INITIAL_TIME, MatchClock};
use crate::memory::DEFAULT_RETENTION;
use derive_getters::Getters;
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Settings shared by the `serve` and `play` commands.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize)]
pub struct MatchConfig {
    /// Base URL of the match server.
    #[serde(default = "default_server_url")]
    server_url: String,

    /// Address the server binds to.
    #[serde(default = "default_bind_host")]
    bind_host: String,

    /// Port the server binds to.
    #[serde(default = "default_bind_port")]
    bind_port: u16,

    /// Player id used when playing.
    #[serde(default = "default_player_id")]
    player_id: String,

    /// Display name used when playing.
    #[serde(default = "default_player_name")]
    player_name: String,

    /// Milliseconds between reconciliation polls.
    #[serde(default = "default_poll_interval_ms")]
    poll_interval_ms: u64,

    /// HTTP request timeout in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    request_timeout_ms: u64,

    /// Seconds each side starts with.
    #[serde(default = "default_clock_initial_secs")]
    clock_initial_secs: u64,

    /// Seconds credited after each move.
    #[serde(default = "default_clock_increment_secs")]
    clock_increment_secs: u64,

    /// Seconds a finished match stays on the server.
    #[serde(default = "default_retention_secs")]
    retention_secs: u64,
}

fn default_server_url() -> String {
    "http://127.0.0.1:3000".to_string()
}

fn default_bind_host() -> String {
    "127.0.0.1".to_string()
}

fn default_bind_port() -> u16 {
    3000
}

fn default_player_id() -> String {
    "player".to_string()
}

fn default_player_name() -> String {
    "Player".to_string()
}

fn default_poll_interval_ms() -> u64 {
    2000
}

fn default_request_timeout_ms() -> u64 {
    5000
}

fn default_clock_initial_secs() -> u64 {
    DEFAULT_INITIAL_TIME.as_secs()
}

fn default_clock_increment_secs() -> u64 {
    DEFAULT_INCREMENT.as_secs()
}

fn default_retention_secs() -> u64 {
    DEFAULT_RETENTION.as_secs()
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            bind_host: default_bind_host(),
            bind_port: default_bind_port(),
            player_id: default_player_id(),
            player_name: default_player_name(),
            poll_interval_ms: default_poll_interval_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            clock_initial_secs: default_clock_initial_secs(),
            clock_increment_secs: default_clock_increment_secs(),
            retention_secs: default_retention_secs(),
        }
    }
}

/// Values given on the command line, applied over the file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    /// Replaces `server_url`.
    pub server_url: Option<String>,
    /// Replaces `bind_host`.
    pub bind_host: Option<String>,
    /// Replaces `bind_port`.
    pub bind_port: Option<u16>,
    /// Replaces `player_id`.
    pub player_id: Option<String>,
    /// Replaces `player_name`.
    pub player_name: Option<String>,
    /// Replaces `poll_interval_ms`.
    pub poll_interval_ms: Option<u64>,
}

impl MatchConfig {
    /// Loads configuration from a TOML file.
    ///
    /// A missing file yields the defaults; absent keys take their defaults.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            debug!("No config file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))?;

        if config.poll_interval_ms == 0 {
            return Err(ConfigError::new(
                "poll_interval_ms must be positive".to_string(),
            ));
        }
        if config.clock_initial_secs == 0 {
            return Err(ConfigError::new(
                "clock_initial_secs must be positive".to_string(),
            ));
        }

        info!(player_id = %config.player_id, "Config loaded successfully");
        Ok(config)
    }

    /// Applies command-line overrides.
    pub fn with_overrides(self, overrides: ConfigOverrides) -> Self {
        Self {
            server_url: overrides.server_url.unwrap_or(self.server_url),
            bind_host: overrides.bind_host.unwrap_or(self.bind_host),
            bind_port: overrides.bind_port.unwrap_or(self.bind_port),
            player_id: overrides.player_id.unwrap_or(self.player_id),
            player_name: overrides.player_name.unwrap_or(self.player_name),
            poll_interval_ms: overrides
                .poll_interval_ms
                .filter(|ms| *ms > 0)
                .unwrap_or(self.poll_interval_ms),
            ..self
        }
    }

    /// Poll cadence.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// HTTP request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Clock given to each new match.
    pub fn clock(&self) -> MatchClock {
        MatchClock::new(
            Duration::from_secs(self.clock_initial_secs),
            Duration::from_secs(self.clock_increment_secs),
        )
    }

    /// How long finished matches are kept.
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[track_caller]
    pub fn new(message: String) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}
