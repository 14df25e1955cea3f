//! Configuration loading and typed config structures for the relay.
//!
//! Configuration lives in an optional YAML file (`radar-config.yaml` by
//! default). Every field has a default, so an empty or missing file is
//! valid. A handful of environment variables override file values so the
//! relay can be pointed elsewhere without editing the file.

use std::path::Path;

use radar_types::FeedMode;
use serde::Deserialize;

/// Default config file name, looked up relative to the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "radar-config.yaml";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value parsed but is not usable.
    #[error("invalid config value: {0}")]
    Invalid(String),
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level relay configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Where map calibration metadata is fetched from.
    pub metadata: MetadataConfig,
    /// Network listener settings.
    pub server: ServerSettings,
    /// Per-session deadlines.
    pub session: SessionConfig,
    /// How tick records reach sessions.
    pub feed: FeedConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

impl RelayConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override file values:
    /// - `RADAR_METADATA_URL` overrides `metadata.base_url`
    /// - `RADAR_HOST` overrides `server.host`
    /// - `RADAR_PORT` overrides `server.port`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&contents)?;
        config.apply_env_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if it exists, otherwise start from defaults.
    /// Environment overrides apply either way.
    ///
    /// # Errors
    ///
    /// See [`RelayConfig::from_file`].
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            return Self::from_file(path);
        }
        let mut config = Self::default();
        config.apply_env_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a YAML string without env overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yml::from_str(yaml)?;
        Ok(config)
    }

    /// Apply overrides from an environment lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `RADAR_PORT` is not a port number.
    pub fn apply_env_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(val) = lookup("RADAR_METADATA_URL") {
            self.metadata.base_url = val;
        }
        if let Some(val) = lookup("RADAR_HOST") {
            self.server.host = val;
        }
        if let Some(val) = lookup("RADAR_PORT") {
            self.server.port = val
                .parse()
                .map_err(|e| ConfigError::Invalid(format!("RADAR_PORT {val:?}: {e}")))?;
        }
        Ok(())
    }

    /// Reject values that would disable a deadline or the live buffer.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let nonzero = [
            ("metadata.request_timeout_ms", self.metadata.request_timeout_ms),
            ("session.handshake_timeout_ms", self.session.handshake_timeout_ms),
            ("session.write_timeout_ms", self.session.write_timeout_ms),
        ];
        for (field, value) in nonzero {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("{field} must be greater than zero")));
            }
        }
        if self.feed.live_capacity == 0 {
            return Err(ConfigError::Invalid(String::from(
                "feed.live_capacity must be greater than zero",
            )));
        }
        if self.metadata.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid(String::from(
                "metadata.base_url must not be empty",
            )));
        }
        Ok(())
    }
}

/// Metadata host settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MetadataConfig {
    /// Base URL; the map path is appended as `/{map}/{crc}/info.json`.
    #[serde(default = "default_metadata_url")]
    pub base_url: String,

    /// Whole-request deadline in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            base_url: default_metadata_url(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

/// Network listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerSettings {
    /// Address to bind to.
    #[serde(default = "default_host")]
    pub host: String,

    /// TCP port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Per-session deadlines.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SessionConfig {
    /// How long a new session may take to send its subscribe message.
    #[serde(default = "default_handshake_timeout_ms")]
    pub handshake_timeout_ms: u64,

    /// Deadline for each individual outbound message.
    #[serde(default = "default_write_timeout_ms")]
    pub write_timeout_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            handshake_timeout_ms: default_handshake_timeout_ms(),
            write_timeout_ms: default_write_timeout_ms(),
        }
    }
}

/// Feed settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FeedConfig {
    /// Recorded (ingest, then serve) or live (serve while ingesting).
    #[serde(default)]
    pub mode: FeedMode,

    /// Records buffered per live feed before lagging sessions skip ahead.
    #[serde(default = "default_live_capacity")]
    pub live_capacity: usize,

    /// Pause between published records in live mode. Zero publishes as
    /// fast as the demo decodes.
    #[serde(default)]
    pub live_tick_interval_ms: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            mode: FeedMode::default(),
            live_capacity: default_live_capacity(),
            live_tick_interval_ms: 0,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default `tracing` filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_metadata_url() -> String {
    String::from("https://radar-overviews.csgo.saiko.tech")
}

const fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_host() -> String {
    String::from("0.0.0.0")
}

const fn default_port() -> u16 {
    8080
}

const fn default_handshake_timeout_ms() -> u64 {
    10_000
}

const fn default_write_timeout_ms() -> u64 {
    5_000
}

const fn default_live_capacity() -> usize {
    256
}

fn default_log_level() -> String {
    String::from("info")
}
