//! Configuration loading and typed config structures for the streamer.
//!
//! The canonical configuration lives in `geosse-config.yaml` at the project
//! root. This module defines strongly-typed structs that mirror the YAML
//! structure, and provides a loader that reads and validates the file.
//! Every field has a default, so an absent file or an empty document is a
//! valid configuration.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tracing::level_filters::LevelFilter;

use crate::catalog::CatalogPreset;

/// Environment variable that overrides `server.host`.
pub const ENV_HOST: &str = "GEOSSE_HOST";
/// Environment variable that overrides `server.port`.
pub const ENV_PORT: &str = "GEOSSE_PORT";
/// Environment variable that overrides `stream.interval_ms`.
pub const ENV_INTERVAL_MS: &str = "GEOSSE_INTERVAL_MS";

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
    #[error("invalid config value for `{field}`: {reason}")]
    Invalid {
        /// Dotted path of the offending field.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level streamer configuration.
///
/// Mirrors the structure of `geosse-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct StreamerConfig {
    /// Listening address and route.
    #[serde(default)]
    pub server: ServerConfig,

    /// Stream pacing and content.
    #[serde(default)]
    pub stream: StreamConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl StreamerConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values:
    /// - `GEOSSE_HOST` overrides `server.host`
    /// - `GEOSSE_PORT` overrides `server.port`
    /// - `GEOSSE_INTERVAL_MS` overrides `stream.interval_ms`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, and
    /// [`ConfigError::Invalid`] if an override or value is unusable.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&contents)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a YAML string. No environment overrides
    /// are applied.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Apply overrides from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if a numeric override does not parse.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if a numeric override does not parse.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup(ENV_HOST) {
            self.server.host = host;
        }
        if let Some(port) = lookup(ENV_PORT) {
            self.server.port = port.trim().parse().map_err(|e| ConfigError::Invalid {
                field: "server.port",
                reason: format!("{ENV_PORT}={port}: {e}"),
            })?;
        }
        if let Some(interval) = lookup(ENV_INTERVAL_MS) {
            self.stream.interval_ms = interval.trim().parse().map_err(|e| ConfigError::Invalid {
                field: "stream.interval_ms",
                reason: format!("{ENV_INTERVAL_MS}={interval}: {e}"),
            })?;
        }
        Ok(())
    }

    /// Check values that parse but cannot be used.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for a zero interval, a zero
    /// channel capacity, or a stream path that does not start with `/`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stream.interval_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "stream.interval_ms",
                reason: String::from("must be greater than zero"),
            });
        }
        if self.stream.channel_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "stream.channel_capacity",
                reason: String::from("must be greater than zero"),
            });
        }
        if !self.server.stream_path.starts_with('/') {
            return Err(ConfigError::Invalid {
                field: "server.stream_path",
                reason: format!("`{}` must start with `/`", self.server.stream_path),
            });
        }
        if let Some(bad) = self.logging.invalid_directive() {
            return Err(ConfigError::Invalid {
                field: "logging.level",
                reason: format!("`{bad}` is not a log level"),
            });
        }
        Ok(())
    }
}

/// Listening address and stream route.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: String,

    /// TCP port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Path of the event stream route.
    #[serde(default = "default_stream_path")]
    pub stream_path: String,
}

impl ServerConfig {
    /// `host:port` as a single string.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            stream_path: default_stream_path(),
        }
    }
}

/// Pacing and content of every stream.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StreamConfig {
    /// Milliseconds between the start of one frame and the next.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Which built-in catalog each session replays.
    #[serde(default)]
    pub catalog: CatalogPreset,

    /// Chunks buffered per connection before the writer waits on the client.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl StreamConfig {
    /// The inter-frame delay.
    pub const fn delay(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            catalog: CatalogPreset::default(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error, off), or comma-separated
    /// `target=level` directives. `RUST_LOG` wins when set.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl LoggingConfig {
    /// The first directive in `level` whose level part does not parse.
    fn invalid_directive(&self) -> Option<&str> {
        self.level.split(',').map(str::trim).find(|directive| {
            let level = directive.rsplit_once('=').map_or(*directive, |(_, level)| level);
            level.parse::<LevelFilter>().is_err()
        })
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

fn default_host() -> String {
    String::from("0.0.0.0")
}

const fn default_port() -> u16 {
    5000
}

fn default_stream_path() -> String {
    String::from("/stream")
}

const fn default_interval_ms() -> u64 {
    5000
}

const fn default_channel_capacity() -> usize {
    16
}

fn default_log_level() -> String {
    String::from("info")
}
