//! GeoSSE server binary.
//!
//! The composition root: loads configuration, installs logging, builds
//! the shared HTTP state, and serves the event stream until `Ctrl-C`.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `GEOSSE_CONFIG` or `geosse-config.yaml`
//! 2. Initialize structured logging (tracing)
//! 3. Create the shutdown token and wire it to `Ctrl-C`
//! 4. Build application state from the stream settings
//! 5. Serve until shutdown

mod error;

use std::path::PathBuf;
use std::sync::Arc;

use geosse_core::config::{LogFormat, LoggingConfig, StreamerConfig};
use geosse_http::AppState;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::ServerBinError;

/// Environment variable naming the configuration file.
const CONFIG_PATH_ENV: &str = "GEOSSE_CONFIG";

/// Configuration file used when `GEOSSE_CONFIG` is unset.
const DEFAULT_CONFIG_PATH: &str = "geosse-config.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration, logging, or the server fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let (config, source) = load_config()?;

    // 2. Initialize structured logging.
    init_logging(&config.logging)?;

    info!(
        config_source = %source,
        host = %config.server.host,
        port = config.server.port,
        stream_path = %config.server.stream_path,
        interval_ms = config.stream.interval_ms,
        catalog = %config.stream.catalog,
        "Configuration loaded"
    );

    // 3. Shutdown token, cancelled on Ctrl-C.
    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("Ctrl-C received, shutting down"),
                Err(e) => warn!(error = %e, "failed to listen for Ctrl-C, shutting down"),
            }
            shutdown.cancel();
        }
    });

    // 4. Application state.
    let state = Arc::new(
        AppState::new(config.server.stream_path.clone(), config.stream.clone())
            .with_shutdown(shutdown),
    );

    // 5. Serve.
    geosse_http::start_server(&config.server, state)
        .await
        .map_err(ServerBinError::from)?;

    info!("geosse-server shutdown complete");
    Ok(())
}

/// Load the configuration file, falling back to defaults when it is absent.
///
/// Environment overrides are applied in both cases.
fn load_config() -> Result<(StreamerConfig, String), ServerBinError> {
    let path = std::env::var(CONFIG_PATH_ENV)
        .map_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);

    if path.exists() {
        let config = StreamerConfig::from_file(&path)?;
        return Ok((config, path.display().to_string()));
    }

    let mut config = StreamerConfig::default();
    config.apply_env_overrides()?;
    config.validate()?;
    Ok((config, String::from("defaults")))
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured level.
fn init_logging(logging: &LoggingConfig) -> Result<(), ServerBinError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => configured_filter(&logging.level)?,
    };
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let installed = match logging.format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };

    installed.map_err(|e| ServerBinError::Logging {
        message: e.to_string(),
    })
}

/// Build the filter for the configured `logging.level`.
fn configured_filter(level: &str) -> Result<EnvFilter, ServerBinError> {
    EnvFilter::try_new(level).map_err(|e| ServerBinError::Logging {
        message: format!("invalid logging.level `{level}`: {e}"),
    })
}
