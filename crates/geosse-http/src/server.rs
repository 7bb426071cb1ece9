//! HTTP server lifecycle management.
//!
//! Provides [`start_server`] which binds to a TCP address and runs the
//! Axum server until the state's shutdown token is cancelled. Because
//! every stream session token is a child of that token, cancelling it
//! also ends every open stream, which lets graceful shutdown complete.

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

use geosse_core::config::ServerConfig;

use crate::router::build_router;
use crate::state::AppState;

/// Errors that can occur when starting or running the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Failed to bind to the network address.
    #[error("bind error: {0}")]
    Bind(String),

    /// The server encountered a fatal error while serving.
    #[error("serve error: {0}")]
    Serve(String),
}

/// Bind a listener on the configured `host:port`.
///
/// # Errors
///
/// Returns [`ServerError::Bind`] if the address cannot be resolved or bound.
pub async fn bind(config: &ServerConfig) -> Result<TcpListener, ServerError> {
    let addr = config.address();
    TcpListener::bind(&addr)
        .await
        .map_err(|e| ServerError::Bind(format!("bind failed on {addr}: {e}")))
}

/// Serve requests on an already bound listener until shutdown.
///
/// # Errors
///
/// Returns [`ServerError::Serve`] if the server hits a fatal I/O error.
pub async fn serve(listener: TcpListener, state: Arc<AppState>) -> Result<(), ServerError> {
    let shutdown = state.shutdown.clone();
    let router = build_router(state);

    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| ServerError::Serve(format!("serve error: {e}")))?;

    info!("Server stopped");
    Ok(())
}

/// Start the HTTP server.
///
/// Binds to the configured address and serves requests until the state's
/// shutdown token is cancelled. Returns `Ok(())` on clean shutdown.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind or the server
/// encounters a fatal I/O error.
pub async fn start_server(config: &ServerConfig, state: Arc<AppState>) -> Result<(), ServerError> {
    let listener = bind(config).await?;
    let local = listener
        .local_addr()
        .map_err(|e| ServerError::Bind(format!("no local address: {e}")))?;

    info!(
        addr = %local,
        stream_path = %state.stream_path,
        "GeoSSE server listening"
    );

    serve(listener, state).await
}
