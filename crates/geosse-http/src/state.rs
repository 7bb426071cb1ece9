//! Shared application state for the HTTP layer.
//!
//! [`AppState`] is read-only configuration plus two pieces of shared
//! plumbing: the server-wide shutdown token every session token derives
//! from, and a gauge of open sessions. Sessions never share catalog or
//! cursor state with each other.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use geosse_core::config::StreamConfig;
use tokio_util::sync::CancellationToken;

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`] and injected via Axum's `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Path the stream route is mounted at.
    pub stream_path: String,
    /// Pacing and catalog for new sessions.
    pub stream: StreamConfig,
    /// Cancelled when the server shuts down.
    pub shutdown: CancellationToken,
    active_sessions: Arc<AtomicUsize>,
}

impl AppState {
    /// Create state for the given route and stream settings.
    pub fn new(stream_path: impl Into<String>, stream: StreamConfig) -> Self {
        Self {
            stream_path: stream_path.into(),
            stream,
            shutdown: CancellationToken::new(),
            active_sessions: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Use an externally owned shutdown token.
    #[must_use]
    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Number of sessions currently streaming.
    pub fn active_sessions(&self) -> usize {
        self.active_sessions.load(Ordering::Acquire)
    }

    /// Count a new session. The count drops when the guard is dropped.
    pub fn track_session(&self) -> SessionGuard {
        self.active_sessions.fetch_add(1, Ordering::AcqRel);
        SessionGuard {
            counter: Arc::clone(&self.active_sessions),
        }
    }
}

/// Keeps a session counted in [`AppState::active_sessions`] while alive.
#[derive(Debug)]
pub struct SessionGuard {
    counter: Arc<AtomicUsize>,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::AcqRel);
    }
}
