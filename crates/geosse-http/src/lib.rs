//! HTTP layer for the GeoSSE event streamer.
//!
//! This crate provides an Axum HTTP server that exposes a single
//! Server-Sent Events route. Every request to it opens an independent
//! stream session:
//!
//! - a fresh catalog is built from the configured preset
//! - a [`StreamSession`] is opened over a channel-backed sink
//! - the session runs on its own Tokio task
//! - the receiving end of the channel becomes the `text/event-stream`
//!   response body
//!
//! When the client goes away the channel closes, a watcher task cancels
//! the session, and the writer stops before its next frame. Every session
//! token is a child of the server-wide shutdown token, so stopping the
//! server stops every stream.
//!
//! [`StreamSession`]: geosse_core::StreamSession

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod state;

// Re-export primary types for convenience.
pub use error::HttpError;
pub use router::build_router;
pub use server::{ServerError, start_server};
pub use state::AppState;
