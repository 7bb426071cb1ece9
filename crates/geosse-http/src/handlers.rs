//! Request handlers.
//!
//! [`stream_events`] opens one stream session per request and hands the
//! session's output to Axum as a streaming body. [`not_found`] is the
//! fallback for every other path.

use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{Uri, header};
use axum::response::{IntoResponse, Response};
use geosse_core::{ChannelSink, StreamSession, build_catalog_for};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::HttpError;
use crate::state::{AppState, SessionGuard};

/// MIME type of the stream response.
pub const EVENT_STREAM: &str = "text/event-stream";

/// Open a new stream session and return its output as the response body.
///
/// The session starts emitting as soon as its task is scheduled.
///
/// # Route
///
/// `GET <stream_path>` (default `/stream`)
///
/// # Errors
///
/// Returns [`HttpError::StreamRejected`] if the session cannot be opened
/// (empty catalog or zero delay). No frame is written in that case.
#[allow(clippy::unused_async)]
pub async fn stream_events(State(state): State<Arc<AppState>>) -> Result<Response, HttpError> {
    let catalog = build_catalog_for(state.stream.catalog);
    let (sink, rx) = ChannelSink::channel(state.stream.channel_capacity);
    let disconnected = sink.disconnected();

    let session = StreamSession::open(catalog, sink, state.stream.delay())?;
    let cancel = state.shutdown.child_token();
    let guard = state.track_session();

    info!(
        session_id = %session.id(),
        catalog = %state.stream.catalog,
        active_sessions = state.active_sessions(),
        "Client connected"
    );

    tokio::spawn(watch_disconnect(disconnected, cancel.clone()));
    tokio::spawn(drive_session(session, cancel, guard));

    let body = Body::from_stream(ReceiverStream::new(rx).map(Ok::<_, Infallible>));

    Ok((
        [
            (header::CONTENT_TYPE, EVENT_STREAM),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        body,
    )
        .into_response())
}

/// Fallback for unknown paths.
#[allow(clippy::unused_async)]
pub async fn not_found(uri: Uri) -> HttpError {
    HttpError::NotFound(uri.path().to_owned())
}

/// Run a session to completion, then release everything tied to it.
async fn drive_session(
    mut session: StreamSession<ChannelSink>,
    cancel: CancellationToken,
    _guard: SessionGuard,
) {
    let outcome = session.run(&cancel).await;
    // Stops the disconnect watcher so its sender handle is dropped and the
    // body reaches end-of-stream.
    cancel.cancel();
    debug!(
        session_id = %session.id(),
        frames_sent = session.frames_sent(),
        cancelled = outcome.is_ok(),
        "Stream task finished"
    );
}

/// Cancel the session once the client side of the channel is gone.
async fn watch_disconnect(disconnected: impl Future<Output = ()>, cancel: CancellationToken) {
    tokio::select! {
        () = disconnected => {
            info!("Connection closed");
            cancel.cancel();
        }
        () = cancel.cancelled() => {}
    }
}
