//! Error types for the HTTP layer.
//!
//! [`HttpError`] covers the failures a request can hit before its stream
//! starts. It converts into a JSON error response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation. Once
//! the response has started, stream errors only end the session.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use geosse_core::StreamError;

/// Errors that can occur in the HTTP layer.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    /// No route matches the request path.
    #[error("not found: {0}")]
    NotFound(String),

    /// The stream session could not be opened.
    #[error("stream rejected: {0}")]
    StreamRejected(#[from] StreamError),
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::StreamRejected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = serde_json::json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}
