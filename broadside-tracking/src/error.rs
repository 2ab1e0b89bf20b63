//! Tracking request errors.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Click-request failures. Pixel requests never error: they degrade to a
/// no-op counter update and still serve the image.
#[derive(Debug, Error)]
pub enum TrackingError {
    /// The `d` parameter did not decode to a UTF-8 URL.
    #[error("Bad destination")]
    BadDestination,

    /// HMAC verification failed; redirecting would be an open redirect.
    #[error("Invalid signature")]
    InvalidSignature,
}

impl IntoResponse for TrackingError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::BadDestination => StatusCode::BAD_REQUEST,
            Self::InvalidSignature => StatusCode::FORBIDDEN,
        };
        (status, self.to_string()).into_response()
    }
}
