//! Webhook error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Batch-level webhook failures. Per-event problems are logged and
/// skipped, never surfaced here.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Verification is enabled but the timestamp/signature headers are
    /// absent.
    #[error("Missing webhook signature headers")]
    MissingSignatureHeaders,

    /// Verification is enabled but no public key is configured.
    #[error("Webhook public key not configured")]
    MissingPublicKey,

    /// The configured public key could not be loaded.
    #[error("Invalid webhook public key")]
    InvalidPublicKey,

    /// Signature verification failed for the batch.
    #[error("Invalid webhook signature")]
    InvalidSignature,

    /// The request body was not a JSON array of events.
    #[error("Invalid webhook payload: {0}")]
    InvalidPayload(String),
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::MissingSignatureHeaders | Self::InvalidSignature => StatusCode::UNAUTHORIZED,
            Self::MissingPublicKey | Self::InvalidPublicKey => StatusCode::INTERNAL_SERVER_ERROR,
            Self::InvalidPayload(_) => StatusCode::BAD_REQUEST,
        };
        (status, self.to_string()).into_response()
    }
}
