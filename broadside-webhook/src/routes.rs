//! Webhook HTTP endpoint.

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::HeaderMap,
    routing::post,
};
use serde::Serialize;

use crate::{IngestReport, WebhookError, WebhookIngestor};

/// Header carrying the signature timestamp.
pub const TIMESTAMP_HEADER: &str = "x-webhook-timestamp";
/// Header carrying the base64 DER ECDSA signature.
pub const SIGNATURE_HEADER: &str = "x-webhook-signature";

/// Shared state for the webhook route.
#[derive(Debug, Clone)]
pub struct WebhookState {
    pub ingestor: Arc<WebhookIngestor>,
}

/// Build the webhook router.
pub fn router(state: WebhookState) -> Router {
    Router::new()
        .route("/webhooks/email-events", post(receive_events))
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct WebhookResponse {
    message: &'static str,
    processed: usize,
    skipped: usize,
}

/// Always reports success once the batch has been iterated; only
/// authentication and parse failures reject the request.
async fn receive_events(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookResponse>, WebhookError> {
    let timestamp = header_str(&headers, TIMESTAMP_HEADER);
    let signature = header_str(&headers, SIGNATURE_HEADER);

    let IngestReport { processed, skipped } = state
        .ingestor
        .ingest(timestamp, signature, &body)
        .await?;

    Ok(Json(WebhookResponse {
        message: "events processed",
        processed,
        skipped,
    }))
}

fn header_str<'h>(headers: &'h HeaderMap, name: &str) -> Option<&'h str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}
