//! Pixel and click-redirect HTTP endpoints.

use std::sync::Arc;

use axum::{
    Router,
    extract::{Path, Query, State},
    http::{HeaderMap, header},
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use base64::Engine;
use base64::engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD};
use broadside_store::{LogStore, RecordKey};
use chrono::Utc;
use serde::Deserialize;

use crate::{TrackingError, TrackingLinks, sign::client_fingerprint, sign::verify_click};

/// 1x1 transparent PNG served for every pixel request.
const PIXEL_PNG: &[u8] = &[
    0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x04, 0x00, 0x00, 0x00, 0xb5,
    0x1c, 0x0c, 0x02, 0x00, 0x00, 0x00, 0x0b, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9c, 0x63, 0x60,
    0x60, 0x00, 0x00, 0x00, 0x03, 0x00, 0x01, 0x2b, 0x09, 0x4d, 0x84, 0x00, 0x00, 0x00, 0x00,
    0x49, 0x45, 0x4e, 0x44, 0xae, 0x42, 0x60, 0x82,
];

const NO_CACHE: &str = "no-cache, no-store, must-revalidate, private, max-age=0";

/// Shared state for the tracking routes.
#[derive(Debug, Clone)]
pub struct TrackingState {
    pub links: TrackingLinks,
    pub store: Arc<dyn LogStore>,
}

/// Build the tracking router.
pub fn router(state: Arc<TrackingState>) -> Router {
    Router::new()
        .route("/track/open/{tracking_id}", get(open_pixel))
        .route("/track/click/{click_id}", get(click_redirect))
        .with_state(state)
}

/// Pixel fetch: record an open, then serve the image no matter what.
///
/// Opens must never error visibly to the mail client, and the no-cache
/// headers keep repeated client fetches from being silently suppressed.
async fn open_pixel(
    State(state): State<Arc<TrackingState>>,
    Path(tracking_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let addr_hint = header_str(&headers, "x-forwarded-for").unwrap_or("unknown");
    let user_agent = header_str(&headers, "user-agent").unwrap_or("");
    let fingerprint = client_fingerprint(addr_hint, user_agent);

    let key = RecordKey::Token(tracking_id.clone());
    match state.store.record_open(&key, Utc::now(), Some(fingerprint)).await {
        Ok(true) => {
            tracing::info!(tracking_id = %tracking_id, "Recorded open event");
        }
        Ok(false) => {
            tracing::debug!(tracking_id = %tracking_id, "Pixel fetch for unknown tracking id");
        }
        Err(e) => {
            tracing::error!(tracking_id = %tracking_id, error = %e, "Failed to record open event");
        }
    }

    (
        [
            (header::CONTENT_TYPE, "image/png"),
            (header::CACHE_CONTROL, NO_CACHE),
            (header::PRAGMA, "no-cache"),
            (header::EXPIRES, "0"),
        ],
        PIXEL_PNG,
    )
        .into_response()
}

#[derive(Debug, Deserialize)]
struct ClickParams {
    sig: String,
    d: String,
}

/// Click redirect: verify the signature before trusting the destination.
async fn click_redirect(
    State(state): State<Arc<TrackingState>>,
    Path(click_id): Path<String>,
    Query(params): Query<ClickParams>,
) -> Result<Redirect, TrackingError> {
    let decoded = URL_SAFE_NO_PAD
        .decode(params.d.as_bytes())
        .or_else(|_| URL_SAFE.decode(params.d.as_bytes()))
        .map_err(|_| TrackingError::BadDestination)?;
    let destination =
        String::from_utf8(decoded).map_err(|_| TrackingError::BadDestination)?;

    if !verify_click(state.links.secret(), &click_id, &params.d, &params.sig) {
        tracing::warn!(click_id = %click_id, "Rejected click with invalid signature");
        return Err(TrackingError::InvalidSignature);
    }

    let key = RecordKey::Click(click_id.clone());
    match state.store.record_click(&key, Utc::now()).await {
        Ok(true) => {
            tracing::info!(click_id = %click_id, "Recorded click event");
        }
        Ok(false) => {
            tracing::debug!(click_id = %click_id, "Click for unknown click id");
        }
        Err(e) => {
            tracing::error!(click_id = %click_id, error = %e, "Failed to record click event");
        }
    }

    Ok(Redirect::temporary(&destination))
}

fn header_str<'h>(headers: &'h HeaderMap, name: &str) -> Option<&'h str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}
