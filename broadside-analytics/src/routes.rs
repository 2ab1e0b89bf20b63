//! Campaign read endpoints.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::{AnalyticsService, CampaignDetails, CampaignSummary, LogsPage};

/// Shared state for the analytics routes.
#[derive(Debug, Clone)]
pub struct AnalyticsState {
    pub service: Arc<AnalyticsService>,
}

/// Build the analytics router.
pub fn router(state: AnalyticsState) -> Router {
    Router::new()
        .route("/campaigns/{campaign_id}/summary", get(summary))
        .route("/campaigns/{campaign_id}/details", get(details))
        .route("/campaigns/{campaign_id}/logs", get(logs))
        .with_state(state)
}

async fn summary(
    State(state): State<AnalyticsState>,
    Path(campaign_id): Path<String>,
) -> Result<Json<CampaignSummary>, StatusCode> {
    state
        .service
        .summary(&campaign_id)
        .await
        .map(Json)
        .map_err(|e| {
            tracing::error!(campaign = %campaign_id, error = %e, "Summary query failed");
            StatusCode::INTERNAL_SERVER_ERROR
        })
}

async fn details(
    State(state): State<AnalyticsState>,
    Path(campaign_id): Path<String>,
) -> Result<Json<CampaignDetails>, StatusCode> {
    state
        .service
        .details(&campaign_id)
        .await
        .map(Json)
        .map_err(|e| {
            tracing::error!(campaign = %campaign_id, error = %e, "Details query failed");
            StatusCode::INTERNAL_SERVER_ERROR
        })
}

#[derive(Debug, Deserialize)]
struct LogsParams {
    limit: Option<usize>,
    /// RFC 3339 timestamp; returns records created strictly before it.
    before: Option<DateTime<Utc>>,
}

async fn logs(
    State(state): State<AnalyticsState>,
    Path(campaign_id): Path<String>,
    Query(params): Query<LogsParams>,
) -> Result<Json<LogsPage>, StatusCode> {
    state
        .service
        .logs(&campaign_id, params.limit, params.before)
        .await
        .map(Json)
        .map_err(|e| {
            tracing::error!(campaign = %campaign_id, error = %e, "Logs query failed");
            StatusCode::INTERNAL_SERVER_ERROR
        })
}
