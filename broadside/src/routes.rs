//! Job submission and status endpoints.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use broadside_dispatch::{CampaignPayload, DispatchError, JobQueue, JobStatus, RecipientMessage};
use serde::{Deserialize, Serialize};

/// Shared state for the job endpoints.
#[derive(Debug, Clone)]
pub struct JobsState {
    pub jobs: JobQueue,
}

/// Build the job router.
pub fn router(state: JobsState) -> Router {
    Router::new()
        .route("/campaigns/{campaign_id}/send", post(submit_send))
        .route("/jobs/{job_id}", get(job_status))
        .with_state(state)
}

/// Bulk send request body. Recipients arrive already personalized.
#[derive(Debug, Deserialize)]
pub struct SendRequest {
    pub subject: String,
    #[serde(default)]
    pub campaign_name: String,
    #[serde(default)]
    pub from_email: Option<String>,
    #[serde(default)]
    pub reply_to: Option<String>,
    pub messages: Vec<RecipientMessage>,
}

#[derive(Debug, Serialize)]
struct SubmitResponse {
    job_id: String,
}

/// Enqueue a bulk send; the worker pool picks it up off the request path.
async fn submit_send(
    State(state): State<JobsState>,
    Path(campaign_id): Path<String>,
    Json(request): Json<SendRequest>,
) -> Result<(StatusCode, Json<SubmitResponse>), (StatusCode, String)> {
    let payload = CampaignPayload {
        campaign_id,
        campaign_name: request.campaign_name,
        subject: request.subject,
        from_email: request.from_email,
        reply_to: request.reply_to,
        messages: request.messages,
    };

    match state.jobs.submit(payload) {
        Ok(job_id) => Ok((StatusCode::ACCEPTED, Json(SubmitResponse { job_id }))),
        Err(DispatchError::QueueFull) => Err((
            StatusCode::SERVICE_UNAVAILABLE,
            "job queue is full".to_string(),
        )),
        Err(e) => Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
    }
}

async fn job_status(
    State(state): State<JobsState>,
    Path(job_id): Path<String>,
) -> Result<Json<JobStatus>, StatusCode> {
    state
        .jobs
        .status(&job_id)
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}
