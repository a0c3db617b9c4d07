//! Job status handlers backing the polling client.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

use adreel_models::{Cost, JobId, STALE_GRACE_PERIOD_SECS, STALE_THRESHOLD_SECS};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Job status response.
#[derive(Debug, Serialize)]
pub struct JobStatusResponse {
    pub job_id: String,
    pub campaign_id: String,
    pub scene_index: u32,
    /// Current pipeline stage (snake_case)
    pub stage: String,
    /// Progress percentage, monotone per job
    pub progress_pct: u8,
    /// Cost incurred so far
    pub cost: Cost,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub cancel_requested: bool,
    /// Whether the owning worker has stopped heartbeating
    pub is_stale: bool,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Sequence number for client-side ordering
    pub event_seq: u64,
}

/// Cancellation acknowledgement.
#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub job_id: String,
    pub cancel_requested: bool,
}

/// GET /api/jobs/:job_id/status
///
/// Polling endpoint; reads the TTL'd snapshot row, never the campaign.
pub async fn get_job_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<JobStatusResponse>> {
    let id = JobId::from_string(job_id);
    let snapshot = state
        .status
        .get(&id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("job {id} not found")))?;

    Ok(Json(JobStatusResponse {
        job_id: snapshot.job_id.to_string(),
        campaign_id: snapshot.campaign_id.to_string(),
        scene_index: snapshot.scene_index,
        stage: snapshot.stage.as_str().to_string(),
        progress_pct: snapshot.progress_pct,
        cost: snapshot.cost,
        error_message: snapshot.error_message.clone(),
        cancel_requested: snapshot.cancel_requested,
        is_stale: snapshot.is_stale(STALE_THRESHOLD_SECS, STALE_GRACE_PERIOD_SECS),
        started_at: snapshot.started_at,
        updated_at: snapshot.updated_at,
        event_seq: snapshot.event_seq,
    }))
}

/// POST /api/jobs/:job_id/cancel
///
/// Best-effort: the flag is honored at the next cancellable stage
/// boundary; a job past that window completes normally.
pub async fn cancel_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<(StatusCode, Json<CancelResponse>)> {
    let id = JobId::from_string(job_id);
    state.edits.cancel(&id).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(CancelResponse {
            job_id: id.to_string(),
            cancel_requested: true,
        }),
    ))
}
