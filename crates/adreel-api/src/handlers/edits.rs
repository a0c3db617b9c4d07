//! Edit submission handler.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use adreel_models::{CampaignId, Cost};

use crate::error::ApiResult;
use crate::state::AppState;

/// Submission request body.
#[derive(Debug, Deserialize)]
pub struct SubmitEditRequest {
    pub instruction: String,
}

/// 202-style acceptance response.
#[derive(Debug, Serialize)]
pub struct SubmitEditResponse {
    pub job_id: String,
    pub estimated_cost: Cost,
    pub estimated_duration_seconds: u64,
}

/// POST /api/campaigns/:campaign_id/scenes/:scene_index/edit
///
/// Accepts one scene-edit instruction. Returns 409 when an edit is
/// already in flight for the campaign, 400 on validation failures.
pub async fn submit_edit(
    State(state): State<AppState>,
    Path((campaign_id, scene_index)): Path<(String, u32)>,
    Json(body): Json<SubmitEditRequest>,
) -> ApiResult<(StatusCode, Json<SubmitEditResponse>)> {
    let id = CampaignId::from_string(campaign_id);
    let accepted = state.edits.submit(&id, scene_index, &body.instruction).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(SubmitEditResponse {
            job_id: accepted.job_id.to_string(),
            estimated_cost: accepted.estimated_cost,
            estimated_duration_seconds: accepted.estimated_duration_secs,
        }),
    ))
}
