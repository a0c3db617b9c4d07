//! Campaign read handlers.

use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

use adreel_models::{CampaignId, Cost, EditRecord};

use crate::error::ApiResult;
use crate::state::AppState;

/// Campaign summary response.
#[derive(Debug, Serialize)]
pub struct CampaignResponse {
    pub id: String,
    pub name: String,
    pub scene_count: u32,
    pub edit_count: u32,
    pub total_edit_cost: Cost,
    pub has_active_edit: bool,
    /// Short-lived playback URL for the final video
    pub final_video_url: String,
    pub created_at: DateTime<Utc>,
}

/// One scene in the scene list response.
#[derive(Debug, Serialize)]
pub struct SceneResponse {
    pub index: u32,
    pub role: String,
    pub description: String,
    pub target_duration_secs: f32,
    pub edit_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_edited_at: Option<DateTime<Utc>>,
    /// Short-lived playback URL for the scene clip
    pub playback_url: String,
}

/// Edit history response.
#[derive(Debug, Serialize)]
pub struct EditHistoryResponse {
    pub records: Vec<EditRecord>,
    pub total_cost: Cost,
    pub edit_count: u32,
}

/// GET /api/campaigns/:campaign_id
pub async fn get_campaign(
    State(state): State<AppState>,
    Path(campaign_id): Path<String>,
) -> ApiResult<Json<CampaignResponse>> {
    let id = CampaignId::from_string(campaign_id);
    let campaign = state.campaigns.get(&id).await?;

    let final_video_url = state
        .storage
        .resolve_url(&campaign.final_video_key, state.config.playback_url_expiry)
        .await?;

    Ok(Json(CampaignResponse {
        id: campaign.id.to_string(),
        name: campaign.name.clone(),
        scene_count: campaign.scene_count(),
        edit_count: campaign.edit_history.edit_count,
        total_edit_cost: campaign.edit_history.total_cost,
        has_active_edit: campaign.has_active_edit(),
        final_video_url,
        created_at: campaign.created_at,
    }))
}

/// GET /api/campaigns/:campaign_id/scenes
///
/// Scenes in index order with storage-resolved playback URLs.
pub async fn list_scenes(
    State(state): State<AppState>,
    Path(campaign_id): Path<String>,
) -> ApiResult<Json<Vec<SceneResponse>>> {
    let id = CampaignId::from_string(campaign_id);
    let campaign = state.campaigns.get(&id).await?;

    let mut scenes = Vec::with_capacity(campaign.scenes.len());
    for scene in &campaign.scenes {
        let playback_url = state
            .storage
            .resolve_url(&scene.clip_key, state.config.playback_url_expiry)
            .await?;
        scenes.push(SceneResponse {
            index: scene.index,
            role: scene.role.as_str().to_string(),
            description: scene.description.clone(),
            target_duration_secs: scene.target_duration_secs,
            edit_count: scene.edit_count,
            last_edited_at: scene.last_edited_at,
            playback_url,
        });
    }

    Ok(Json(scenes))
}

/// GET /api/campaigns/:campaign_id/edit-history
///
/// The append-only ledger, ordered by commit time ascending.
pub async fn get_edit_history(
    State(state): State<AppState>,
    Path(campaign_id): Path<String>,
) -> ApiResult<Json<EditHistoryResponse>> {
    let id = CampaignId::from_string(campaign_id);
    let campaign = state.campaigns.get(&id).await?;

    Ok(Json(EditHistoryResponse {
        records: campaign.edit_history.records.clone(),
        total_cost: campaign.edit_history.total_cost,
        edit_count: campaign.edit_history.edit_count,
    }))
}
