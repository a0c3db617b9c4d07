//! Canonical and staging key layout.
//!
//! Layout (path-addressed, versionless):
//! - `campaigns/{campaign_id}/scenes/{index}.mp4`
//! - `campaigns/{campaign_id}/final.mp4`
//! - `staging/{job_id}/...` (never externally addressable)

use adreel_models::{CampaignId, JobId};

use crate::error::{StorageError, StorageResult};

/// Prefix under which staged objects live. Keys below this prefix are
/// invisible to canonical readers and are never resolved to URLs.
pub const STAGING_PREFIX: &str = "staging/";

/// Key layout helper for one campaign.
#[derive(Debug, Clone)]
pub struct CampaignPaths {
    campaign_id: CampaignId,
}

impl CampaignPaths {
    pub fn new(campaign_id: CampaignId) -> Self {
        Self { campaign_id }
    }

    /// Canonical key of a scene's rendered clip.
    pub fn scene_key(&self, index: u32) -> String {
        format!("campaigns/{}/scenes/{}.mp4", self.campaign_id, index)
    }

    /// Canonical key of the rendered final video.
    pub fn final_key(&self) -> String {
        format!("campaigns/{}/final.mp4", self.campaign_id)
    }

    /// Staging key for a job's regenerated scene clip.
    pub fn staged_scene_key(&self, job_id: &JobId) -> String {
        format!("{}{}/scene.mp4", STAGING_PREFIX, job_id)
    }

    /// Staging key holding the prior canonical scene bytes during commit.
    /// Kept until the whole commit succeeds so the scene replace can be
    /// rolled back.
    pub fn prior_scene_key(&self, job_id: &JobId) -> String {
        format!("{}{}/prior_scene.mp4", STAGING_PREFIX, job_id)
    }

    /// Staging key for a job's re-rendered final video.
    pub fn staged_final_key(&self, job_id: &JobId) -> String {
        format!("{}{}/final.mp4", STAGING_PREFIX, job_id)
    }

    /// Staging key holding the prior canonical final video during
    /// commit, symmetric to [`prior_scene_key`](Self::prior_scene_key).
    pub fn prior_final_key(&self, job_id: &JobId) -> String {
        format!("{}{}/prior_final.mp4", STAGING_PREFIX, job_id)
    }
}

/// Whether a key lives under the staging prefix.
pub fn is_staged(key: &str) -> bool {
    key.starts_with(STAGING_PREFIX)
}

/// Reject staged keys where only canonical ones are allowed.
pub fn require_canonical(key: &str) -> StorageResult<()> {
    if is_staged(key) {
        return Err(StorageError::invalid_key(format!(
            "staged key used in canonical position: {key}"
        )));
    }
    Ok(())
}

/// Reject canonical keys where only staged ones are allowed.
pub fn require_staged(key: &str) -> StorageResult<()> {
    if !is_staged(key) {
        return Err(StorageError::invalid_key(format!(
            "canonical key used in staging position: {key}"
        )));
    }
    Ok(())
}
