//! Queue payload for an accepted edit request.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use adreel_models::{CampaignId, Cost, EditJob, JobId};

/// The message the API enqueues and a worker consumes.
///
/// Carries everything the pipeline needs so the worker never has to
/// trust request-time state beyond the campaign document itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditJobRequest {
    /// Unique job ID (assigned at submission)
    pub job_id: JobId,

    /// Campaign being edited
    pub campaign_id: CampaignId,

    /// Target scene index (validated against the campaign at submit)
    pub scene_index: u32,

    /// The user's free-text edit instruction
    pub instruction: String,

    /// Cost quoted to the caller at submission
    pub estimated_cost: Cost,

    /// When the request was accepted
    pub submitted_at: DateTime<Utc>,
}

impl EditJobRequest {
    /// Build the queue payload from an accepted job.
    pub fn from_job(job: &EditJob) -> Self {
        Self {
            job_id: job.id.clone(),
            campaign_id: job.campaign_id.clone(),
            scene_index: job.scene_index,
            instruction: job.instruction.clone(),
            estimated_cost: Cost::estimate_edit(),
            submitted_at: job.created_at,
        }
    }
}
