//! Edit submission service.
//!
//! Owns the request-acceptance path: validate, claim the campaign's
//! edit lease, write the queued status row, enqueue. The lease claim is
//! the serialization point; of two concurrent submissions exactly one
//! wins and the other gets a conflict.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use adreel_db::CampaignStore;
use adreel_models::{
    CampaignId, Cost, EditJob, JobId, JobStatusSnapshot, MAX_INSTRUCTION_LEN,
};
use adreel_queue::{EditJobRequest, JobSink, JobStatusStore, QueueError};

use crate::error::{ApiError, ApiResult};
use crate::metrics;

/// Fixed duration estimate quoted at submission, in seconds. Generation
/// dominates and does not scale with instruction length.
pub const ESTIMATED_DURATION_SECS: u64 = 180;

/// Outcome of an accepted submission.
#[derive(Debug, Clone)]
pub struct AcceptedEdit {
    pub job_id: JobId,
    pub estimated_cost: Cost,
    pub estimated_duration_secs: u64,
}

#[derive(Clone)]
pub struct EditService {
    campaigns: Arc<dyn CampaignStore>,
    status: Arc<dyn JobStatusStore>,
    sink: Arc<dyn JobSink>,
    lease_ttl: Duration,
}

impl EditService {
    pub fn new(
        campaigns: Arc<dyn CampaignStore>,
        status: Arc<dyn JobStatusStore>,
        sink: Arc<dyn JobSink>,
        lease_ttl: Duration,
    ) -> Self {
        Self {
            campaigns,
            status,
            sink,
            lease_ttl,
        }
    }

    /// Accept one scene-edit request.
    pub async fn submit(
        &self,
        campaign_id: &CampaignId,
        scene_index: u32,
        instruction: &str,
    ) -> ApiResult<AcceptedEdit> {
        let instruction = instruction.trim();
        if instruction.is_empty() {
            metrics::record_edit_rejected("empty_instruction");
            return Err(ApiError::validation("instruction must not be empty"));
        }
        if instruction.chars().count() > MAX_INSTRUCTION_LEN {
            metrics::record_edit_rejected("instruction_too_long");
            return Err(ApiError::validation(format!(
                "instruction exceeds {MAX_INSTRUCTION_LEN} characters"
            )));
        }

        let campaign = self.campaigns.get(campaign_id).await?;
        if scene_index >= campaign.scene_count() {
            metrics::record_edit_rejected("scene_index_out_of_range");
            return Err(ApiError::validation(format!(
                "scene index {} out of range (campaign has {} scenes)",
                scene_index,
                campaign.scene_count()
            )));
        }

        let job = EditJob::new(campaign_id.clone(), scene_index, instruction);

        // Serialization point: exactly one concurrent submission wins
        self.campaigns
            .acquire_lease(campaign_id, &job.id, "api", self.lease_ttl)
            .await?;

        self.status.put(&JobStatusSnapshot::queued(&job)).await?;

        let request = EditJobRequest::from_job(&job);
        if let Err(e) = self.sink.submit(&request).await {
            // Undo acceptance so the campaign is not wedged
            self.campaigns
                .release_lease(campaign_id, &job.id)
                .await
                .ok();
            if let Ok(Some(mut snapshot)) = self.status.get(&job.id).await {
                snapshot.fail("failed to enqueue edit job", Cost::ZERO);
                self.status.put(&snapshot).await.ok();
            }
            return Err(e.into());
        }

        metrics::record_edit_submitted();
        info!(
            job_id = %job.id,
            campaign_id = %campaign_id,
            scene_index,
            "Accepted edit job"
        );

        Ok(AcceptedEdit {
            job_id: job.id,
            estimated_cost: Cost::estimate_edit(),
            estimated_duration_secs: ESTIMATED_DURATION_SECS,
        })
    }

    /// Request cancellation of a job; honored at the next cancellable
    /// stage boundary.
    pub async fn cancel(&self, job_id: &JobId) -> ApiResult<()> {
        match self.status.request_cancel(job_id).await {
            Ok(()) => {
                metrics::record_job_canceled();
                info!(job_id = %job_id, "Cancellation requested");
                Ok(())
            }
            Err(QueueError::StatusNotFound(id)) => {
                Err(ApiError::not_found(format!("job {id} not found")))
            }
            Err(e) => Err(e.into()),
        }
    }
}
