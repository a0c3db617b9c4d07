//! Background recovery for jobs whose worker stopped responding.
//!
//! Workers heartbeat their status row and renew the campaign's edit
//! lease while running. When a worker dies mid-job, the row goes quiet:
//! this detector fails the job and releases the lease so the campaign
//! is editable again. Staged objects are left for storage lifecycle
//! cleanup; canonical objects were never touched outside a commit.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::interval;
use tracing::{error, info, warn};

use adreel_db::CampaignStore;
use adreel_models::{JobId, STALE_GRACE_PERIOD_SECS, STALE_THRESHOLD_SECS};
use adreel_queue::JobStatusStore;

use crate::metrics;

/// Interval between detection runs.
const DETECTION_INTERVAL: Duration = Duration::from_secs(30);

const STALE_ERROR: &str =
    "Edit processing stopped responding. The worker may have crashed. Please resubmit.";

/// Stale job detector service.
pub struct StaleJobDetector {
    status: Arc<dyn JobStatusStore>,
    campaigns: Arc<dyn CampaignStore>,
    enabled: bool,
}

impl StaleJobDetector {
    pub fn new(status: Arc<dyn JobStatusStore>, campaigns: Arc<dyn CampaignStore>) -> Self {
        let enabled = std::env::var("ENABLE_STALE_DETECTION")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(true);

        Self {
            status,
            campaigns,
            enabled,
        }
    }

    /// Run the detection loop forever; spawn as a background task.
    pub async fn run(&self) {
        if !self.enabled {
            info!("Stale job detection is disabled");
            return;
        }

        info!("Starting stale job detector (interval: {:?})", DETECTION_INTERVAL);
        let mut ticker = interval(DETECTION_INTERVAL);

        loop {
            ticker.tick().await;
            if let Err(e) = self.check_once().await {
                error!("Stale job detection error: {e}");
            }
        }
    }

    /// One detection cycle. Returns (stale, recovered) counts.
    pub async fn check_once(&self) -> anyhow::Result<(u32, u32)> {
        let active = self.status.active_jobs().await?;
        if active.is_empty() {
            return Ok((0, 0));
        }

        let mut stale_count = 0u32;
        let mut recovered_count = 0u32;

        for job_id in active {
            let Some(snapshot) = self.status.get(&job_id).await? else {
                // Status row expired while still marked active
                self.status.remove_active(&job_id).await.ok();
                continue;
            };

            if snapshot.is_terminal() {
                self.status.remove_active(&job_id).await.ok();
                continue;
            }

            if !snapshot.is_stale(STALE_THRESHOLD_SECS, STALE_GRACE_PERIOD_SECS) {
                continue;
            }

            stale_count += 1;
            warn!(
                job_id = %job_id,
                campaign_id = %snapshot.campaign_id,
                last_heartbeat = ?snapshot.last_heartbeat,
                started_at = %snapshot.started_at,
                "Detected stale job (no heartbeat)"
            );

            match self.recover(&job_id).await {
                Ok(()) => {
                    recovered_count += 1;
                    metrics::record_stale_job_recovered();
                    info!(job_id = %job_id, "Recovered stale job");
                }
                Err(e) => error!(job_id = %job_id, "Failed to recover stale job: {e}"),
            }
        }

        if stale_count > 0 {
            info!(
                "Stale job detection complete: {} stale, {} recovered",
                stale_count, recovered_count
            );
        }

        Ok((stale_count, recovered_count))
    }

    /// Fail the job and free the campaign's edit slot.
    async fn recover(&self, job_id: &JobId) -> anyhow::Result<()> {
        let Some(mut snapshot) = self.status.get(job_id).await? else {
            return Ok(());
        };

        let cost = snapshot.cost;
        snapshot.fail(STALE_ERROR, cost);
        self.status.put(&snapshot).await?;
        self.status.remove_active(job_id).await?;

        if let Err(e) = self
            .campaigns
            .release_lease(&snapshot.campaign_id, job_id)
            .await
        {
            // The lease may already have lapsed; the next acquirer
            // reclaims it either way
            warn!(campaign_id = %snapshot.campaign_id, "Lease release during recovery failed: {e}");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adreel_db::MemoryCampaignStore;
    use adreel_models::{Campaign, Cost, EditJob, EditStage, JobStatusSnapshot, Scene, SceneRole};
    use adreel_queue::MemoryStatusStore;
    use chrono::Utc;

    async fn seed() -> (StaleJobDetector, Arc<MemoryStatusStore>, Arc<MemoryCampaignStore>, adreel_models::CampaignId) {
        let status = Arc::new(MemoryStatusStore::new());
        let campaigns = Arc::new(MemoryCampaignStore::new());

        let scenes = vec![Scene::new(0, SceneRole::Hook, 5.0, "s", "campaigns/c/scenes/0.mp4")];
        let campaign = Campaign::new("c", scenes, "campaigns/c/final.mp4");
        let campaign_id = campaign.id.clone();
        campaigns.insert(campaign).await;

        let detector = StaleJobDetector {
            status: status.clone(),
            campaigns: campaigns.clone(),
            enabled: true,
        };
        (detector, status, campaigns, campaign_id)
    }

    #[tokio::test]
    async fn test_stale_job_is_failed_and_lease_released() {
        let (detector, status, campaigns, campaign_id) = seed().await;

        let job = EditJob::new(campaign_id.clone(), 0, "edit");
        campaigns
            .acquire_lease(&campaign_id, &job.id, "api", Duration::from_secs(600))
            .await
            .unwrap();

        // Old job, never heartbeated
        let mut snapshot = JobStatusSnapshot::queued(&job);
        snapshot.started_at = Utc::now() - chrono::Duration::seconds(STALE_GRACE_PERIOD_SECS + 60);
        snapshot.advance(EditStage::RegeneratingScene, Cost(21));
        status.put(&snapshot).await.unwrap();

        let (stale, recovered) = detector.check_once().await.unwrap();
        assert_eq!((stale, recovered), (1, 1));

        let snapshot = status.get(&job.id).await.unwrap().unwrap();
        assert_eq!(snapshot.stage, EditStage::Failed);
        assert_eq!(snapshot.cost, Cost(21));

        let campaign = campaigns.get(&campaign_id).await.unwrap();
        assert!(!campaign.has_active_edit());
    }

    #[tokio::test]
    async fn test_healthy_job_is_left_alone() {
        let (detector, status, _campaigns, campaign_id) = seed().await;

        let job = EditJob::new(campaign_id, 0, "edit");
        let mut snapshot = JobStatusSnapshot::queued(&job);
        snapshot.record_heartbeat();
        status.put(&snapshot).await.unwrap();

        let (stale, recovered) = detector.check_once().await.unwrap();
        assert_eq!((stale, recovered), (0, 0));

        let snapshot = status.get(&job.id).await.unwrap().unwrap();
        assert!(!snapshot.is_terminal());
    }
}
