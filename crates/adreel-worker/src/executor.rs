//! Worker pool driving the pipeline from the queue.
//!
//! One consume loop feeds a semaphore-bounded set of job tasks. Each
//! job gets a companion heartbeat task that also renews the campaign's
//! edit lease, so a crashed worker stops renewing and the stale-job
//! detector reclaims the lease. Messages are acknowledged after the
//! pipeline finishes either way: there is no redelivery.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Semaphore};
use tracing::{error, info, warn};

use adreel_db::{CampaignStore, DbError};
use adreel_models::{CampaignId, JobId};
use adreel_queue::{EditJobRequest, JobQueue, JobStatusStore};

use crate::config::WorkerConfig;
use crate::error::EditError;
use crate::pipeline::EditPipeline;

/// Blocking window for one XREADGROUP call.
const CONSUME_BLOCK_MS: u64 = 5000;

pub struct JobExecutor {
    queue: Arc<JobQueue>,
    pipeline: Arc<EditPipeline>,
    campaigns: Arc<dyn CampaignStore>,
    status: Arc<dyn JobStatusStore>,
    config: WorkerConfig,
    semaphore: Arc<Semaphore>,
}

impl JobExecutor {
    pub fn new(
        queue: Arc<JobQueue>,
        pipeline: Arc<EditPipeline>,
        campaigns: Arc<dyn CampaignStore>,
        status: Arc<dyn JobStatusStore>,
        config: WorkerConfig,
    ) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.max_concurrent_jobs));
        Self {
            queue,
            pipeline,
            campaigns,
            status,
            config,
            semaphore,
        }
    }

    /// Consume and process jobs until shutdown is signaled, then drain.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            consumer = %self.config.consumer_name,
            max_concurrent = self.config.max_concurrent_jobs,
            "Worker started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                _ = shutdown.changed() => break,
                result = self.queue.consume(
                    &self.config.consumer_name,
                    CONSUME_BLOCK_MS,
                    self.config.max_concurrent_jobs,
                ) => {
                    match result {
                        Ok(jobs) => {
                            for (message_id, request) in jobs {
                                self.spawn_job(message_id, request).await;
                            }
                        }
                        Err(e) => {
                            warn!("Queue consume failed: {e}");
                            tokio::time::sleep(Duration::from_secs(1)).await;
                        }
                    }
                }
            }
        }

        self.drain().await;
    }

    /// Run one job on its own task once a pool slot frees up.
    async fn spawn_job(&self, message_id: String, request: EditJobRequest) {
        let permit = match self.semaphore.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => return,
        };

        let pipeline = self.pipeline.clone();
        let queue = self.queue.clone();
        let campaigns = self.campaigns.clone();
        let status = self.status.clone();
        let config = self.config.clone();

        tokio::spawn(async move {
            let _permit = permit;

            let heartbeat = tokio::spawn(heartbeat_loop(
                status,
                campaigns,
                request.job_id.clone(),
                request.campaign_id.clone(),
                config.heartbeat_interval,
                config.lease_ttl,
            ));

            let timeout_secs = config.job_timeout.as_secs();
            match tokio::time::timeout(config.job_timeout, pipeline.execute(&request)).await {
                // execute() already ran the failure path on Err
                Ok(_) => {}
                Err(_) => {
                    pipeline
                        .fail_job(&request, &EditError::TimedOut(timeout_secs))
                        .await;
                }
            }
            heartbeat.abort();

            if let Err(e) = queue.ack(&message_id).await {
                warn!("Failed to ack message {message_id}: {e}");
            }
        });
    }

    /// Wait for in-flight jobs, up to the shutdown timeout.
    async fn drain(&self) {
        info!("Draining in-flight jobs");
        let all = self.config.max_concurrent_jobs as u32;
        match tokio::time::timeout(self.config.shutdown_timeout, self.semaphore.acquire_many(all))
            .await
        {
            Ok(_) => info!("All jobs drained"),
            Err(_) => warn!("Shutdown timeout elapsed with jobs still running"),
        }
    }
}

/// Heartbeat the status row and renew the edit lease until aborted.
///
/// A definitive renewal refusal ends the loop: the lease is gone or
/// held by a rival job, and the pipeline's own fencing checks will
/// fail the job rather than let it commit.
async fn heartbeat_loop(
    status: Arc<dyn JobStatusStore>,
    campaigns: Arc<dyn CampaignStore>,
    job_id: JobId,
    campaign_id: CampaignId,
    interval: Duration,
    lease_ttl: Duration,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.tick().await;
    loop {
        ticker.tick().await;
        if let Err(e) = status.heartbeat(&job_id).await {
            warn!(job_id = %job_id, "Heartbeat write failed: {e}");
        }
        match campaigns.renew_lease(&campaign_id, &job_id, lease_ttl).await {
            Ok(_) => {}
            Err(DbError::LeaseNotHeld(_)) => {
                error!(job_id = %job_id, campaign_id = %campaign_id, "Edit lease lost, stopping renewals");
                return;
            }
            Err(e) => warn!(job_id = %job_id, "Lease renewal failed: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adreel_db::MemoryCampaignStore;
    use adreel_models::{Campaign, EditJob, JobStatusSnapshot, Scene, SceneRole};
    use adreel_queue::MemoryStatusStore;
    use chrono::Utc;

    #[tokio::test]
    async fn test_heartbeat_loop_renews_status_and_lease() {
        let status: Arc<dyn JobStatusStore> = Arc::new(MemoryStatusStore::new());
        let campaigns = Arc::new(MemoryCampaignStore::new());

        let scenes = vec![Scene::new(0, SceneRole::Hook, 5.0, "s", "campaigns/c/scenes/0.mp4")];
        let campaign = Campaign::new("c", scenes, "campaigns/c/final.mp4");
        let campaign_id = campaign.id.clone();
        campaigns.insert(campaign).await;

        let job = EditJob::new(campaign_id.clone(), 0, "edit");
        let job_id = job.id.clone();
        status.put(&JobStatusSnapshot::queued(&job)).await.unwrap();
        campaigns
            .acquire_lease(&campaign_id, &job_id, "w", Duration::from_secs(60))
            .await
            .unwrap();

        let handle = tokio::spawn(heartbeat_loop(
            status.clone(),
            campaigns.clone(),
            job_id.clone(),
            campaign_id.clone(),
            Duration::from_millis(10),
            Duration::from_secs(60),
        ));
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.abort();

        let snapshot = status.get(&job_id).await.unwrap().unwrap();
        assert!(snapshot.last_heartbeat.is_some());

        let lease = campaigns
            .get(&campaign_id)
            .await
            .unwrap()
            .active_edit_job
            .unwrap();
        assert!(lease.expires_at > Utc::now() + chrono::Duration::seconds(55));
    }

    #[tokio::test]
    async fn test_heartbeat_loop_stops_when_lease_is_lost() {
        let status: Arc<dyn JobStatusStore> = Arc::new(MemoryStatusStore::new());
        let campaigns = Arc::new(MemoryCampaignStore::new());

        let scenes = vec![Scene::new(0, SceneRole::Hook, 5.0, "s", "campaigns/c/scenes/0.mp4")];
        let campaign = Campaign::new("c", scenes, "campaigns/c/final.mp4");
        let campaign_id = campaign.id.clone();
        campaigns.insert(campaign).await;

        let job = EditJob::new(campaign_id.clone(), 0, "edit");
        let job_id = job.id.clone();
        status.put(&JobStatusSnapshot::queued(&job)).await.unwrap();

        // A rival job holds the lease, so renewal is refused outright
        let rival = adreel_models::JobId::new();
        campaigns
            .acquire_lease(&campaign_id, &rival, "api", Duration::from_secs(60))
            .await
            .unwrap();

        let handle = tokio::spawn(heartbeat_loop(
            status.clone(),
            campaigns.clone(),
            job_id,
            campaign_id.clone(),
            Duration::from_millis(10),
            Duration::from_secs(60),
        ));

        // The loop returns on its own instead of renewing forever
        tokio::time::timeout(Duration::from_millis(500), handle)
            .await
            .expect("heartbeat loop should stop")
            .unwrap();

        // The rival's lease was never touched
        let lease = campaigns
            .get(&campaign_id)
            .await
            .unwrap()
            .active_edit_job
            .unwrap();
        assert_eq!(lease.job_id, rival);
    }
}
