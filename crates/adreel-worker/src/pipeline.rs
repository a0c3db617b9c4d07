//! The scene-edit pipeline.
//!
//! One run per accepted edit job, driven stage by stage:
//! prompt mutation, scene regeneration, staging, downloading the
//! remaining scenes, re-rendering the final video, then an atomic
//! commit. Every stage transition is written to the status store so
//! pollers observe forward motion; a cancellation request is honored
//! at stage boundaries until downloads begin, after which the run is
//! carried through to avoid aborting mid-write.
//!
//! Failure discipline: canonical objects and the ledger are only
//! touched inside [`commit`](EditPipeline::commit), and the prior
//! scene and final bytes are parked in staging until the whole commit
//! succeeds so every canonical replace can be rolled back. Any failure
//! ends with compensating cleanup of staged objects, leaving the
//! campaign exactly as it was apart from the cost already incurred.
//! The campaign's edit lease fences the whole run: it is renewed at
//! pickup and re-verified at the commit boundary, so a job whose lease
//! lapsed or was reclaimed never overwrites a rival's work.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{info, warn};

use adreel_ai_client::{
    AiResult, GeneratedClip, GenerationRequest, MediaGenerationClient, MutatedPrompt,
    PromptMutationClient, PromptMutationRequest,
};
use adreel_db::{CampaignStore, DbError};
use adreel_models::{
    Cost, EditId, EditJob, EditRecord, EditStage, JobId, JobStatusSnapshot, Scene,
};
use adreel_queue::{EditJobRequest, JobStatusStore};
use adreel_storage::{CampaignPaths, ObjectStore};

use crate::error::{EditError, EditResult};
use crate::render::Compositor;
use crate::retry::retry_transient;

/// Seam over the prompt mutation client so the pipeline is testable
/// without the network.
#[async_trait]
pub trait PromptMutator: Send + Sync {
    async fn mutate(&self, request: &PromptMutationRequest) -> AiResult<MutatedPrompt>;
}

#[async_trait]
impl PromptMutator for PromptMutationClient {
    async fn mutate(&self, request: &PromptMutationRequest) -> AiResult<MutatedPrompt> {
        PromptMutationClient::mutate(self, request).await
    }
}

/// Seam over the media generation client.
#[async_trait]
pub trait SceneGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> AiResult<GeneratedClip>;
}

#[async_trait]
impl SceneGenerator for MediaGenerationClient {
    async fn generate(&self, request: &GenerationRequest) -> AiResult<GeneratedClip> {
        MediaGenerationClient::generate(self, request).await
    }
}

/// Runs edit jobs end to end.
pub struct EditPipeline {
    campaigns: Arc<dyn CampaignStore>,
    storage: Arc<dyn ObjectStore>,
    status: Arc<dyn JobStatusStore>,
    mutator: Arc<dyn PromptMutator>,
    generator: Arc<dyn SceneGenerator>,
    compositor: Arc<dyn Compositor>,
    lease_ttl: Duration,
}

impl EditPipeline {
    pub fn new(
        campaigns: Arc<dyn CampaignStore>,
        storage: Arc<dyn ObjectStore>,
        status: Arc<dyn JobStatusStore>,
        mutator: Arc<dyn PromptMutator>,
        generator: Arc<dyn SceneGenerator>,
        compositor: Arc<dyn Compositor>,
        lease_ttl: Duration,
    ) -> Self {
        Self {
            campaigns,
            storage,
            status,
            mutator,
            generator,
            compositor,
            lease_ttl,
        }
    }

    /// Run one edit job; on failure, run compensating cleanup and mark
    /// the job failed before returning the error.
    pub async fn execute(&self, request: &EditJobRequest) -> EditResult<()> {
        match self.run(request).await {
            Ok(()) => Ok(()),
            Err(e) => {
                self.fail_job(request, &e).await;
                Err(e)
            }
        }
    }

    /// Run one edit job end to end.
    pub async fn run(&self, request: &EditJobRequest) -> EditResult<()> {
        info!(
            job_id = %request.job_id,
            campaign_id = %request.campaign_id,
            scene_index = request.scene_index,
            "Starting edit pipeline"
        );

        // Fencing at pickup: a lease that lapsed while the job sat in
        // the queue means another job may already own the campaign.
        self.verify_lease(request).await?;

        let campaign = self.campaigns.get(&request.campaign_id).await?;
        let scene = campaign
            .scene(request.scene_index)
            .cloned()
            .ok_or_else(|| {
                EditError::validation(format!(
                    "scene index {} out of range for campaign with {} scenes",
                    request.scene_index,
                    campaign.scene_count()
                ))
            })?;
        let paths = CampaignPaths::new(campaign.id.clone());

        let mut snapshot = match self.status.get(&request.job_id).await? {
            Some(snapshot) => snapshot,
            None => {
                // Resubmitted message without its status row; rebuild it
                let mut job = EditJob::new(
                    request.campaign_id.clone(),
                    request.scene_index,
                    request.instruction.clone(),
                );
                job.id = request.job_id.clone();
                job.created_at = request.submitted_at;
                JobStatusSnapshot::queued(&job)
            }
        };
        let mut cost = Cost::ZERO;

        // Stage cost is incurred when the stage runs, success or not,
        // so a failed job still reports what was already billed.
        cost += Cost::PROMPT_MUTATION;
        self.enter_stage(&mut snapshot, EditStage::MutatingPrompt, cost)
            .await?;
        let mutation = PromptMutationRequest {
            original_description: scene.description.clone(),
            instruction: request.instruction.clone(),
            style_context: campaign.style_context.clone(),
        };
        let mutated = retry_transient("prompt mutation", || self.mutator.mutate(&mutation))
            .await
            .map_err(EditError::PromptMutation)?;

        cost += Cost::SCENE_GENERATION;
        self.enter_stage(&mut snapshot, EditStage::RegeneratingScene, cost)
            .await?;
        let generation = GenerationRequest {
            description: mutated.revised_description.clone(),
            duration_secs: scene.target_duration_secs,
            style_context: campaign.style_context.clone(),
        };
        let clip = retry_transient("scene generation", || self.generator.generate(&generation))
            .await
            .map_err(EditError::Generation)?;

        cost += Cost::STORAGE;
        self.enter_stage(&mut snapshot, EditStage::StagingScene, cost)
            .await?;
        let staged_scene = paths.staged_scene_key(&request.job_id);
        self.storage.stage_put(&staged_scene, clip.bytes.clone()).await?;

        // Last boundary at which cancellation is honored
        self.enter_stage(&mut snapshot, EditStage::DownloadingAllScenes, cost)
            .await?;
        let mut clips = Vec::with_capacity(campaign.scenes.len());
        for s in &campaign.scenes {
            if s.index == request.scene_index {
                clips.push(clip.bytes.clone());
            } else {
                clips.push(self.storage.get(&s.clip_key).await?);
            }
        }

        self.enter_stage(&mut snapshot, EditStage::RerenderingFinal, cost)
            .await?;
        let final_bytes = self.compositor.compose(&clips).await?;
        let staged_final = paths.staged_final_key(&request.job_id);
        self.storage.stage_put(&staged_final, final_bytes).await?;

        self.enter_stage(&mut snapshot, EditStage::Committing, cost)
            .await?;
        self.commit(request, &campaign.final_video_key, &scene, &mutated, cost, &paths, &snapshot)
            .await?;

        snapshot.advance(EditStage::Completed, cost);
        self.status.put(&snapshot).await?;
        self.status.remove_active(&request.job_id).await?;
        self.campaigns
            .release_lease(&request.campaign_id, &request.job_id)
            .await?;

        info!(
            job_id = %request.job_id,
            cost = cost.0,
            "Edit pipeline completed"
        );
        Ok(())
    }

    /// Advance the status snapshot to a new stage, honoring a pending
    /// cancellation request while the current stage still allows it.
    async fn enter_stage(
        &self,
        snapshot: &mut JobStatusSnapshot,
        stage: EditStage,
        cost: Cost,
    ) -> EditResult<()> {
        if snapshot.stage.is_cancellable() {
            if let Some(current) = self.status.get(&snapshot.job_id).await? {
                snapshot.cancel_requested = current.cancel_requested;
                snapshot.last_heartbeat = current.last_heartbeat;
            }
            if snapshot.cancel_requested {
                info!(
                    job_id = %snapshot.job_id,
                    "Cancellation honored at the {stage} boundary"
                );
                return Err(EditError::Canceled);
            }
        }
        snapshot.advance(stage, cost);
        self.status.put(snapshot).await?;
        Ok(())
    }

    /// Promote staged artifacts to canonical and record the edit.
    ///
    /// Order matters: the prior scene and final bytes are parked first
    /// so every canonical replace can be undone if a later step fails,
    /// keeping scene and final video consistent with each other either
    /// way. The lease is re-verified at this boundary; everything
    /// before it only touched job-private staging.
    #[allow(clippy::too_many_arguments)]
    async fn commit(
        &self,
        request: &EditJobRequest,
        final_key: &str,
        scene: &Scene,
        mutated: &MutatedPrompt,
        cost: Cost,
        paths: &CampaignPaths,
        snapshot: &JobStatusSnapshot,
    ) -> EditResult<()> {
        self.verify_lease(request).await?;

        let prior_scene_key = paths.prior_scene_key(&request.job_id);
        let prior_final_key = paths.prior_final_key(&request.job_id);
        let staged_scene = paths.staged_scene_key(&request.job_id);
        let staged_final = paths.staged_final_key(&request.job_id);

        let prior_scene = self
            .storage
            .get(&scene.clip_key)
            .await
            .map_err(|e| EditError::commit(format!("prior scene park failed: {e}")))?;
        self.storage
            .stage_put(&prior_scene_key, prior_scene)
            .await
            .map_err(|e| EditError::commit(format!("prior scene park failed: {e}")))?;
        let prior_final = self
            .storage
            .get(final_key)
            .await
            .map_err(|e| EditError::commit(format!("prior final park failed: {e}")))?;
        self.storage
            .stage_put(&prior_final_key, prior_final)
            .await
            .map_err(|e| EditError::commit(format!("prior final park failed: {e}")))?;

        self.storage
            .canonical_replace(&staged_scene, &scene.clip_key)
            .await
            .map_err(|e| EditError::commit(format!("scene replace failed: {e}")))?;

        if let Err(e) = self
            .storage
            .canonical_replace(&staged_final, final_key)
            .await
        {
            self.restore_canonical(&prior_scene_key, &scene.clip_key).await;
            return Err(EditError::commit(format!("final video replace failed: {e}")));
        }

        if let Err(e) = self.save_campaign(request, mutated, cost, snapshot).await {
            self.restore_canonical(&prior_scene_key, &scene.clip_key).await;
            self.restore_canonical(&prior_final_key, final_key).await;
            return Err(EditError::commit(format!("campaign save failed: {e}")));
        }

        self.cleanup_staging(&request.job_id, paths).await;
        Ok(())
    }

    /// Fencing check: renew the job's edit lease, proving this worker
    /// still owns the campaign. The Redis renewal script only extends a
    /// lease whose holder matches, so a lapsed or reclaimed lease fails
    /// here instead of letting two jobs mutate the same campaign.
    async fn verify_lease(&self, request: &EditJobRequest) -> EditResult<()> {
        self.campaigns
            .renew_lease(&request.campaign_id, &request.job_id, self.lease_ttl)
            .await
            .map_err(|e| match e {
                DbError::LeaseNotHeld(_) => EditError::commit(format!(
                    "edit lease for campaign {} is no longer held by job {}",
                    request.campaign_id, request.job_id
                )),
                other => EditError::Db(other),
            })?;
        Ok(())
    }

    /// Apply the edit to the campaign document, append the ledger
    /// record and clear the active edit, all in one document write. A
    /// crash after this write leaves the edit fully committed; only
    /// the Redis lease key remains for [`release_lease`] to reap.
    ///
    /// [`release_lease`]: CampaignStore::release_lease
    async fn save_campaign(
        &self,
        request: &EditJobRequest,
        mutated: &MutatedPrompt,
        cost: Cost,
        snapshot: &JobStatusSnapshot,
    ) -> EditResult<()> {
        let mut campaign = self.campaigns.get(&request.campaign_id).await?;
        let scene = campaign.scene_mut(request.scene_index).ok_or_else(|| {
            EditError::validation(format!("scene {} vanished mid-commit", request.scene_index))
        })?;

        let original_description = scene.description.clone();
        scene.apply_edit(mutated.revised_description.clone());

        campaign.edit_history.append(EditRecord {
            edit_id: EditId::new(),
            committed_at: Utc::now(),
            scene_index: request.scene_index,
            instruction: request.instruction.clone(),
            original_description,
            modified_description: mutated.revised_description.clone(),
            change_summary: mutated.change_summary.clone(),
            cost,
            duration_secs: (Utc::now() - snapshot.started_at).num_milliseconds() as f64 / 1000.0,
        });
        campaign.active_edit_job = None;

        self.campaigns.put(&campaign).await?;
        Ok(())
    }

    /// Restore a canonical object from its parked prior bytes. Best
    /// effort: if this also fails, the stale-job detector surfaces the
    /// divergence.
    async fn restore_canonical(&self, prior_key: &str, canonical_key: &str) {
        warn!("Rolling back to prior canonical content: {canonical_key}");
        if let Err(e) = self.storage.canonical_replace(prior_key, canonical_key).await {
            warn!("Rollback failed, canonical state may diverge: {e}");
        }
    }

    /// Delete every staged object this job may have created. Each
    /// delete is idempotent, so this is safe at any point.
    async fn cleanup_staging(&self, job_id: &JobId, paths: &CampaignPaths) {
        for key in [
            paths.staged_scene_key(job_id),
            paths.staged_final_key(job_id),
            paths.prior_scene_key(job_id),
            paths.prior_final_key(job_id),
        ] {
            if let Err(e) = self.storage.delete_staged(&key).await {
                warn!("Failed to delete staged object {key}: {e}");
            }
        }
    }

    /// Compensating path for any failed or timed-out job: clean staged
    /// objects, freeze the status snapshot as failed with the cost
    /// already incurred, and release the campaign's edit lease.
    pub async fn fail_job(&self, request: &EditJobRequest, error: &EditError) {
        warn!(
            job_id = %request.job_id,
            campaign_id = %request.campaign_id,
            "Edit job failed: {error}"
        );

        let paths = CampaignPaths::new(request.campaign_id.clone());
        self.cleanup_staging(&request.job_id, &paths).await;

        match self.status.get(&request.job_id).await {
            Ok(Some(mut snapshot)) => {
                if !snapshot.is_terminal() {
                    let cost = snapshot.cost;
                    snapshot.fail(error.to_string(), cost);
                    if let Err(e) = self.status.put(&snapshot).await {
                        warn!(job_id = %request.job_id, "Failed to store failure status: {e}");
                    }
                }
            }
            Ok(None) => {}
            Err(e) => warn!(job_id = %request.job_id, "Failed to load status for failure: {e}"),
        }
        if let Err(e) = self.status.remove_active(&request.job_id).await {
            warn!(job_id = %request.job_id, "Failed to clear active marker: {e}");
        }

        if let Err(e) = self
            .campaigns
            .release_lease(&request.campaign_id, &request.job_id)
            .await
        {
            warn!(campaign_id = %request.campaign_id, "Failed to release edit lease: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use adreel_ai_client::AiError;
    use adreel_db::{DbError, DbResult, MemoryCampaignStore};
    use adreel_models::{Campaign, CampaignId, EditLease, SceneRole};
    use adreel_queue::MemoryStatusStore;
    use adreel_storage::{MemoryStore, StorageError, StorageResult};

    struct FakeMutator;

    #[async_trait]
    impl PromptMutator for FakeMutator {
        async fn mutate(&self, request: &PromptMutationRequest) -> AiResult<MutatedPrompt> {
            Ok(MutatedPrompt {
                revised_description: format!(
                    "{}, {}",
                    request.original_description, request.instruction
                ),
                change_summary: format!("Applied: {}", request.instruction),
            })
        }
    }

    struct FakeGenerator;

    #[async_trait]
    impl SceneGenerator for FakeGenerator {
        async fn generate(&self, request: &GenerationRequest) -> AiResult<GeneratedClip> {
            Ok(GeneratedClip {
                bytes: format!("clip:{}", request.description).into_bytes(),
            })
        }
    }

    struct FailingGenerator;

    #[async_trait]
    impl SceneGenerator for FailingGenerator {
        async fn generate(&self, _request: &GenerationRequest) -> AiResult<GeneratedClip> {
            Err(AiError::Api {
                status: 503,
                message: "render farm overloaded".to_string(),
            })
        }
    }

    struct ConcatCompositor;

    #[async_trait]
    impl Compositor for ConcatCompositor {
        async fn compose(&self, clips: &[Vec<u8>]) -> EditResult<Vec<u8>> {
            Ok(clips.concat())
        }
    }

    /// Requests cancellation while composing, after the honored window.
    struct CancelDuringCompose {
        status: Arc<MemoryStatusStore>,
        job_id: JobId,
    }

    #[async_trait]
    impl Compositor for CancelDuringCompose {
        async fn compose(&self, clips: &[Vec<u8>]) -> EditResult<Vec<u8>> {
            self.status.request_cancel(&self.job_id).await.unwrap();
            Ok(clips.concat())
        }
    }

    /// Hands the campaign's lease to a rival job while composing, after
    /// the stages that only touch job-private staging.
    struct StealLease {
        campaigns: Arc<MemoryCampaignStore>,
        campaign_id: CampaignId,
        job_id: JobId,
        rival: JobId,
    }

    #[async_trait]
    impl Compositor for StealLease {
        async fn compose(&self, clips: &[Vec<u8>]) -> EditResult<Vec<u8>> {
            self.campaigns
                .release_lease(&self.campaign_id, &self.job_id)
                .await
                .unwrap();
            self.campaigns
                .acquire_lease(&self.campaign_id, &self.rival, "api", Duration::from_secs(60))
                .await
                .unwrap();
            Ok(clips.concat())
        }
    }

    /// Forwards to a memory store, failing canonical_replace for one key.
    struct FailOnReplace {
        inner: MemoryStore,
        fail_key: String,
    }

    #[async_trait]
    impl ObjectStore for FailOnReplace {
        async fn stage_put(&self, key: &str, bytes: Vec<u8>) -> StorageResult<()> {
            self.inner.stage_put(key, bytes).await
        }
        async fn canonical_replace(
            &self,
            staged_key: &str,
            canonical_key: &str,
        ) -> StorageResult<()> {
            if canonical_key == self.fail_key {
                return Err(StorageError::replace_failed("simulated copy failure"));
            }
            self.inner.canonical_replace(staged_key, canonical_key).await
        }
        async fn get(&self, key: &str) -> StorageResult<Vec<u8>> {
            self.inner.get(key).await
        }
        async fn delete_staged(&self, key: &str) -> StorageResult<()> {
            self.inner.delete_staged(key).await
        }
        async fn resolve_url(&self, key: &str, expiry: Duration) -> StorageResult<String> {
            self.inner.resolve_url(key, expiry).await
        }
    }

    /// Forwards to a memory store, optionally failing document saves.
    struct FailPut {
        inner: MemoryCampaignStore,
        fail_puts: AtomicBool,
    }

    #[async_trait]
    impl CampaignStore for FailPut {
        async fn get(&self, id: &CampaignId) -> DbResult<Campaign> {
            self.inner.get(id).await
        }
        async fn put(&self, campaign: &Campaign) -> DbResult<()> {
            if self.fail_puts.load(Ordering::SeqCst) {
                return Err(DbError::not_found("simulated save failure"));
            }
            self.inner.put(campaign).await
        }
        async fn acquire_lease(
            &self,
            id: &CampaignId,
            job_id: &JobId,
            owner: &str,
            ttl: Duration,
        ) -> DbResult<EditLease> {
            self.inner.acquire_lease(id, job_id, owner, ttl).await
        }
        async fn renew_lease(
            &self,
            id: &CampaignId,
            job_id: &JobId,
            ttl: Duration,
        ) -> DbResult<EditLease> {
            self.inner.renew_lease(id, job_id, ttl).await
        }
        async fn release_lease(&self, id: &CampaignId, job_id: &JobId) -> DbResult<()> {
            self.inner.release_lease(id, job_id).await
        }
    }

    /// Forwards to a memory store, dropping release_lease calls.
    struct NoRelease {
        inner: MemoryCampaignStore,
    }

    #[async_trait]
    impl CampaignStore for NoRelease {
        async fn get(&self, id: &CampaignId) -> DbResult<Campaign> {
            self.inner.get(id).await
        }
        async fn put(&self, campaign: &Campaign) -> DbResult<()> {
            self.inner.put(campaign).await
        }
        async fn acquire_lease(
            &self,
            id: &CampaignId,
            job_id: &JobId,
            owner: &str,
            ttl: Duration,
        ) -> DbResult<EditLease> {
            self.inner.acquire_lease(id, job_id, owner, ttl).await
        }
        async fn renew_lease(
            &self,
            id: &CampaignId,
            job_id: &JobId,
            ttl: Duration,
        ) -> DbResult<EditLease> {
            self.inner.renew_lease(id, job_id, ttl).await
        }
        async fn release_lease(&self, _id: &CampaignId, _job_id: &JobId) -> DbResult<()> {
            Ok(())
        }
    }

    struct TestBed {
        campaigns: Arc<MemoryCampaignStore>,
        storage: Arc<MemoryStore>,
        status: Arc<MemoryStatusStore>,
        request: EditJobRequest,
        campaign_id: CampaignId,
    }

    /// Seed a 3-scene campaign, its canonical objects, a queued status
    /// row and the edit lease, exactly as the submission path would.
    async fn seed() -> TestBed {
        let campaigns = Arc::new(MemoryCampaignStore::new());
        let storage = Arc::new(MemoryStore::new());
        let status = Arc::new(MemoryStatusStore::new());

        let mut campaign = Campaign::new("launch", Vec::new(), "");
        let id = campaign.id.clone();
        campaign.style_context = "bold, high-energy".to_string();
        campaign.final_video_key = format!("campaigns/{id}/final.mp4");
        campaign.scenes = (0..3)
            .map(|i| {
                Scene::new(
                    i,
                    SceneRole::Showcase,
                    5.0,
                    format!("scene {i}"),
                    format!("campaigns/{id}/scenes/{i}.mp4"),
                )
            })
            .collect();

        for scene in &campaign.scenes {
            storage
                .put_canonical(&scene.clip_key, format!("old-{}", scene.index).into_bytes())
                .await;
        }
        storage
            .put_canonical(&campaign.final_video_key, b"old-final".to_vec())
            .await;

        let job = EditJob::new(id.clone(), 1, "make it brighter");
        let request = EditJobRequest::from_job(&job);
        status.put(&JobStatusSnapshot::queued(&job)).await.unwrap();

        campaigns.insert(campaign).await;
        campaigns
            .acquire_lease(&id, &job.id, "api", Duration::from_secs(60))
            .await
            .unwrap();

        TestBed {
            campaigns,
            storage,
            status,
            request,
            campaign_id: id,
        }
    }

    fn pipeline_with(
        bed: &TestBed,
        campaigns: Arc<dyn CampaignStore>,
        storage: Arc<dyn ObjectStore>,
        generator: Arc<dyn SceneGenerator>,
        compositor: Arc<dyn Compositor>,
    ) -> EditPipeline {
        EditPipeline::new(
            campaigns,
            storage,
            bed.status.clone(),
            Arc::new(FakeMutator),
            generator,
            compositor,
            Duration::from_secs(60),
        )
    }

    fn pipeline(bed: &TestBed) -> EditPipeline {
        pipeline_with(
            bed,
            bed.campaigns.clone(),
            bed.storage.clone(),
            Arc::new(FakeGenerator),
            Arc::new(ConcatCompositor),
        )
    }

    #[tokio::test]
    async fn test_successful_edit_commits_everything() {
        let bed = seed().await;
        pipeline(&bed).execute(&bed.request).await.unwrap();

        let snapshot = bed.status.get(&bed.request.job_id).await.unwrap().unwrap();
        assert_eq!(snapshot.stage, EditStage::Completed);
        assert_eq!(snapshot.progress_pct, 100);
        assert_eq!(snapshot.cost, Cost::estimate_edit());

        // Canonical scene and final both replaced
        let campaign = bed.campaigns.get(&bed.campaign_id).await.unwrap();
        let scene = campaign.scene(1).unwrap();
        let scene_bytes = bed.storage.get(&scene.clip_key).await.unwrap();
        assert_eq!(scene_bytes, b"clip:scene 1, make it brighter".to_vec());
        let final_bytes = bed.storage.get(&campaign.final_video_key).await.unwrap();
        assert_eq!(
            final_bytes,
            b"old-0clip:scene 1, make it brighterold-2".to_vec()
        );

        // Campaign document reflects the commit
        assert_eq!(scene.description, "scene 1, make it brighter");
        assert_eq!(scene.edit_count, 1);
        assert_eq!(campaign.edit_history.edit_count, 1);
        assert_eq!(campaign.edit_history.total_cost, Cost::estimate_edit());
        let record = &campaign.edit_history.records[0];
        assert_eq!(record.original_description, "scene 1");
        assert_eq!(record.modified_description, "scene 1, make it brighter");
        assert!(campaign.active_edit_job.is_none());

        // No staged objects remain
        assert!(bed.storage.staged_keys().await.is_empty());
    }

    #[tokio::test]
    async fn test_generation_failure_leaves_campaign_untouched() {
        let bed = seed().await;
        let pipeline = pipeline_with(
            &bed,
            bed.campaigns.clone(),
            bed.storage.clone(),
            Arc::new(FailingGenerator),
            Arc::new(ConcatCompositor),
        );

        let err = pipeline.execute(&bed.request).await.unwrap_err();
        assert!(matches!(err, EditError::Generation(_)));

        let snapshot = bed.status.get(&bed.request.job_id).await.unwrap().unwrap();
        assert_eq!(snapshot.stage, EditStage::Failed);
        assert!(snapshot
            .error_message
            .as_deref()
            .unwrap()
            .contains("Scene generation failed"));
        // Mutation and the failed generation were still billed
        assert_eq!(snapshot.cost, Cost(21));
        // Progress frozen where it was, not reset
        assert_eq!(snapshot.progress_pct, 45);

        let campaign = bed.campaigns.get(&bed.campaign_id).await.unwrap();
        assert_eq!(campaign.scene(1).unwrap().description, "scene 1");
        assert!(campaign.edit_history.is_empty());
        assert!(campaign.active_edit_job.is_none());
        assert_eq!(bed.storage.get(&campaign.final_video_key).await.unwrap(), b"old-final");
        assert!(bed.storage.staged_keys().await.is_empty());
    }

    #[tokio::test]
    async fn test_cancellation_honored_before_work_starts() {
        let bed = seed().await;
        bed.status.request_cancel(&bed.request.job_id).await.unwrap();

        let err = pipeline(&bed).execute(&bed.request).await.unwrap_err();
        assert!(matches!(err, EditError::Canceled));

        let snapshot = bed.status.get(&bed.request.job_id).await.unwrap().unwrap();
        assert_eq!(snapshot.stage, EditStage::Failed);
        assert_eq!(snapshot.cost, Cost::ZERO);

        let campaign = bed.campaigns.get(&bed.campaign_id).await.unwrap();
        assert_eq!(campaign.scene(1).unwrap().description, "scene 1");
        assert!(campaign.active_edit_job.is_none());
    }

    #[tokio::test]
    async fn test_cancellation_after_downloads_is_deferred() {
        let bed = seed().await;
        let pipeline = pipeline_with(
            &bed,
            bed.campaigns.clone(),
            bed.storage.clone(),
            Arc::new(FakeGenerator),
            Arc::new(CancelDuringCompose {
                status: bed.status.clone(),
                job_id: bed.request.job_id.clone(),
            }),
        );

        pipeline.execute(&bed.request).await.unwrap();

        // The late request had no effect; the edit committed
        let snapshot = bed.status.get(&bed.request.job_id).await.unwrap().unwrap();
        assert_eq!(snapshot.stage, EditStage::Completed);

        let campaign = bed.campaigns.get(&bed.campaign_id).await.unwrap();
        assert_eq!(campaign.edit_history.edit_count, 1);
    }

    #[tokio::test]
    async fn test_failed_final_replace_rolls_scene_back() {
        let bed = seed().await;
        let campaign = bed.campaigns.get(&bed.campaign_id).await.unwrap();
        let storage = Arc::new(FailOnReplace {
            inner: bed.storage.as_ref().clone(),
            fail_key: campaign.final_video_key.clone(),
        });
        let pipeline = pipeline_with(
            &bed,
            bed.campaigns.clone(),
            storage,
            Arc::new(FakeGenerator),
            Arc::new(ConcatCompositor),
        );

        let err = pipeline.execute(&bed.request).await.unwrap_err();
        assert!(matches!(err, EditError::Commit(_)));

        // Scene rolled back to its prior bytes, final untouched
        let scene_key = campaign.scene(1).unwrap().clip_key.clone();
        assert_eq!(bed.storage.get(&scene_key).await.unwrap(), b"old-1");
        assert_eq!(bed.storage.get(&campaign.final_video_key).await.unwrap(), b"old-final");

        let campaign = bed.campaigns.get(&bed.campaign_id).await.unwrap();
        assert!(campaign.edit_history.is_empty());
        assert!(campaign.active_edit_job.is_none());
        assert!(bed.storage.staged_keys().await.is_empty());
    }

    #[tokio::test]
    async fn test_failed_campaign_save_rolls_back_scene_and_final() {
        let bed = seed().await;
        let campaigns = Arc::new(FailPut {
            inner: bed.campaigns.as_ref().clone(),
            fail_puts: AtomicBool::new(true),
        });
        let pipeline = pipeline_with(
            &bed,
            campaigns,
            bed.storage.clone(),
            Arc::new(FakeGenerator),
            Arc::new(ConcatCompositor),
        );

        let err = pipeline.execute(&bed.request).await.unwrap_err();
        assert!(matches!(err, EditError::Commit(_)));

        // Both canonical objects byte-identical to their pre-submission
        // state: the scene rolled back AND the already-replaced final
        let campaign = bed.campaigns.get(&bed.campaign_id).await.unwrap();
        let scene_key = campaign.scene(1).unwrap().clip_key.clone();
        assert_eq!(bed.storage.get(&scene_key).await.unwrap(), b"old-1");
        assert_eq!(
            bed.storage.get(&campaign.final_video_key).await.unwrap(),
            b"old-final"
        );
        assert!(campaign.edit_history.is_empty());
        assert!(bed.storage.staged_keys().await.is_empty());
    }

    #[tokio::test]
    async fn test_lapsed_lease_fails_the_job_at_pickup() {
        let bed = seed().await;
        // The lease lapsed while the job sat in the queue and a rival
        // edit claimed the campaign.
        let rival = JobId::new();
        bed.campaigns
            .release_lease(&bed.campaign_id, &bed.request.job_id)
            .await
            .unwrap();
        bed.campaigns
            .acquire_lease(&bed.campaign_id, &rival, "api", Duration::from_secs(60))
            .await
            .unwrap();

        let err = pipeline(&bed).execute(&bed.request).await.unwrap_err();
        assert!(matches!(err, EditError::Commit(_)));

        // Nothing committed, and the rival's lease survived
        let campaign = bed.campaigns.get(&bed.campaign_id).await.unwrap();
        assert_eq!(campaign.edit_history.edit_count, 0);
        assert_eq!(campaign.scene(1).unwrap().edit_count, 0);
        assert_eq!(
            bed.storage.get(&campaign.final_video_key).await.unwrap(),
            b"old-final"
        );
        assert_eq!(campaign.active_edit_job.unwrap().job_id, rival);
    }

    #[tokio::test]
    async fn test_lease_lost_mid_run_blocks_the_commit() {
        let bed = seed().await;
        let pipeline = pipeline_with(
            &bed,
            bed.campaigns.clone(),
            bed.storage.clone(),
            Arc::new(FakeGenerator),
            Arc::new(StealLease {
                campaigns: bed.campaigns.clone(),
                campaign_id: bed.campaign_id.clone(),
                job_id: bed.request.job_id.clone(),
                rival: JobId::new(),
            }),
        );

        let err = pipeline.execute(&bed.request).await.unwrap_err();
        assert!(matches!(err, EditError::Commit(_)));

        // The commit-boundary fence held: canonical state untouched
        let campaign = bed.campaigns.get(&bed.campaign_id).await.unwrap();
        let scene_key = campaign.scene(1).unwrap().clip_key.clone();
        assert_eq!(bed.storage.get(&scene_key).await.unwrap(), b"old-1");
        assert_eq!(
            bed.storage.get(&campaign.final_video_key).await.unwrap(),
            b"old-final"
        );
        assert_eq!(campaign.edit_history.edit_count, 0);
    }

    #[tokio::test]
    async fn test_campaign_save_clears_the_active_edit() {
        let bed = seed().await;
        // Drop the explicit lease release, as if the worker died right
        // after the campaign save.
        let campaigns = Arc::new(NoRelease {
            inner: bed.campaigns.as_ref().clone(),
        });
        let pipeline = pipeline_with(
            &bed,
            campaigns,
            bed.storage.clone(),
            Arc::new(FakeGenerator),
            Arc::new(ConcatCompositor),
        );

        pipeline.execute(&bed.request).await.unwrap();

        // The single document write both recorded the edit and cleared
        // the active job, so the caller never sees a committed edit
        // with a dangling lease.
        let campaign = bed.campaigns.get(&bed.campaign_id).await.unwrap();
        assert_eq!(campaign.edit_history.edit_count, 1);
        assert!(campaign.active_edit_job.is_none());
    }

    #[tokio::test]
    async fn test_fail_job_releases_lease_for_next_edit() {
        let bed = seed().await;
        let pipeline = pipeline(&bed);

        pipeline
            .fail_job(&bed.request, &EditError::TimedOut(900))
            .await;

        let snapshot = bed.status.get(&bed.request.job_id).await.unwrap().unwrap();
        assert_eq!(snapshot.stage, EditStage::Failed);
        assert!(snapshot.error_message.as_deref().unwrap().contains("timed out"));

        // A new edit on the campaign is immediately acceptable
        bed.campaigns
            .acquire_lease(&bed.campaign_id, &JobId::new(), "api", Duration::from_secs(60))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_unknown_scene_index_is_a_validation_error() {
        let bed = seed().await;
        let mut request = bed.request.clone();
        request.scene_index = 9;

        let err = pipeline(&bed).run(&request).await.unwrap_err();
        assert!(matches!(err, EditError::Validation(_)));
    }
}
