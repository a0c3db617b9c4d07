//! The campaign store contract.

use std::time::Duration;

use async_trait::async_trait;

use adreel_models::{Campaign, CampaignId, EditLease, JobId};

use crate::error::DbResult;

/// Persistence for campaign documents and the per-campaign edit lease.
///
/// The lease is the serialization point for edits: `acquire_lease` must
/// be atomic so that of two concurrent submissions exactly one wins and
/// the other observes [`DbError::EditInFlight`](crate::DbError).
/// A lapsed lease is reclaimable by the next acquirer.
#[async_trait]
pub trait CampaignStore: Send + Sync {
    /// Load a campaign document.
    async fn get(&self, id: &CampaignId) -> DbResult<Campaign>;

    /// Persist a campaign document (whole-row replace).
    async fn put(&self, campaign: &Campaign) -> DbResult<()>;

    /// Atomically claim the campaign's edit slot for a job.
    ///
    /// Fails with `EditInFlight` when an unexpired lease is held by
    /// another job. On success the campaign's `active_edit_job` is set
    /// and persisted.
    async fn acquire_lease(
        &self,
        id: &CampaignId,
        job_id: &JobId,
        owner: &str,
        ttl: Duration,
    ) -> DbResult<EditLease>;

    /// Extend the lease held by `job_id`. Fails with `LeaseNotHeld` if
    /// the lease lapsed or belongs to another job.
    async fn renew_lease(&self, id: &CampaignId, job_id: &JobId, ttl: Duration) -> DbResult<EditLease>;

    /// Release the lease held by `job_id` and clear `active_edit_job`.
    /// A no-op if the lease already lapsed or was reclaimed.
    async fn release_lease(&self, id: &CampaignId, job_id: &JobId) -> DbResult<()>;
}
