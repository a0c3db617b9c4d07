//! In-memory campaign store for tests and local development.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use adreel_models::{Campaign, CampaignId, EditLease, JobId};

use crate::error::{DbError, DbResult};
use crate::store::CampaignStore;

/// Map-backed [`CampaignStore`]. All operations run under one mutex,
/// which gives the same lease atomicity as the Redis NX/PX path.
#[derive(Debug, Clone, Default)]
pub struct MemoryCampaignStore {
    campaigns: Arc<Mutex<HashMap<String, Campaign>>>,
}

impl MemoryCampaignStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a campaign directly (test setup).
    pub async fn insert(&self, campaign: Campaign) {
        self.campaigns
            .lock()
            .await
            .insert(campaign.id.as_str().to_string(), campaign);
    }
}

#[async_trait]
impl CampaignStore for MemoryCampaignStore {
    async fn get(&self, id: &CampaignId) -> DbResult<Campaign> {
        self.campaigns
            .lock()
            .await
            .get(id.as_str())
            .cloned()
            .ok_or_else(|| DbError::not_found(id.as_str()))
    }

    async fn put(&self, campaign: &Campaign) -> DbResult<()> {
        self.campaigns
            .lock()
            .await
            .insert(campaign.id.as_str().to_string(), campaign.clone());
        Ok(())
    }

    async fn acquire_lease(
        &self,
        id: &CampaignId,
        job_id: &JobId,
        owner: &str,
        ttl: Duration,
    ) -> DbResult<EditLease> {
        let mut campaigns = self.campaigns.lock().await;
        let campaign = campaigns
            .get_mut(id.as_str())
            .ok_or_else(|| DbError::not_found(id.as_str()))?;

        if campaign.has_active_edit() {
            return Err(DbError::edit_in_flight(id.as_str()));
        }

        let lease = EditLease {
            job_id: job_id.clone(),
            owner: owner.to_string(),
            expires_at: Utc::now() + chrono::Duration::from_std(ttl).unwrap_or_default(),
        };
        campaign.active_edit_job = Some(lease.clone());
        Ok(lease)
    }

    async fn renew_lease(&self, id: &CampaignId, job_id: &JobId, ttl: Duration) -> DbResult<EditLease> {
        let mut campaigns = self.campaigns.lock().await;
        let campaign = campaigns
            .get_mut(id.as_str())
            .ok_or_else(|| DbError::not_found(id.as_str()))?;

        match campaign.active_edit_job.as_mut() {
            Some(lease) if lease.job_id == *job_id && !lease.is_expired() => {
                lease.expires_at = Utc::now() + chrono::Duration::from_std(ttl).unwrap_or_default();
                Ok(lease.clone())
            }
            _ => Err(DbError::lease_not_held(format!(
                "job {job_id} does not hold the lease for campaign {id}"
            ))),
        }
    }

    async fn release_lease(&self, id: &CampaignId, job_id: &JobId) -> DbResult<()> {
        let mut campaigns = self.campaigns.lock().await;
        let campaign = campaigns
            .get_mut(id.as_str())
            .ok_or_else(|| DbError::not_found(id.as_str()))?;

        if let Some(lease) = &campaign.active_edit_job {
            if lease.job_id == *job_id {
                campaign.active_edit_job = None;
            }
        }
        Ok(())
    }
}
