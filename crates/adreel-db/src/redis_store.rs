//! Redis-backed campaign store.
//!
//! Campaign documents are JSON values at `adreel:campaign:{id}`; the
//! edit lease is a separate `adreel:lease:{id}` key written with
//! `SET NX PX`, so acquisition is atomic and an orphaned lease expires
//! on its own.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use redis::AsyncCommands;
use tracing::{debug, info};

use adreel_models::{Campaign, CampaignId, EditLease, JobId};

use crate::error::{DbError, DbResult};
use crate::store::CampaignStore;

/// Renew only when the holder matches, in one round trip.
const RENEW_SCRIPT: &str = r#"
if redis.call('GET', KEYS[1]) == ARGV[1] then
  return redis.call('PEXPIRE', KEYS[1], ARGV[2])
else
  return 0
end
"#;

/// Delete only when the holder matches.
const RELEASE_SCRIPT: &str = r#"
if redis.call('GET', KEYS[1]) == ARGV[1] then
  return redis.call('DEL', KEYS[1])
else
  return 0
end
"#;

/// Redis-backed [`CampaignStore`].
pub struct RedisCampaignStore {
    client: redis::Client,
}

impl RedisCampaignStore {
    /// Create a new store.
    pub fn new(redis_url: &str) -> DbResult<Self> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self { client })
    }

    /// Create from environment variables.
    pub fn from_env() -> DbResult<Self> {
        let url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
        Self::new(&url)
    }

    fn campaign_key(id: &CampaignId) -> String {
        format!("adreel:campaign:{id}")
    }

    fn lease_key(id: &CampaignId) -> String {
        format!("adreel:lease:{id}")
    }
}

#[async_trait]
impl CampaignStore for RedisCampaignStore {
    async fn get(&self, id: &CampaignId) -> DbResult<Campaign> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let raw: Option<String> = conn.get(Self::campaign_key(id)).await?;
        let raw = raw.ok_or_else(|| DbError::not_found(id.as_str()))?;
        Ok(serde_json::from_str(&raw)?)
    }

    async fn put(&self, campaign: &Campaign) -> DbResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let raw = serde_json::to_string(campaign)?;
        conn.set::<_, _, ()>(Self::campaign_key(&campaign.id), raw)
            .await?;
        debug!("Saved campaign {}", campaign.id);
        Ok(())
    }

    async fn acquire_lease(
        &self,
        id: &CampaignId,
        job_id: &JobId,
        owner: &str,
        ttl: Duration,
    ) -> DbResult<EditLease> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let acquired: bool = redis::cmd("SET")
            .arg(Self::lease_key(id))
            .arg(job_id.as_str())
            .arg("NX")
            .arg("PX")
            .arg(ttl.as_millis() as u64)
            .query_async(&mut conn)
            .await?;

        if !acquired {
            return Err(DbError::edit_in_flight(id.as_str()));
        }

        let lease = EditLease {
            job_id: job_id.clone(),
            owner: owner.to_string(),
            expires_at: Utc::now() + chrono::Duration::from_std(ttl).unwrap_or_default(),
        };

        // Mirror the lease into the campaign document for readers
        let mut campaign = self.get(id).await?;
        campaign.active_edit_job = Some(lease.clone());
        self.put(&campaign).await?;

        info!(campaign_id = %id, job_id = %job_id, "Acquired edit lease");
        Ok(lease)
    }

    async fn renew_lease(&self, id: &CampaignId, job_id: &JobId, ttl: Duration) -> DbResult<EditLease> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let renewed: i32 = redis::Script::new(RENEW_SCRIPT)
            .key(Self::lease_key(id))
            .arg(job_id.as_str())
            .arg(ttl.as_millis() as u64)
            .invoke_async(&mut conn)
            .await?;

        if renewed == 0 {
            return Err(DbError::lease_not_held(format!(
                "job {job_id} does not hold the lease for campaign {id}"
            )));
        }

        let expires_at = Utc::now() + chrono::Duration::from_std(ttl).unwrap_or_default();
        let mut campaign = self.get(id).await?;
        if let Some(lease) = campaign.active_edit_job.as_mut() {
            if lease.job_id == *job_id {
                lease.expires_at = expires_at;
                let lease = lease.clone();
                self.put(&campaign).await?;
                return Ok(lease);
            }
        }

        Err(DbError::lease_not_held(format!(
            "campaign {id} document does not reference job {job_id}"
        )))
    }

    async fn release_lease(&self, id: &CampaignId, job_id: &JobId) -> DbResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let _released: i32 = redis::Script::new(RELEASE_SCRIPT)
            .key(Self::lease_key(id))
            .arg(job_id.as_str())
            .invoke_async(&mut conn)
            .await?;

        let mut campaign = self.get(id).await?;
        if let Some(lease) = &campaign.active_edit_job {
            if lease.job_id == *job_id {
                campaign.active_edit_job = None;
                self.put(&campaign).await?;
            }
        }

        debug!(campaign_id = %id, job_id = %job_id, "Released edit lease");
        Ok(())
    }
}
