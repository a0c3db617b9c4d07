//! Application state.

use std::sync::Arc;

use adreel_db::{CampaignStore, RedisCampaignStore};
use adreel_queue::{JobQueue, JobSink, JobStatusStore, RedisStatusStore};
use adreel_storage::{ObjectStore, S3Store};

use crate::config::ApiConfig;
use crate::services::EditService;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub storage: Arc<dyn ObjectStore>,
    pub campaigns: Arc<dyn CampaignStore>,
    pub status: Arc<dyn JobStatusStore>,
    pub queue: Arc<JobQueue>,
    pub edits: EditService,
}

impl AppState {
    /// Create new application state from the environment.
    pub async fn new(config: ApiConfig) -> anyhow::Result<Self> {
        let storage: Arc<dyn ObjectStore> = Arc::new(S3Store::from_env()?);
        let campaigns: Arc<dyn CampaignStore> = Arc::new(RedisCampaignStore::from_env()?);
        let status: Arc<dyn JobStatusStore> = Arc::new(RedisStatusStore::from_env()?);

        let queue = Arc::new(JobQueue::from_env()?);
        queue.init().await?;
        let sink: Arc<dyn JobSink> = queue.clone();

        let edits = EditService::new(
            campaigns.clone(),
            status.clone(),
            sink,
            config.lease_ttl,
        );

        Ok(Self {
            config,
            storage,
            campaigns,
            status,
            queue,
            edits,
        })
    }
}
