//! Transient job status store.
//!
//! Each job gets one JSON snapshot row keyed by job id with a short
//! TTL: the durable trace of an edit is the campaign ledger, the
//! snapshot only exists for polling. An `adreel:jobs:active` set tracks
//! non-terminal jobs for the stale-lease detector.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use redis::AsyncCommands;
use tokio::sync::Mutex;
use tracing::debug;

use adreel_models::{JobId, JobStatusSnapshot};

use crate::error::{QueueError, QueueResult};

/// TTL of a job status row (24 h). Terminal rows stay readable until
/// expiry so a late poller still observes the outcome.
pub const JOB_STATUS_TTL_SECS: u64 = 24 * 3600;

/// Store for polling snapshots, the cancel flag and worker heartbeats.
#[async_trait]
pub trait JobStatusStore: Send + Sync {
    /// Write (or overwrite) a snapshot.
    async fn put(&self, snapshot: &JobStatusSnapshot) -> QueueResult<()>;

    /// Read a snapshot.
    async fn get(&self, job_id: &JobId) -> QueueResult<Option<JobStatusSnapshot>>;

    /// Flag the job for cancellation; honored at the next stage boundary.
    async fn request_cancel(&self, job_id: &JobId) -> QueueResult<()>;

    /// Record a worker heartbeat on the snapshot.
    async fn heartbeat(&self, job_id: &JobId) -> QueueResult<()>;

    /// Ids of jobs not yet observed terminal.
    async fn active_jobs(&self) -> QueueResult<Vec<JobId>>;

    /// Drop a job from the active set (terminal transition).
    async fn remove_active(&self, job_id: &JobId) -> QueueResult<()>;
}

// Object-safe passthrough so `Arc<dyn JobStatusStore>` composes.
#[async_trait]
impl<T: JobStatusStore + ?Sized> JobStatusStore for Arc<T> {
    async fn put(&self, snapshot: &JobStatusSnapshot) -> QueueResult<()> {
        (**self).put(snapshot).await
    }
    async fn get(&self, job_id: &JobId) -> QueueResult<Option<JobStatusSnapshot>> {
        (**self).get(job_id).await
    }
    async fn request_cancel(&self, job_id: &JobId) -> QueueResult<()> {
        (**self).request_cancel(job_id).await
    }
    async fn heartbeat(&self, job_id: &JobId) -> QueueResult<()> {
        (**self).heartbeat(job_id).await
    }
    async fn active_jobs(&self) -> QueueResult<Vec<JobId>> {
        (**self).active_jobs().await
    }
    async fn remove_active(&self, job_id: &JobId) -> QueueResult<()> {
        (**self).remove_active(job_id).await
    }
}

/// Redis-backed status store.
pub struct RedisStatusStore {
    client: redis::Client,
}

impl RedisStatusStore {
    /// Create a new store.
    pub fn new(redis_url: &str) -> QueueResult<Self> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self { client })
    }

    /// Create from environment variables.
    pub fn from_env() -> QueueResult<Self> {
        let url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
        Self::new(&url)
    }

    fn status_key(job_id: &JobId) -> String {
        format!("adreel:job:{job_id}")
    }

    const ACTIVE_SET: &'static str = "adreel:jobs:active";

    async fn load(
        conn: &mut redis::aio::MultiplexedConnection,
        job_id: &JobId,
    ) -> QueueResult<Option<JobStatusSnapshot>> {
        let raw: Option<String> = conn.get(Self::status_key(job_id)).await?;
        match raw {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn save(
        conn: &mut redis::aio::MultiplexedConnection,
        snapshot: &JobStatusSnapshot,
    ) -> QueueResult<()> {
        let raw = serde_json::to_string(snapshot)?;
        conn.set_ex::<_, _, ()>(Self::status_key(&snapshot.job_id), raw, JOB_STATUS_TTL_SECS)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl JobStatusStore for RedisStatusStore {
    async fn put(&self, snapshot: &JobStatusSnapshot) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        Self::save(&mut conn, snapshot).await?;

        if snapshot.is_terminal() {
            conn.srem::<_, _, ()>(Self::ACTIVE_SET, snapshot.job_id.as_str())
                .await?;
        } else {
            conn.sadd::<_, _, ()>(Self::ACTIVE_SET, snapshot.job_id.as_str())
                .await?;
        }

        debug!(job_id = %snapshot.job_id, stage = %snapshot.stage, "Stored job status");
        Ok(())
    }

    async fn get(&self, job_id: &JobId) -> QueueResult<Option<JobStatusSnapshot>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        Self::load(&mut conn, job_id).await
    }

    async fn request_cancel(&self, job_id: &JobId) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let mut snapshot = Self::load(&mut conn, job_id)
            .await?
            .ok_or_else(|| QueueError::status_not_found(job_id.as_str()))?;

        if !snapshot.is_terminal() {
            snapshot.cancel_requested = true;
            Self::save(&mut conn, &snapshot).await?;
        }
        Ok(())
    }

    async fn heartbeat(&self, job_id: &JobId) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        if let Some(mut snapshot) = Self::load(&mut conn, job_id).await? {
            snapshot.record_heartbeat();
            Self::save(&mut conn, &snapshot).await?;
        }
        Ok(())
    }

    async fn active_jobs(&self) -> QueueResult<Vec<JobId>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let ids: Vec<String> = conn.smembers(Self::ACTIVE_SET).await?;
        Ok(ids.into_iter().map(JobId::from_string).collect())
    }

    async fn remove_active(&self, job_id: &JobId) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.srem::<_, _, ()>(Self::ACTIVE_SET, job_id.as_str())
            .await?;
        Ok(())
    }
}

/// In-memory status store for tests and local development.
#[derive(Debug, Clone, Default)]
pub struct MemoryStatusStore {
    snapshots: Arc<Mutex<HashMap<String, JobStatusSnapshot>>>,
}

impl MemoryStatusStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStatusStore for MemoryStatusStore {
    async fn put(&self, snapshot: &JobStatusSnapshot) -> QueueResult<()> {
        self.snapshots
            .lock()
            .await
            .insert(snapshot.job_id.as_str().to_string(), snapshot.clone());
        Ok(())
    }

    async fn get(&self, job_id: &JobId) -> QueueResult<Option<JobStatusSnapshot>> {
        Ok(self.snapshots.lock().await.get(job_id.as_str()).cloned())
    }

    async fn request_cancel(&self, job_id: &JobId) -> QueueResult<()> {
        let mut snapshots = self.snapshots.lock().await;
        let snapshot = snapshots
            .get_mut(job_id.as_str())
            .ok_or_else(|| QueueError::status_not_found(job_id.as_str()))?;
        if !snapshot.is_terminal() {
            snapshot.cancel_requested = true;
        }
        Ok(())
    }

    async fn heartbeat(&self, job_id: &JobId) -> QueueResult<()> {
        if let Some(snapshot) = self.snapshots.lock().await.get_mut(job_id.as_str()) {
            snapshot.record_heartbeat();
        }
        Ok(())
    }

    async fn active_jobs(&self) -> QueueResult<Vec<JobId>> {
        Ok(self
            .snapshots
            .lock()
            .await
            .values()
            .filter(|s| !s.is_terminal())
            .map(|s| s.job_id.clone())
            .collect())
    }

    async fn remove_active(&self, _job_id: &JobId) -> QueueResult<()> {
        // Memory impl derives the active set from stages
        Ok(())
    }
}
