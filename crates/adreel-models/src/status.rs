//! Job status snapshots for polling.
//!
//! Snapshots are stored in Redis with a short TTL and back the
//! `GET /jobs/{id}/status` endpoint, so pollers never touch the
//! campaign row.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::campaign::CampaignId;
use crate::cost::Cost;
use crate::job::{EditJob, EditStage, JobId};

/// Seconds without a heartbeat before a running job counts as stale.
pub const STALE_THRESHOLD_SECS: i64 = 120;

/// Grace period for queued jobs that never produced a heartbeat.
pub const STALE_GRACE_PERIOD_SECS: i64 = 300;

/// Point-in-time view of an edit job, cached for fast polling.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct JobStatusSnapshot {
    /// Unique job identifier
    pub job_id: JobId,
    /// Campaign being edited
    pub campaign_id: CampaignId,
    /// Target scene index
    pub scene_index: u32,
    /// Current pipeline stage
    pub stage: EditStage,
    /// Progress percentage (0-100), monotone per job
    pub progress_pct: u8,
    /// Cost accumulated so far
    pub cost: Cost,
    /// Error message if the job failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Caller requested cancellation; honored at the next stage boundary
    #[serde(default)]
    pub cancel_requested: bool,
    /// When the job was accepted
    pub started_at: DateTime<Utc>,
    /// When the snapshot was last updated
    pub updated_at: DateTime<Utc>,
    /// Last heartbeat from the owning worker
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_heartbeat: Option<DateTime<Utc>>,
    /// Monotonically increasing event sequence number
    #[serde(default)]
    pub event_seq: u64,
}

impl JobStatusSnapshot {
    /// Snapshot for a freshly accepted job.
    pub fn queued(job: &EditJob) -> Self {
        Self {
            job_id: job.id.clone(),
            campaign_id: job.campaign_id.clone(),
            scene_index: job.scene_index,
            stage: EditStage::Queued,
            progress_pct: EditStage::Queued.progress_pct(),
            cost: Cost::ZERO,
            error_message: None,
            cancel_requested: false,
            started_at: job.created_at,
            updated_at: job.created_at,
            last_heartbeat: None,
            event_seq: 0,
        }
    }

    /// Check if the job reached a terminal stage.
    pub fn is_terminal(&self) -> bool {
        self.stage.is_terminal()
    }

    /// Advance to a new stage, keeping progress monotone.
    pub fn advance(&mut self, stage: EditStage, cost: Cost) {
        self.stage = stage;
        self.progress_pct = self.progress_pct.max(stage.progress_pct());
        self.cost = cost;
        self.updated_at = Utc::now();
        self.event_seq += 1;
    }

    /// Mark the job failed; progress freezes at its last value.
    pub fn fail(&mut self, error: impl Into<String>, cost: Cost) {
        self.stage = EditStage::Failed;
        self.error_message = Some(error.into());
        self.cost = cost;
        self.updated_at = Utc::now();
        self.event_seq += 1;
    }

    /// Record a worker heartbeat.
    pub fn record_heartbeat(&mut self) {
        self.last_heartbeat = Some(Utc::now());
        self.updated_at = Utc::now();
    }

    /// Whether the owning worker has stopped responding.
    pub fn is_stale(&self, stale_threshold_secs: i64, grace_period_secs: i64) -> bool {
        if self.is_terminal() {
            return false;
        }

        let now = Utc::now();
        match self.last_heartbeat {
            Some(hb) => (now - hb).num_seconds() > stale_threshold_secs,
            None => (now - self.started_at).num_seconds() > grace_period_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> JobStatusSnapshot {
        let job = EditJob::new(CampaignId::new(), 1, "make it brighter");
        JobStatusSnapshot::queued(&job)
    }

    #[test]
    fn test_progress_never_regresses() {
        let mut s = snapshot();
        s.advance(EditStage::RerenderingFinal, Cost(21));
        assert_eq!(s.progress_pct, 90);

        // A failure freezes progress rather than resetting it
        s.fail("commit failed", Cost(22));
        assert_eq!(s.progress_pct, 90);
        assert!(s.is_terminal());
    }

    #[test]
    fn test_event_seq_increments() {
        let mut s = snapshot();
        let seq = s.event_seq;
        s.advance(EditStage::MutatingPrompt, Cost::ZERO);
        s.advance(EditStage::RegeneratingScene, Cost(1));
        assert_eq!(s.event_seq, seq + 2);
    }

    #[test]
    fn test_stale_detection() {
        let mut s = snapshot();

        // Within grace period, not stale
        assert!(!s.is_stale(60, 120));

        // Old job without heartbeat
        s.started_at = Utc::now() - chrono::Duration::seconds(200);
        assert!(s.is_stale(60, 120));

        // Recent heartbeat clears it
        s.record_heartbeat();
        assert!(!s.is_stale(60, 120));

        // Terminal jobs are never stale
        s.fail("x", Cost::ZERO);
        s.last_heartbeat = None;
        assert!(!s.is_stale(60, 120));
    }
}
