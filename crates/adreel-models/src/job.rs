//! Edit job definitions and the pipeline stage state machine.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::campaign::CampaignId;
use crate::cost::Cost;

/// Maximum allowed length of an edit instruction, in characters.
pub const MAX_INSTRUCTION_LEN: usize = 2000;

/// Unique identifier for an edit job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Pipeline stage of an edit job.
///
/// Stages advance strictly in declaration order; `Failed` is reachable
/// from every non-terminal stage. Progress percentages come from a fixed
/// weight table so pollers always observe forward motion.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
    Default,
)]
#[serde(rename_all = "snake_case")]
pub enum EditStage {
    /// Accepted, waiting for a worker
    #[default]
    Queued,
    /// Calling the prompt mutation service
    MutatingPrompt,
    /// Calling the media generation service
    RegeneratingScene,
    /// Writing the new clip to a staging key
    StagingScene,
    /// Fetching every other scene's canonical clip
    DownloadingAllScenes,
    /// Composing the final video locally
    RerenderingFinal,
    /// Atomically promoting staged artifacts and appending the ledger
    Committing,
    /// Terminal: edit committed
    Completed,
    /// Terminal: pipeline failed, compensating cleanup ran
    Failed,
}

impl EditStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            EditStage::Queued => "queued",
            EditStage::MutatingPrompt => "mutating_prompt",
            EditStage::RegeneratingScene => "regenerating_scene",
            EditStage::StagingScene => "staging_scene",
            EditStage::DownloadingAllScenes => "downloading_all_scenes",
            EditStage::RerenderingFinal => "rerendering_final",
            EditStage::Committing => "committing",
            EditStage::Completed => "completed",
            EditStage::Failed => "failed",
        }
    }

    /// Check if this is a terminal stage (no more transitions).
    pub fn is_terminal(&self) -> bool {
        matches!(self, EditStage::Completed | EditStage::Failed)
    }

    /// Progress percentage from the fixed weight table.
    ///
    /// `Failed` reports the weight of no stage at all; callers should
    /// freeze the last observed progress instead.
    pub fn progress_pct(&self) -> u8 {
        match self {
            EditStage::Queued => 2,
            EditStage::MutatingPrompt => 10,
            EditStage::RegeneratingScene => 45,
            EditStage::StagingScene => 55,
            EditStage::DownloadingAllScenes => 70,
            EditStage::RerenderingFinal => 90,
            EditStage::Committing => 97,
            EditStage::Completed => 100,
            EditStage::Failed => 0,
        }
    }

    /// Whether a cancellation request can still be honored at the start
    /// of this stage. Once downloads begin, cancellation is deferred so
    /// the pipeline never aborts mid-write.
    pub fn is_cancellable(&self) -> bool {
        matches!(
            self,
            EditStage::Queued
                | EditStage::MutatingPrompt
                | EditStage::RegeneratingScene
                | EditStage::StagingScene
        )
    }
}

impl fmt::Display for EditStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One transient execution of the scene-edit pipeline.
///
/// Not persisted beyond its lifetime; the durable trace of an accepted
/// edit is the campaign's [`EditRecord`](crate::history::EditRecord).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct EditJob {
    /// Unique job ID
    pub id: JobId,

    /// Campaign being edited
    pub campaign_id: CampaignId,

    /// Target scene index
    pub scene_index: u32,

    /// The user's free-text edit instruction
    pub instruction: String,

    /// Current pipeline stage
    #[serde(default)]
    pub stage: EditStage,

    /// Cost accumulated so far
    #[serde(default)]
    pub cost: Cost,

    /// Error message (if failed)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Completion timestamp (terminal stages only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl EditJob {
    /// Create a new queued edit job.
    pub fn new(campaign_id: CampaignId, scene_index: u32, instruction: impl Into<String>) -> Self {
        Self {
            id: JobId::new(),
            campaign_id,
            scene_index,
            instruction: instruction.into(),
            stage: EditStage::Queued,
            cost: Cost::ZERO,
            error_message: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Advance to the given stage.
    pub fn advance(&mut self, stage: EditStage) {
        debug_assert!(stage >= self.stage, "stages never move backwards");
        self.stage = stage;
        if stage == EditStage::Completed {
            self.completed_at = Some(Utc::now());
        }
    }

    /// Mark the job as failed.
    pub fn fail(&mut self, error: impl Into<String>) {
        self.stage = EditStage::Failed;
        self.error_message = Some(error.into());
        self.completed_at = Some(Utc::now());
    }

    /// Add stage cost to the running total.
    pub fn add_cost(&mut self, cost: Cost) {
        self.cost += cost;
    }

    /// Wall-clock duration so far, in seconds.
    pub fn duration_secs(&self) -> f64 {
        let end = self.completed_at.unwrap_or_else(Utc::now);
        (end - self.created_at).num_milliseconds() as f64 / 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_order_matches_pipeline() {
        let stages = [
            EditStage::Queued,
            EditStage::MutatingPrompt,
            EditStage::RegeneratingScene,
            EditStage::StagingScene,
            EditStage::DownloadingAllScenes,
            EditStage::RerenderingFinal,
            EditStage::Committing,
            EditStage::Completed,
        ];
        for pair in stages.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn test_progress_is_monotone() {
        let stages = [
            EditStage::Queued,
            EditStage::MutatingPrompt,
            EditStage::RegeneratingScene,
            EditStage::StagingScene,
            EditStage::DownloadingAllScenes,
            EditStage::RerenderingFinal,
            EditStage::Committing,
            EditStage::Completed,
        ];
        for pair in stages.windows(2) {
            assert!(pair[0].progress_pct() < pair[1].progress_pct());
        }
    }

    #[test]
    fn test_cancellable_window_ends_at_staging() {
        assert!(EditStage::StagingScene.is_cancellable());
        assert!(!EditStage::DownloadingAllScenes.is_cancellable());
        assert!(!EditStage::Committing.is_cancellable());
    }

    #[test]
    fn test_job_failure_keeps_partial_cost() {
        let mut job = EditJob::new(CampaignId::new(), 1, "make it pop");
        job.add_cost(Cost::PROMPT_MUTATION);
        job.add_cost(Cost::SCENE_GENERATION);
        job.fail("generation failed twice");

        assert_eq!(job.stage, EditStage::Failed);
        assert_eq!(job.cost, Cost(21));
        assert!(job.completed_at.is_some());
    }
}
