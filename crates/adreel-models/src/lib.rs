//! Shared data models for the AdReel backend.
//!
//! This crate provides Serde-serializable types for:
//! - Campaigns, scenes and the append-only edit history ledger
//! - Edit jobs and the pipeline stage state machine
//! - Cost accounting across pipeline stages
//! - Job status snapshots for polling

pub mod campaign;
pub mod cost;
pub mod history;
pub mod job;
pub mod scene;
pub mod status;

// Re-export common types
pub use campaign::{Campaign, CampaignId, EditLease};
pub use cost::Cost;
pub use history::{EditHistory, EditId, EditRecord};
pub use job::{EditJob, EditStage, JobId, MAX_INSTRUCTION_LEN};
pub use scene::{Scene, SceneRole};
pub use status::{JobStatusSnapshot, STALE_GRACE_PERIOD_SECS, STALE_THRESHOLD_SECS};
