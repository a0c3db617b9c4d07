//! Append-only edit history ledger.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::cost::Cost;

/// Unique identifier for a committed edit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct EditId(pub String);

impl EditId {
    /// Generate a new random edit ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for EditId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EditId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Immutable record of one committed edit.
///
/// Written exactly once, as part of the committing step of a successful
/// edit job. Never rewritten or removed afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct EditRecord {
    /// Unique edit ID
    pub edit_id: EditId,

    /// When the edit was committed
    pub committed_at: DateTime<Utc>,

    /// Index of the edited scene
    pub scene_index: u32,

    /// The user's free-text edit instruction
    pub instruction: String,

    /// Scene description before the edit
    pub original_description: String,

    /// Scene description after the edit
    pub modified_description: String,

    /// Human-readable summary of what changed
    pub change_summary: String,

    /// Total cost of the edit job
    pub cost: Cost,

    /// Wall-clock duration of the job in seconds
    pub duration_secs: f64,
}

/// Per-campaign ledger of accepted edits.
///
/// Append-only: it is an audit trail, not version control for the video.
/// The two aggregates are maintained on every append.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct EditHistory {
    /// Records ordered by commit time ascending
    pub records: Vec<EditRecord>,

    /// Sum of all record costs
    #[serde(default)]
    pub total_cost: Cost,

    /// Number of records
    #[serde(default)]
    pub edit_count: u32,
}

impl EditHistory {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one record and update the aggregates.
    pub fn append(&mut self, record: EditRecord) {
        self.total_cost += record.cost;
        self.edit_count += 1;
        self.records.push(record);
    }

    /// Records ordered by commit time ascending.
    pub fn list(&self) -> &[EditRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
