//! Campaign aggregate.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::history::EditHistory;
use crate::job::JobId;
use crate::scene::Scene;

/// Unique identifier for a campaign.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct CampaignId(pub String);

impl CampaignId {
    /// Generate a new random campaign ID.
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

impl Default for CampaignId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CampaignId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Time-bounded ownership claim on a campaign's edit slot.
///
/// Modeled as owner + expiry rather than a boolean so orphaned claims
/// from crashed workers are reclaimed deterministically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct EditLease {
    /// The in-flight job holding the lease
    pub job_id: JobId,
    /// Worker/process that owns the lease
    pub owner: String,
    /// When the lease lapses unless renewed
    pub expires_at: DateTime<Utc>,
}

impl EditLease {
    /// Whether the lease has lapsed.
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}

/// Campaign aggregate root.
///
/// The scene count is fixed at creation. Once creation completes, the
/// campaign is mutated only through the edit pipeline's committing step.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Campaign {
    /// Unique campaign ID
    pub id: CampaignId,

    /// Campaign name (display only)
    pub name: String,

    /// Brand/style context forwarded verbatim to the AI services
    #[serde(default)]
    pub style_context: String,

    /// Ordered, fixed-cardinality scene list
    pub scenes: Vec<Scene>,

    /// Canonical storage key of the rendered final video
    pub final_video_key: String,

    /// Append-only ledger of accepted edits
    #[serde(default)]
    pub edit_history: EditHistory,

    /// Lease of the at-most-one in-flight edit job
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_edit_job: Option<EditLease>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Campaign {
    /// Create a new campaign with its fixed scene set.
    pub fn new(name: impl Into<String>, scenes: Vec<Scene>, final_video_key: impl Into<String>) -> Self {
        Self {
            id: CampaignId::new(),
            name: name.into(),
            style_context: String::new(),
            scenes,
            final_video_key: final_video_key.into(),
            edit_history: EditHistory::new(),
            active_edit_job: None,
            created_at: Utc::now(),
        }
    }

    /// Number of scenes (fixed for the campaign's lifetime).
    pub fn scene_count(&self) -> u32 {
        self.scenes.len() as u32
    }

    /// Look up a scene by index.
    pub fn scene(&self, index: u32) -> Option<&Scene> {
        self.scenes.get(index as usize)
    }

    /// Mutable scene lookup (committing step only).
    pub fn scene_mut(&mut self, index: u32) -> Option<&mut Scene> {
        self.scenes.get_mut(index as usize)
    }

    /// Whether an edit is currently in flight.
    ///
    /// A lapsed lease does not count: it is an orphan waiting to be
    /// reclaimed, not a live job.
    pub fn has_active_edit(&self) -> bool {
        self.active_edit_job
            .as_ref()
            .map(|lease| !lease.is_expired())
            .unwrap_or(false)
    }
}
