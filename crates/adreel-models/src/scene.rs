//! Scene definitions.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Role a scene plays inside a campaign's narrative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum SceneRole {
    /// Attention-grabbing opener
    #[default]
    Hook,
    /// Product showcase
    Showcase,
    /// Benefit or social proof
    Benefit,
    /// Closing call to action
    CallToAction,
}

impl SceneRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            SceneRole::Hook => "hook",
            SceneRole::Showcase => "showcase",
            SceneRole::Benefit => "benefit",
            SceneRole::CallToAction => "call_to_action",
        }
    }
}

/// One scene of a campaign video.
///
/// Scenes are identified by a 0-based index that is stable for the
/// campaign's lifetime; editing never inserts or removes scenes. A scene
/// is only mutated as the committing step of a successful edit job,
/// never partially.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Scene {
    /// 0-based index within the campaign
    pub index: u32,

    /// Narrative role
    #[serde(default)]
    pub role: SceneRole,

    /// Target duration in seconds
    pub target_duration_secs: f32,

    /// Current scene description (the generation prompt)
    pub description: String,

    /// Canonical storage key for the rendered clip
    pub clip_key: String,

    /// Number of accepted edits applied to this scene
    #[serde(default)]
    pub edit_count: u32,

    /// When this scene was last edited
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_edited_at: Option<DateTime<Utc>>,
}

impl Scene {
    /// Create a new scene at the given index.
    pub fn new(
        index: u32,
        role: SceneRole,
        target_duration_secs: f32,
        description: impl Into<String>,
        clip_key: impl Into<String>,
    ) -> Self {
        Self {
            index,
            role,
            target_duration_secs,
            description: description.into(),
            clip_key: clip_key.into(),
            edit_count: 0,
            last_edited_at: None,
        }
    }

    /// Apply a committed edit: swap the description and bump the counter.
    pub fn apply_edit(&mut self, new_description: impl Into<String>) {
        self.description = new_description.into();
        self.edit_count += 1;
        self.last_edited_at = Some(Utc::now());
    }
}
