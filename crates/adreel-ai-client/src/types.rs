//! Request/response types for the AI services.

use adreel_models::Cost;
use serde::{Deserialize, Serialize};

/// Request to the prompt mutation service.
#[derive(Debug, Clone, Serialize)]
pub struct PromptMutationRequest {
    /// Current scene description
    pub original_description: String,
    /// The user's free-text edit instruction
    pub instruction: String,
    /// Campaign style/brand context carried along unmodified
    pub style_context: String,
}

/// Response from the prompt mutation service.
#[derive(Debug, Clone, Deserialize)]
pub struct MutatedPrompt {
    /// Revised scene description
    pub revised_description: String,
    /// Human-readable summary of the change
    pub change_summary: String,
}

impl MutatedPrompt {
    /// Cost of one mutation call.
    pub fn cost(&self) -> Cost {
        Cost::PROMPT_MUTATION
    }
}

/// Request to the media generation service.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationRequest {
    /// Scene description to render
    pub description: String,
    /// Target clip duration in seconds
    pub duration_secs: f32,
    /// Campaign style/brand context
    pub style_context: String,
}

/// A rendered clip returned by the media generation service.
#[derive(Debug, Clone)]
pub struct GeneratedClip {
    /// Raw MP4 bytes
    pub bytes: Vec<u8>,
}

impl GeneratedClip {
    /// Cost of one generation call.
    pub fn cost(&self) -> Cost {
        Cost::SCENE_GENERATION
    }
}
