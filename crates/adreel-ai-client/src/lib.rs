//! HTTP adapters for the two external AI services.
//!
//! Both services are opaque request/response collaborators:
//! - the prompt mutation service revises a scene description from a
//!   free-text edit instruction;
//! - the media generation service renders a clip from a description.
//!
//! Retry policy lives with the caller; these clients make exactly one
//! attempt per call and report whether a failure was transient.

pub mod error;
pub mod media;
pub mod prompt;
pub mod types;

pub use error::{AiError, AiResult};
pub use media::MediaGenerationClient;
pub use prompt::PromptMutationClient;
pub use types::{GeneratedClip, GenerationRequest, MutatedPrompt, PromptMutationRequest};
