//! Edit worker: consumes accepted edit jobs and runs the scene-edit
//! pipeline against storage, the AI services and the campaign store.

pub mod config;
pub mod error;
pub mod executor;
pub mod pipeline;
pub mod render;
pub mod retry;

pub use config::WorkerConfig;
pub use error::{EditError, EditResult};
pub use executor::JobExecutor;
pub use pipeline::{EditPipeline, PromptMutator, SceneGenerator};
pub use render::{Compositor, FfmpegCompositor};
