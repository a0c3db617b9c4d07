//! Pipeline error taxonomy.
//!
//! Every variant maps to exactly one failure site in the pipeline so
//! the status snapshot's error message tells the caller which stage
//! gave up. None of these trigger an automatic re-run: regeneration is
//! billable, so a failed job is surfaced and the caller resubmits.

use thiserror::Error;

use adreel_ai_client::AiError;
use adreel_db::DbError;
use adreel_queue::QueueError;
use adreel_storage::StorageError;

pub type EditResult<T> = Result<T, EditError>;

#[derive(Debug, Error)]
pub enum EditError {
    #[error("Prompt mutation failed: {0}")]
    PromptMutation(AiError),

    #[error("Scene generation failed: {0}")]
    Generation(AiError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Final render failed: {0}")]
    Render(String),

    #[error("Commit failed: {0}")]
    Commit(String),

    #[error("Invalid edit request: {0}")]
    Validation(String),

    #[error("Canceled by user")]
    Canceled,

    #[error("Job timed out after {0}s")]
    TimedOut(u64),

    #[error("Database error: {0}")]
    Db(#[from] DbError),

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EditError {
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    pub fn commit(msg: impl Into<String>) -> Self {
        Self::Commit(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}
