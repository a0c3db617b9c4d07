//! Queue error types.

use thiserror::Error;

pub type QueueResult<T> = Result<T, QueueError>;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Enqueue failed: {0}")]
    EnqueueFailed(String),

    #[error("Job status not found: {0}")]
    StatusNotFound(String),
}

impl QueueError {
    pub fn enqueue_failed(msg: impl Into<String>) -> Self {
        Self::EnqueueFailed(msg.into())
    }

    pub fn status_not_found(job_id: impl Into<String>) -> Self {
        Self::StatusNotFound(job_id.into())
    }
}
