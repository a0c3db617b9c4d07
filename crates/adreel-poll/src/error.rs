//! Polling client error types.

use thiserror::Error;

pub type PollResult<T> = Result<T, PollError>;

#[derive(Debug, Error)]
pub enum PollError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl PollError {
    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// Whether a single poll failure is worth surfacing or just skipping.
    ///
    /// Transport errors and 5xx are transient; the fixed poll budget
    /// bounds how long a flapping endpoint can be retried.
    pub fn is_transient(&self) -> bool {
        match self {
            PollError::Http(e) => !e.is_builder() && !e.is_decode(),
            PollError::Api { status, .. } => *status >= 500,
            PollError::InvalidResponse(_) => false,
        }
    }
}
