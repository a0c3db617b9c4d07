//! AI client error types.

use thiserror::Error;

pub type AiResult<T> = Result<T, AiError>;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Service returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl AiError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// Whether a second attempt with the same inputs could succeed.
    /// Client errors (4xx) are permanent; server errors and transport
    /// failures are transient.
    pub fn is_transient(&self) -> bool {
        match self {
            AiError::Http(e) => !e.is_status() || e.status().map(|s| s.is_server_error()).unwrap_or(true),
            AiError::Api { status, .. } => *status >= 500,
            AiError::ConfigError(_) | AiError::InvalidResponse(_) => false,
        }
    }
}
