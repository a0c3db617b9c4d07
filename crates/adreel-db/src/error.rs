//! Database error types.

use thiserror::Error;

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("Campaign not found: {0}")]
    NotFound(String),

    #[error("Edit already in flight for campaign {0}")]
    EditInFlight(String),

    #[error("Lease not held: {0}")]
    LeaseNotHeld(String),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl DbError {
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound(id.into())
    }

    pub fn edit_in_flight(id: impl Into<String>) -> Self {
        Self::EditInFlight(id.into())
    }

    pub fn lease_not_held(msg: impl Into<String>) -> Self {
        Self::LeaseNotHeld(msg.into())
    }

    /// Whether this is the submit-time conflict (second edit while one
    /// is in flight).
    pub fn is_conflict(&self) -> bool {
        matches!(self, DbError::EditInFlight(_))
    }
}
