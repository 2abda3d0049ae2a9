//! Infrastructure error taxonomy shared by the cache, queue and job-state store.

use thiserror::Error;

/// Failure of a backing store.
///
/// Kept separate from "absent" results: a lookup that cannot reach the backend
/// returns `Err(StoreError)`, never `Ok(None)`.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend could not be reached or rejected the command
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A stored payload could not be decoded
    #[error("corrupt entry at {key}: {reason}")]
    Corrupt { key: String, reason: String },

    /// A value could not be encoded for storage
    #[error("failed to encode value: {0}")]
    Encode(String),
}

impl StoreError {
    pub fn corrupt(key: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        StoreError::Corrupt {
            key: key.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<redis::RedisError> for StoreError {
    fn from(e: redis::RedisError) -> Self {
        StoreError::Unavailable(e.to_string())
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
