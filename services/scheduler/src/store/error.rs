//! Store error types.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Shared store failures.
#[derive(Debug, Error, Clone)]
pub enum StoreError {
    /// The store could not be reached or the command failed in transit.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A stored value has the wrong shape for the requested operation.
    #[error("corrupt value at '{key}': {message}")]
    Corrupt { key: String, message: String },
}

impl StoreError {
    /// Classify a redis failure on `key`. Reply-shape errors mean the stored
    /// value is corrupt; everything else is treated as an outage.
    pub(crate) fn from_redis(key: &str, err: redis::RedisError) -> Self {
        match err.kind() {
            redis::ErrorKind::TypeError | redis::ErrorKind::ResponseError => StoreError::Corrupt {
                key: key.to_string(),
                message: err.to_string(),
            },
            _ => StoreError::Unavailable(err.to_string()),
        }
    }
}
