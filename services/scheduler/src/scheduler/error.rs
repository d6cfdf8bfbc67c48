//! Scheduler error types.

use thiserror::Error;

use crate::registry::RegistryError;
use crate::store::StoreError;

/// Result type for scheduler operations.
pub type SchedulerResult<T> = Result<T, SchedulerError>;

/// Errors that can occur during host selection.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("no docks available")]
    NoDocksAvailable,

    #[error(transparent)]
    StoreUnavailable(#[from] StoreError),

    #[error("admission queue closed")]
    QueueClosed,
}

impl From<RegistryError> for SchedulerError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::Store(e) => SchedulerError::StoreUnavailable(e),
            RegistryError::InvalidHost(e) => SchedulerError::InvalidRequest(e.to_string()),
            RegistryError::UnknownHost(host) => {
                SchedulerError::InvalidRequest(format!("unknown host: {host}"))
            }
        }
    }
}
