//! Ingestion error types.

use thiserror::Error;

use crate::cluster::ClusterError;
use crate::registry::RegistryError;
use crate::store::StoreError;

use super::PublishError;

/// Result type for event handlers.
pub type HandlerResult<T> = Result<T, HandlerError>;

/// Errors from event handlers, split by whether redelivery can help.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The event is malformed; redelivering it would fail the same way.
    #[error("invalid event: {0}")]
    ValidationFatal(String),

    /// The dock is still a cluster member; check again later.
    #[error("dock still registered: {0}")]
    DockStillPresent(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("cluster error: {0}")]
    Cluster(#[from] ClusterError),

    #[error(transparent)]
    Publish(#[from] PublishError),
}

impl HandlerError {
    /// Whether the transport should redeliver the event.
    pub fn is_retryable(&self) -> bool {
        match self {
            HandlerError::ValidationFatal(_) => false,
            HandlerError::Store(StoreError::Corrupt { .. }) => false,
            HandlerError::DockStillPresent(_)
            | HandlerError::Store(StoreError::Unavailable(_))
            | HandlerError::Cluster(_)
            | HandlerError::Publish(_) => true,
        }
    }
}

impl From<RegistryError> for HandlerError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::Store(e) => HandlerError::Store(e),
            RegistryError::InvalidHost(e) => HandlerError::ValidationFatal(e.to_string()),
            RegistryError::UnknownHost(host) => {
                HandlerError::ValidationFatal(format!("unknown host: {host}"))
            }
        }
    }
}
