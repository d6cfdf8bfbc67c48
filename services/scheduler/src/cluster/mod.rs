//! External cluster collaborators.
//!
//! Evicting a dock involves two systems outside the registry:
//! - the dock's own container runtime, where the cluster agent is killed
//! - the cluster membership store, polled until the dock is gone
//!
//! Both sit behind traits so ingestion can be exercised without them.

mod consul;
mod docker;

pub use consul::{ConsulMembership, DEFAULT_NODES_PREFIX};
pub use docker::{DockerEvictor, DEFAULT_AGENT_CONTAINER};

use async_trait::async_trait;
use thiserror::Error;

use crate::registry::DockHost;

/// Errors talking to cluster collaborators.
#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },
}

/// Forces a dock out of the cluster scheduler.
#[async_trait]
pub trait ClusterScheduler: Send + Sync + 'static {
    /// Best effort; callers log failures and carry on.
    async fn kill_workload_on_dock(&self, dock: &DockHost) -> Result<(), ClusterError>;
}

/// Answers whether the cluster still lists a dock as a member.
#[async_trait]
pub trait MembershipRegistry: Send + Sync + 'static {
    async fn is_dock_still_registered(&self, dock: &DockHost) -> Result<bool, ClusterError>;
}
