//! Dock eviction through the dock's Docker remote API.

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::{debug, info};

use super::{ClusterError, ClusterScheduler};
use crate::registry::DockHost;

/// Name of the cluster agent container on every dock.
pub const DEFAULT_AGENT_CONTAINER: &str = "swarm";

/// Kills the cluster agent container on a dock so the scheduler drops it.
#[derive(Debug, Clone)]
pub struct DockerEvictor {
    client: reqwest::Client,
    agent_container: String,
}

impl DockerEvictor {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            agent_container: DEFAULT_AGENT_CONTAINER.to_string(),
        }
    }

    pub fn with_agent_container(mut self, name: impl Into<String>) -> Self {
        self.agent_container = name.into();
        self
    }
}

#[async_trait]
impl ClusterScheduler for DockerEvictor {
    async fn kill_workload_on_dock(&self, dock: &DockHost) -> Result<(), ClusterError> {
        let url = format!("{}/containers/{}/kill", dock, self.agent_container);
        let response = self.client.post(&url).send().await?;

        match response.status() {
            status if status.is_success() => {
                info!(dock = %dock, "Cluster agent killed");
                Ok(())
            }
            StatusCode::NOT_FOUND => {
                debug!(dock = %dock, "Cluster agent already gone");
                Ok(())
            }
            status => Err(ClusterError::UnexpectedStatus {
                status: status.as_u16(),
                url,
            }),
        }
    }
}
