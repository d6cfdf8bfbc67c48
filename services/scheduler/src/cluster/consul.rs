//! Cluster membership checks against Consul's key-value API.

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::debug;

use super::{ClusterError, MembershipRegistry};
use crate::registry::DockHost;

/// Key prefix under which the cluster registers its nodes.
pub const DEFAULT_NODES_PREFIX: &str = "swarm/docker/swarm/nodes";

/// Looks docks up under `{prefix}/{ip:port}` in Consul.
#[derive(Debug, Clone)]
pub struct ConsulMembership {
    client: reqwest::Client,
    base_url: String,
    nodes_prefix: String,
}

impl ConsulMembership {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            nodes_prefix: DEFAULT_NODES_PREFIX.to_string(),
        }
    }

    pub fn with_nodes_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.nodes_prefix = prefix.into().trim_matches('/').to_string();
        self
    }

    fn key_url(&self, dock: &DockHost) -> String {
        format!(
            "{}/v1/kv/{}/{}",
            self.base_url,
            self.nodes_prefix,
            dock.authority()
        )
    }
}

#[async_trait]
impl MembershipRegistry for ConsulMembership {
    async fn is_dock_still_registered(&self, dock: &DockHost) -> Result<bool, ClusterError> {
        let url = self.key_url(dock);
        let response = self.client.get(&url).send().await?;

        let present = match response.status() {
            StatusCode::OK => true,
            StatusCode::NOT_FOUND => false,
            status => {
                return Err(ClusterError::UnexpectedStatus {
                    status: status.as_u16(),
                    url,
                })
            }
        };
        debug!(dock = %dock, present, "Checked cluster membership");
        Ok(present)
    }
}
