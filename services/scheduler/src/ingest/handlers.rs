//! Lifecycle event handlers.

use std::sync::Arc;

use dockyard_events::{
    decode_payload, ContainerLifecyclePayload, DockLifecyclePayload, DockRemovedPayload,
    DockReplacementRequestedPayload, EventEnvelope, EventKind, WaitForRemovalPayload,
};
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::cluster::{ClusterScheduler, MembershipRegistry};
use crate::registry::{DockHost, DockRegistry, WorkloadType};

use super::{EventPublisher, HandlerError, HandlerResult, WorkloadClassifier};

/// Applies lifecycle events to the dock registry.
pub struct EventIngestion {
    registry: DockRegistry,
    classifier: WorkloadClassifier,
    cluster: Arc<dyn ClusterScheduler>,
    membership: Arc<dyn MembershipRegistry>,
    publisher: Arc<dyn EventPublisher>,
}

impl EventIngestion {
    pub fn new(
        registry: DockRegistry,
        classifier: WorkloadClassifier,
        cluster: Arc<dyn ClusterScheduler>,
        membership: Arc<dyn MembershipRegistry>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            registry,
            classifier,
            cluster,
            membership,
            publisher,
        }
    }

    /// Route an event to its handler.
    #[instrument(skip(self, envelope), fields(event_id = %envelope.event_id, event_type = %envelope.event_type, attempt = envelope.attempt))]
    pub async fn handle(&self, envelope: &EventEnvelope) -> HandlerResult<()> {
        let kind = envelope.kind().ok_or_else(|| {
            HandlerError::ValidationFatal(format!("unknown event type '{}'", envelope.event_type))
        })?;

        match kind {
            EventKind::ContainerDied | EventKind::ContainerDestroyed => {
                self.container_died(decode(envelope)?).await
            }
            EventKind::DockUp => self.dock_up(decode(envelope)?).await,
            EventKind::DockDown => self.dock_down(decode(envelope)?).await,
            EventKind::DockUnhealthy => {
                self.dock_unhealthy(decode(envelope)?, envelope.event_id)
                    .await
            }
            EventKind::DockWaitForRemoval => {
                self.wait_for_removal(decode(envelope)?, envelope.event_id)
                    .await
            }
            EventKind::DockRemoved | EventKind::DockReplacementRequested => {
                debug!("Outbound event has no ingestion handler");
                Ok(())
            }
        }
    }

    /// A container exited. Build containers release one build slot on their dock.
    pub async fn container_died(&self, payload: ContainerLifecyclePayload) -> HandlerResult<()> {
        let image = payload
            .from
            .as_deref()
            .map(str::trim)
            .filter(|from| !from.is_empty())
            .ok_or_else(|| {
                HandlerError::ValidationFatal("container event is missing 'from'".to_string())
            })?;
        let dock = require_host(payload.host.as_deref())?;

        match self.classifier.classify(image) {
            Some(WorkloadType::ContainerBuild) => {
                let value = self
                    .registry
                    .increment_field(&dock.as_key(), WorkloadType::ContainerBuild, -1)
                    .await?;
                info!(dock = %dock, num_builds = value, "Build container exited");
            }
            Some(WorkloadType::ContainerRun) => {
                debug!(dock = %dock, image, "Run container exited; counters unchanged");
            }
            None => {
                debug!(dock = %dock, image, "Unclassified image; counters unchanged");
            }
        }
        Ok(())
    }

    /// A dock joined the pool.
    pub async fn dock_up(&self, payload: DockLifecyclePayload) -> HandlerResult<()> {
        let dock = require_host(payload.host.as_deref())?;
        self.registry
            .add_host(&dock.as_key(), payload.tags.as_deref())
            .await?;
        Ok(())
    }

    /// A dock left the pool.
    pub async fn dock_down(&self, payload: DockLifecyclePayload) -> HandlerResult<()> {
        let dock = require_host(payload.host.as_deref())?;
        self.registry.delete_host(&dock.as_key()).await?;
        Ok(())
    }

    /// A dock failed health checks: evict it, wait for the cluster to drop it,
    /// and ask for replacement capacity.
    pub async fn dock_unhealthy(
        &self,
        payload: DockLifecyclePayload,
        cause: Uuid,
    ) -> HandlerResult<()> {
        let dock = require_host(payload.host.as_deref())?;
        self.registry.delete_host(&dock.as_key()).await?;

        let wait = EventEnvelope::new(
            EventKind::DockWaitForRemoval,
            to_payload(&WaitForRemovalPayload {
                docker_url: Some(dock.as_key()),
            }),
        )
        .caused_by(cause);
        self.publisher.publish(wait).await?;

        let replacement = EventEnvelope::new(
            EventKind::DockReplacementRequested,
            to_payload(&DockReplacementRequestedPayload {
                host: dock.as_key(),
            }),
        )
        .caused_by(cause);
        self.publisher.publish(replacement).await?;

        warn!(dock = %dock, "Unhealthy dock evicted");
        Ok(())
    }

    /// Confirm an evicted dock has left the cluster, then announce it.
    ///
    /// Returns [`HandlerError::DockStillPresent`] while the cluster still
    /// lists the dock, so the transport retries later.
    pub async fn wait_for_removal(
        &self,
        payload: WaitForRemovalPayload,
        cause: Uuid,
    ) -> HandlerResult<()> {
        let docker_url = payload
            .docker_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .ok_or_else(|| {
                HandlerError::ValidationFatal("event is missing 'dockerUrl'".to_string())
            })?;
        let dock = DockHost::parse(docker_url)
            .map_err(|e| HandlerError::ValidationFatal(e.to_string()))?;

        if let Err(e) = self.cluster.kill_workload_on_dock(&dock).await {
            warn!(dock = %dock, error = %e, "Failed to evict dock from cluster");
        }

        if self.membership.is_dock_still_registered(&dock).await? {
            return Err(HandlerError::DockStillPresent(dock.as_key()));
        }

        let removed = EventEnvelope::new(
            EventKind::DockRemoved,
            to_payload(&DockRemovedPayload {
                host: dock.as_key(),
            }),
        )
        .caused_by(cause);
        self.publisher.publish(removed).await?;

        info!(dock = %dock, "Dock removed from cluster");
        Ok(())
    }
}

fn decode<T: DeserializeOwned>(envelope: &EventEnvelope) -> HandlerResult<T> {
    decode_payload(envelope.payload.clone())
        .map_err(|e| HandlerError::ValidationFatal(e.to_string()))
}

fn require_host(host: Option<&str>) -> HandlerResult<DockHost> {
    let host =
        host.ok_or_else(|| HandlerError::ValidationFatal("event is missing 'host'".to_string()))?;
    DockHost::parse(host).map_err(|e| HandlerError::ValidationFatal(e.to_string()))
}

fn to_payload<T: serde::Serialize>(payload: &T) -> serde_json::Value {
    serde_json::to_value(payload).unwrap_or_default()
}
