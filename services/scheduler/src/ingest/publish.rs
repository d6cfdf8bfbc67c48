//! Outbound event publishing.

use async_trait::async_trait;
use dockyard_events::EventEnvelope;
use thiserror::Error;

/// Errors from publishing an event.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PublishError {
    #[error("event bus closed")]
    Closed,
}

/// Sink for events emitted by ingestion handlers.
#[async_trait]
pub trait EventPublisher: Send + Sync + 'static {
    async fn publish(&self, envelope: EventEnvelope) -> Result<(), PublishError>;
}
