//! Unbounded job queue.

use async_trait::async_trait;
use dockyard_events::EventEnvelope;
use tokio::sync::mpsc;
use tracing::debug;

use crate::ingest::{EventPublisher, PublishError};

/// Receiving side of a [`JobQueue`], owned by the [`JobWorker`](super::JobWorker).
pub type JobReceiver = mpsc::UnboundedReceiver<EventEnvelope>;

/// Cloneable sending side of the job queue.
///
/// Doubles as the [`EventPublisher`] for ingestion, so follow-up events run
/// through the same worker and retry loop.
#[derive(Clone)]
pub struct JobQueue {
    tx: mpsc::UnboundedSender<EventEnvelope>,
}

impl JobQueue {
    pub fn channel() -> (Self, JobReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn enqueue(&self, envelope: EventEnvelope) -> Result<(), PublishError> {
        debug!(
            event_id = %envelope.event_id,
            event_type = %envelope.event_type,
            attempt = envelope.attempt,
            "Job enqueued"
        );
        self.tx.send(envelope).map_err(|_| PublishError::Closed)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

#[async_trait]
impl EventPublisher for JobQueue {
    async fn publish(&self, envelope: EventEnvelope) -> Result<(), PublishError> {
        self.enqueue(envelope)
    }
}
