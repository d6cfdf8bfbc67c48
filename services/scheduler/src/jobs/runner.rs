//! Top-level task wrapper for event handlers.

use std::future::Future;
use std::sync::Arc;

use dockyard_events::EventEnvelope;
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::ingest::{EventIngestion, HandlerResult};

/// Settlement side of a delivered job.
///
/// Both methods consume the delivery so it can only be settled once.
pub trait Delivery: Send + 'static {
    /// The job is finished, successfully or not, and must not be redelivered.
    fn ack(self);

    /// The job did not finish. With `requeue` the transport delivers it again.
    fn nack(self, requeue: bool);
}

/// Delivery for synchronous transports, where the caller reads the outcome directly.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImmediateDelivery;

impl Delivery for ImmediateDelivery {
    fn ack(self) {}

    fn nack(self, _requeue: bool) {}
}

/// How a handler invocation was settled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum JobOutcome {
    Completed,
    Dropped { detail: String },
    Retry { detail: String },
}

impl JobOutcome {
    pub fn is_retry(&self) -> bool {
        matches!(self, JobOutcome::Retry { .. })
    }
}

/// Run the ingestion handler for `envelope` and settle `delivery`.
pub async fn run_guarded<D: Delivery>(
    ingestion: Arc<EventIngestion>,
    envelope: EventEnvelope,
    delivery: D,
) -> JobOutcome {
    let event_id = envelope.event_id;
    let event_type = envelope.event_type.clone();
    debug!(%event_id, %event_type, attempt = envelope.attempt, "Running event handler");

    guard(async move { ingestion.handle(&envelope).await }, delivery).await
}

/// Run `job` on its own task and settle `delivery` from the result.
///
/// Success acks. Fatal errors and panics ack and drop the job. Retryable
/// errors nack with requeue.
pub async fn guard<F, D>(job: F, delivery: D) -> JobOutcome
where
    F: Future<Output = HandlerResult<()>> + Send + 'static,
    D: Delivery,
{
    match tokio::spawn(job).await {
        Ok(Ok(())) => {
            delivery.ack();
            JobOutcome::Completed
        }
        Ok(Err(e)) if e.is_retryable() => {
            warn!(error = %e, "Event handler failed; will retry");
            delivery.nack(true);
            JobOutcome::Retry {
                detail: e.to_string(),
            }
        }
        Ok(Err(e)) => {
            error!(error = %e, "Event handler failed; dropping event");
            delivery.ack();
            JobOutcome::Dropped {
                detail: e.to_string(),
            }
        }
        Err(join_error) => {
            let detail = if join_error.is_panic() {
                "event handler panicked".to_string()
            } else {
                "event handler was cancelled".to_string()
            };
            error!(error = %join_error, "{detail}; dropping event");
            delivery.ack();
            JobOutcome::Dropped { detail }
        }
    }
}
