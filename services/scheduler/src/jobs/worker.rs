//! Job worker.
//!
//! Pulls events off the [`JobQueue`] and runs each on its own task, so a slow
//! handler never holds up the rest. Retryable failures go back on the queue
//! after a backoff until the attempt budget is spent.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dockyard_events::EventEnvelope;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{error, info, instrument, warn};

use crate::ingest::EventIngestion;

use super::{run_guarded, Delivery, JobQueue, JobReceiver, RetryPolicy};

/// Requeues a failed job on the worker's queue.
struct QueueDelivery {
    queue: JobQueue,
    envelope: EventEnvelope,
    policy: RetryPolicy,
    sleeping: Arc<AtomicUsize>,
}

impl Delivery for QueueDelivery {
    fn ack(self) {}

    fn nack(self, requeue: bool) {
        let attempt = self.envelope.attempt;
        if !requeue {
            return;
        }
        if !self.policy.allows_retry(attempt) {
            error!(
                event_id = %self.envelope.event_id,
                event_type = %self.envelope.event_type,
                attempts = attempt + 1,
                "Retry budget exhausted; dropping event"
            );
            return;
        }

        let delay = self.policy.delay_for(attempt);
        let mut envelope = self.envelope;
        envelope.attempt = attempt + 1;
        let queue = self.queue;
        let sleeping = self.sleeping;
        sleeping.fetch_add(1, Ordering::SeqCst);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            sleeping.fetch_sub(1, Ordering::SeqCst);
            if queue.enqueue(envelope).is_err() {
                error!("Job queue closed; retry lost");
            }
        });
    }
}

/// Runs queued jobs through the event handlers.
pub struct JobWorker {
    ingestion: Arc<EventIngestion>,
    queue: JobQueue,
    rx: JobReceiver,
    policy: RetryPolicy,
    sleeping: Arc<AtomicUsize>,
}

impl JobWorker {
    /// `queue` must be the sending side of `rx`; retries are pushed onto it.
    pub fn new(
        ingestion: Arc<EventIngestion>,
        queue: JobQueue,
        rx: JobReceiver,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            ingestion,
            queue,
            rx,
            policy,
            sleeping: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Run until shutdown is signaled, then wait for in-flight jobs.
    #[instrument(skip_all)]
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(
            max_attempts = self.policy.max_attempts,
            base_delay_ms = self.policy.base_delay.as_millis() as u64,
            "Starting job worker"
        );

        let mut in_flight = JoinSet::new();

        loop {
            tokio::select! {
                job = self.rx.recv() => {
                    let Some(envelope) = job else {
                        break;
                    };
                    let delivery = QueueDelivery {
                        queue: self.queue.clone(),
                        envelope: envelope.clone(),
                        policy: self.policy,
                        sleeping: self.sleeping.clone(),
                    };
                    in_flight.spawn(run_guarded(self.ingestion.clone(), envelope, delivery));
                }
                Some(_) = in_flight.join_next(), if !in_flight.is_empty() => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Job worker shutting down");
                        break;
                    }
                }
            }
        }

        let pending = in_flight.len();
        while in_flight.join_next().await.is_some() {}

        let undelivered = self.drain_undelivered();
        let sleeping = self.sleeping.load(Ordering::SeqCst);
        if undelivered > 0 || sleeping > 0 {
            warn!(undelivered, sleeping_retries = sleeping, "Dropping jobs at shutdown");
        }
        info!(drained = pending, "Job worker stopped");
    }

    /// Close the queue and discard whatever is still on it. Returns the count.
    fn drain_undelivered(&mut self) -> usize {
        self.rx.close();
        let mut dropped = 0usize;
        while self.rx.try_recv().is_ok() {
            dropped += 1;
        }
        dropped
    }
}
