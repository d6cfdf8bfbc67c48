//! Single-flight admission queue for host selection.
//!
//! Every selection request becomes a task on an unbounded FIFO queue drained
//! by exactly one worker. The worker runs each selection to completion,
//! including its store round trips, before taking the next task, so two
//! requests never read the same pre-increment load.
//!
//! Task lifecycle: `Queued -> Running -> Completed`. Tasks cannot be
//! cancelled. The queue has no bound: back-pressure shows up only as queue
//! growth, visible through [`AdmissionHandle::stats`].

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::{HintRequest, HostSelector, SchedulerError, SchedulerResult};

/// Lifecycle state of a selection task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Queued,
    Running,
    Completed,
}

/// Snapshot of queue counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct AdmissionStats {
    /// Tasks waiting for the worker.
    pub queued: usize,
    /// Tasks the worker has finished since startup.
    pub completed: u64,
}

#[derive(Debug, Default)]
struct Counters {
    queued: AtomicUsize,
    completed: AtomicU64,
}

struct SelectionTask {
    id: Uuid,
    request: HintRequest,
    enqueued_at: Instant,
    reply: oneshot::Sender<SchedulerResult<String>>,
}

/// Cloneable submission side of the queue, handed to transports.
#[derive(Clone)]
pub struct AdmissionHandle {
    tx: mpsc::UnboundedSender<SelectionTask>,
    counters: Arc<Counters>,
}

impl AdmissionHandle {
    /// Queue a selection and wait for its result.
    pub async fn submit(&self, request: HintRequest) -> SchedulerResult<String> {
        let (reply, result) = oneshot::channel();
        let task = SelectionTask {
            id: Uuid::new_v4(),
            request,
            enqueued_at: Instant::now(),
            reply,
        };
        let task_id = task.id;

        self.counters.queued.fetch_add(1, Ordering::SeqCst);
        if self.tx.send(task).is_err() {
            self.counters.queued.fetch_sub(1, Ordering::SeqCst);
            return Err(SchedulerError::QueueClosed);
        }
        debug!(task_id = %task_id, state = ?TaskState::Queued, "Selection task queued");

        result.await.map_err(|_| SchedulerError::QueueClosed)?
    }

    pub fn stats(&self) -> AdmissionStats {
        AdmissionStats {
            queued: self.counters.queued.load(Ordering::SeqCst),
            completed: self.counters.completed.load(Ordering::SeqCst),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Worker side of the queue. Owns the selector.
pub struct AdmissionQueue {
    selector: HostSelector,
    rx: mpsc::UnboundedReceiver<SelectionTask>,
    counters: Arc<Counters>,
}

impl AdmissionQueue {
    /// Create the queue and its submission handle.
    pub fn new(selector: HostSelector) -> (Self, AdmissionHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let counters = Arc::new(Counters::default());
        let queue = Self {
            selector,
            rx,
            counters: counters.clone(),
        };
        (queue, AdmissionHandle { tx, counters })
    }

    /// Create the queue and run its worker on a background task.
    pub fn spawn(
        selector: HostSelector,
        shutdown: watch::Receiver<bool>,
    ) -> (AdmissionHandle, JoinHandle<()>) {
        let (queue, handle) = Self::new(selector);
        let worker = tokio::spawn(queue.run(shutdown));
        (handle, worker)
    }

    /// Drain tasks one at a time until shutdown is signaled or every handle is dropped.
    ///
    /// A task already running when shutdown arrives is finished first.
    /// Tasks still queued at that point are dropped and their callers see
    /// [`SchedulerError::QueueClosed`].
    #[instrument(skip_all)]
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!("Starting admission queue worker");

        loop {
            tokio::select! {
                task = self.rx.recv() => {
                    match task {
                        Some(task) => self.process(task).await,
                        None => {
                            info!("All admission handles dropped");
                            break;
                        }
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Admission queue worker shutting down");
                        break;
                    }
                }
            }
        }

        self.rx.close();
        let mut dropped = 0usize;
        while self.rx.try_recv().is_ok() {
            dropped += 1;
        }
        self.counters.queued.fetch_sub(dropped, Ordering::SeqCst);
        info!(dropped, "Admission queue worker stopped");
    }

    async fn process(&self, task: SelectionTask) {
        self.counters.queued.fetch_sub(1, Ordering::SeqCst);
        debug!(
            task_id = %task.id,
            state = ?TaskState::Running,
            waited_ms = task.enqueued_at.elapsed().as_millis() as u64,
            "Selection task started"
        );

        let result = self.selector.obtain_optimal_host(&task.request).await;

        self.counters.completed.fetch_add(1, Ordering::SeqCst);
        debug!(
            task_id = %task.id,
            state = ?TaskState::Completed,
            ok = result.is_ok(),
            "Selection task finished"
        );

        if task.reply.send(result).is_err() {
            debug!(task_id = %task.id, "Caller gone before selection finished");
        }
    }
}
