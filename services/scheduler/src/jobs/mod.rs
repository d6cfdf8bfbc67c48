//! In-process job transport for lifecycle events.
//!
//! Events published by handlers (and anything else enqueued) are delivered to
//! [`EventIngestion`](crate::ingest::EventIngestion) by a [`JobWorker`].
//! Every delivery goes through [`run_guarded`], which settles it exactly once.

mod queue;
mod retry;
mod runner;
mod worker;

pub use queue::{JobQueue, JobReceiver};
pub use retry::RetryPolicy;
pub use runner::{guard, run_guarded, Delivery, ImmediateDelivery, JobOutcome};
pub use worker::JobWorker;
