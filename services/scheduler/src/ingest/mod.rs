//! Event ingestion.
//!
//! Translates dock and container lifecycle events into registry mutations.
//! Handlers behave the same whether the event arrived over HTTP or through
//! the job queue; the transport only decides what to do with the outcome
//! (see [`crate::jobs::run_guarded`]).

mod classify;
mod error;
mod handlers;
mod publish;

pub use classify::{WorkloadClassifier, DEFAULT_IMAGE_BUILDER, DEFAULT_REGISTRY};
pub use error::{HandlerError, HandlerResult};
pub use handlers::EventIngestion;
pub use publish::{EventPublisher, PublishError};
