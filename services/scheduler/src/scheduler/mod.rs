//! Host selection.
//!
//! The scheduler is responsible for:
//! - Validating selection hints
//! - Scoring every valid dock and picking the least loaded one
//! - Recording the assignment by incrementing the chosen dock's counter
//! - Serializing selections through a single-worker admission queue so the
//!   read-score-increment sequence never interleaves

mod admission;
mod error;
mod scoring;
mod selector;

pub use admission::{AdmissionHandle, AdmissionQueue, AdmissionStats, TaskState};
pub use error::{SchedulerError, SchedulerResult};
pub use scoring::{select_optimal, weight, Weights};
pub use selector::{HintRequest, HostSelector, SelectionHint};
