//! # dockyard-events
//!
//! Lifecycle event definitions shared by the dockyard scheduler and its tooling.
//!
//! ## Design Principles
//!
//! - Payloads mirror what the event bus delivers; required fields stay optional
//!   at this layer so handlers can reject incomplete events explicitly
//! - Event names are stable strings; [`EventKind`] is the typed view of them
//! - Outbound events are wrapped in an [`EventEnvelope`] before publishing
//!
//! ## Event Types
//!
//! - Container events (`container.*`): workload lifecycle on a dock
//! - Dock events (`dock.*`): a dock joining, leaving, or being evicted

mod envelope;
mod error;
mod types;

pub use envelope::*;
pub use error::EventError;
pub use types::*;
