//! Dockyard scheduler library.
//!
//! This crate ships the `dockyard-scheduler` binary; the library surface
//! exists for integration testing and reuse.

pub mod api;
pub mod cluster;
pub mod config;
pub mod ingest;
pub mod jobs;
pub mod registry;
pub mod scheduler;
pub mod state;
pub mod store;
