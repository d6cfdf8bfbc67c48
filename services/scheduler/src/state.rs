//! Application state shared across request handlers.

use std::sync::Arc;

use crate::ingest::EventIngestion;
use crate::registry::DockRegistry;
use crate::scheduler::AdmissionHandle;

/// Shared application state.
///
/// This is passed to all request handlers via Axum's state extractor.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    registry: DockRegistry,
    admission: AdmissionHandle,
    ingestion: Arc<EventIngestion>,
}

impl AppState {
    pub fn new(
        registry: DockRegistry,
        admission: AdmissionHandle,
        ingestion: Arc<EventIngestion>,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                registry,
                admission,
                ingestion,
            }),
        }
    }

    pub fn registry(&self) -> &DockRegistry {
        &self.inner.registry
    }

    /// Submission side of the selection queue.
    pub fn admission(&self) -> &AdmissionHandle {
        &self.inner.admission
    }

    pub fn ingestion(&self) -> &Arc<EventIngestion> {
        &self.inner.ingestion
    }
}
