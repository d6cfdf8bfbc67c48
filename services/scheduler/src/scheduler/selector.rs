//! End-to-end host selection for one request.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::registry::{DockHost, DockRegistry, WorkloadType};

use super::scoring::{select_optimal, weight, Weights};
use super::{SchedulerError, SchedulerResult};

/// A selection request as it arrives from a transport, before validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HintRequest {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub r#type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev_dock: Option<String>,
}

impl HintRequest {
    pub fn new(workload: WorkloadType) -> Self {
        Self {
            r#type: Some(workload.as_str().to_string()),
            prev_dock: None,
        }
    }

    pub fn with_prev_dock(mut self, prev_dock: impl Into<String>) -> Self {
        self.prev_dock = Some(prev_dock.into());
        self
    }
}

/// A validated selection hint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionHint {
    pub workload: WorkloadType,

    /// Dock the caller used last time, in canonical form when it parses.
    /// Empty strings are treated as absent.
    pub prev_dock: Option<String>,
}

impl TryFrom<&HintRequest> for SelectionHint {
    type Error = SchedulerError;

    fn try_from(request: &HintRequest) -> Result<Self, Self::Error> {
        let raw_type = match request.r#type.as_deref().map(str::trim) {
            None | Some("") => {
                return Err(SchedulerError::InvalidRequest(
                    "request type is required".to_string(),
                ))
            }
            Some(t) => t,
        };

        let workload = raw_type.parse::<WorkloadType>().map_err(|e| {
            SchedulerError::InvalidRequest(format!(
                "request type '{}' is not one of container_run, container_build",
                e.0
            ))
        })?;

        let prev_dock = request
            .prev_dock
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(|p| DockHost::parse(p).map_or_else(|_| p.to_string(), |dock| dock.as_key()));

        Ok(Self {
            workload,
            prev_dock,
        })
    }
}

/// Picks the optimal dock for a request and records the assignment.
pub struct HostSelector {
    registry: DockRegistry,
    weights: Weights,
    prev_dock_override: bool,
}

impl HostSelector {
    pub fn new(registry: DockRegistry, weights: Weights) -> Self {
        Self {
            registry,
            weights,
            prev_dock_override: false,
        }
    }

    /// Return `prevDock` as-is, without scoring, whenever a hint carries one.
    ///
    /// Legacy behaviour: the dock is neither validated nor checked against the
    /// registry. Off by default; affinity normally comes from the history weight.
    pub fn with_prev_dock_override(mut self, enabled: bool) -> Self {
        self.prev_dock_override = enabled;
        self
    }

    pub fn weights(&self) -> &Weights {
        &self.weights
    }

    /// Select a dock for `request` and increment its counter by one.
    ///
    /// Must not run concurrently with itself; callers go through the
    /// admission queue.
    #[instrument(skip(self))]
    pub async fn obtain_optimal_host(&self, request: &HintRequest) -> SchedulerResult<String> {
        let hint = SelectionHint::try_from(request)?;

        if self.prev_dock_override {
            if let Some(prev_dock) = &hint.prev_dock {
                warn!(host = %prev_dock, "Returning previous dock without scoring");
                self.registry
                    .increment_field(prev_dock, hint.workload, 1)
                    .await?;
                return Ok(prev_dock.clone());
            }
        }

        let docks = self.registry.list_valid_docks(None).await?;
        if docks.is_empty() {
            warn!(workload = %hint.workload, "No valid docks to select from");
            return Err(SchedulerError::NoDocksAvailable);
        }

        let chosen = select_optimal(&self.weights, &hint, &docks)?;
        debug!(
            candidates = docks.len(),
            weight = weight(&self.weights, &hint, chosen),
            "Scored docks"
        );

        self.registry
            .increment_field(&chosen.host, hint.workload, 1)
            .await?;

        info!(host = %chosen.host, workload = %hint.workload, "Dock selected");
        Ok(chosen.host.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{CounterField, DEFAULT_INDEX_KEY};
    use crate::store::{MemoryStore, StoreError};
    use std::sync::Arc;

    async fn selector_with(docks: &[(&str, i64, i64)]) -> (HostSelector, DockRegistry, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let registry = DockRegistry::new(store.clone(), DEFAULT_INDEX_KEY);
        for (host, builds, containers) in docks {
            registry.add_host(host, None).await.unwrap();
            registry
                .set_field(host, CounterField::NumBuilds, *builds)
                .await
                .unwrap();
            registry
                .set_field(host, CounterField::NumContainers, *containers)
                .await
                .unwrap();
        }
        let selector = HostSelector::new(registry.clone(), Weights::default());
        (selector, registry, store)
    }

    async fn counters(registry: &DockRegistry, host: &str) -> (i64, i64) {
        let docks = registry.list_valid_docks(None).await.unwrap();
        let dock = docks.iter().find(|d| d.host == host).unwrap();
        (dock.num_builds, dock.num_containers)
    }

    #[test]
    fn test_missing_and_unknown_type_are_distinct() {
        let missing = SelectionHint::try_from(&HintRequest::default()).unwrap_err();
        let unknown = SelectionHint::try_from(&HintRequest {
            r#type: Some("container_stop".to_string()),
            prev_dock: None,
        })
        .unwrap_err();

        match (missing, unknown) {
            (SchedulerError::InvalidRequest(a), SchedulerError::InvalidRequest(b)) => {
                assert_ne!(a, b);
                assert!(b.contains("container_stop"));
            }
            other => panic!("unexpected errors: {other:?}"),
        }
    }

    #[test]
    fn test_hint_request_deserializes_wire_names() {
        let request: HintRequest = serde_json::from_value(serde_json::json!({
            "type": "container_run",
            "prevDock": "http://10.0.0.1:4242"
        }))
        .unwrap();
        let hint = SelectionHint::try_from(&request).unwrap();
        assert_eq!(hint.workload, WorkloadType::ContainerRun);
        assert_eq!(hint.prev_dock.as_deref(), Some("http://10.0.0.1:4242"));
    }

    #[test]
    fn test_prev_dock_is_canonicalised_when_it_parses() {
        let hint = SelectionHint::try_from(
            &HintRequest::new(WorkloadType::ContainerRun).with_prev_dock(" http://10.0.0.1:4242/ "),
        )
        .unwrap();
        assert_eq!(hint.prev_dock.as_deref(), Some("http://10.0.0.1:4242"));

        let hint = SelectionHint::try_from(
            &HintRequest::new(WorkloadType::ContainerRun).with_prev_dock("dock-a"),
        )
        .unwrap();
        assert_eq!(hint.prev_dock.as_deref(), Some("dock-a"));
    }

    #[tokio::test]
    async fn test_selects_least_loaded_build_dock() {
        let (selector, registry, _) = selector_with(&[
            ("http://10.0.0.1:4242", 2, 0),
            ("http://10.0.0.2:4242", 1, 0),
            ("http://10.0.0.3:4242", 3, 0),
        ])
        .await;

        let host = selector
            .obtain_optimal_host(&HintRequest::new(WorkloadType::ContainerBuild))
            .await
            .unwrap();
        assert_eq!(host, "http://10.0.0.2:4242");
        assert_eq!(counters(&registry, &host).await, (2, 0));
    }

    #[tokio::test]
    async fn test_run_selection_increments_containers_only() {
        let (selector, registry, _) = selector_with(&[("http://10.0.0.1:4242", 0, 4)]).await;

        let host = selector
            .obtain_optimal_host(&HintRequest::new(WorkloadType::ContainerRun))
            .await
            .unwrap();
        assert_eq!(counters(&registry, &host).await, (0, 5));
    }

    #[tokio::test]
    async fn test_prev_dock_affinity_wins_equal_load() {
        let (selector, _, _) = selector_with(&[
            ("http://10.0.0.1:4242", 1, 1),
            ("http://10.0.0.2:4242", 1, 1),
        ])
        .await;

        let host = selector
            .obtain_optimal_host(
                &HintRequest::new(WorkloadType::ContainerRun).with_prev_dock("http://10.0.0.2:4242"),
            )
            .await
            .unwrap();
        assert_eq!(host, "http://10.0.0.2:4242");
    }

    #[tokio::test]
    async fn test_prev_dock_with_trailing_slash_keeps_affinity() {
        let (selector, _, _) = selector_with(&[
            ("http://10.0.0.1:4242", 1, 1),
            ("http://10.0.0.2:4242", 1, 1),
        ])
        .await;

        let host = selector
            .obtain_optimal_host(
                &HintRequest::new(WorkloadType::ContainerRun).with_prev_dock("http://10.0.0.2:4242/"),
            )
            .await
            .unwrap();
        assert_eq!(host, "http://10.0.0.2:4242");
    }

    #[tokio::test]
    async fn test_prev_dock_is_scored_by_default() {
        let (selector, _, _) = selector_with(&[
            ("http://10.0.0.1:4242", 0, 0),
            ("http://10.0.0.2:4242", 5, 5),
        ])
        .await;

        let host = selector
            .obtain_optimal_host(
                &HintRequest::new(WorkloadType::ContainerRun).with_prev_dock("http://10.0.0.2:4242"),
            )
            .await
            .unwrap();
        assert_eq!(host, "http://10.0.0.1:4242");
    }

    #[tokio::test]
    async fn test_prev_dock_override_skips_scoring() {
        let (selector, registry, _) = selector_with(&[
            ("http://10.0.0.1:4242", 0, 0),
            ("http://10.0.0.2:4242", 5, 5),
        ])
        .await;
        let selector = selector.with_prev_dock_override(true);

        let host = selector
            .obtain_optimal_host(
                &HintRequest::new(WorkloadType::ContainerRun).with_prev_dock("http://10.0.0.2:4242"),
            )
            .await
            .unwrap();
        assert_eq!(host, "http://10.0.0.2:4242");
        assert_eq!(counters(&registry, &host).await, (5, 6));
    }

    #[tokio::test]
    async fn test_no_docks_available() {
        let (selector, _, _) = selector_with(&[]).await;
        let err = selector
            .obtain_optimal_host(&HintRequest::new(WorkloadType::ContainerRun))
            .await
            .unwrap_err();
        assert!(matches!(err, SchedulerError::NoDocksAvailable));
    }

    #[tokio::test]
    async fn test_invalid_type_fails_before_store_access() {
        let (selector, _, store) = selector_with(&[]).await;
        store.set_available(false);
        let err = selector
            .obtain_optimal_host(&HintRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_store_outage_is_store_unavailable() {
        let (selector, _, store) = selector_with(&[("http://10.0.0.1:4242", 0, 0)]).await;
        store.set_available(false);
        let err = selector
            .obtain_optimal_host(&HintRequest::new(WorkloadType::ContainerBuild))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SchedulerError::StoreUnavailable(StoreError::Unavailable(_))
        ));
    }
}
