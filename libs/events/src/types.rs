//! Event type definitions for dock and container lifecycle events.
//!
//! Payload fields that handlers must validate are kept as `Option` so that a
//! malformed delivery still decodes and can be rejected as non-retryable.

use std::fmt;
use std::str::FromStr;

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::EventError;

// =============================================================================
// Event Type Constants
// =============================================================================

/// All event type names as constants.
pub mod event_types {
    // Container
    pub const CONTAINER_DIED: &str = "container.died";
    pub const CONTAINER_DESTROYED: &str = "container.destroyed";

    // Dock
    pub const DOCK_UP: &str = "dock.up";
    pub const DOCK_DOWN: &str = "dock.down";
    pub const DOCK_UNHEALTHY: &str = "dock.unhealthy";
    pub const DOCK_WAIT_FOR_REMOVAL: &str = "dock.wait-for-removal";
    pub const DOCK_REMOVED: &str = "dock.removed";
    pub const DOCK_REPLACEMENT_REQUESTED: &str = "dock.replacement-requested";
}

/// Typed view of the event names above.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ContainerDied,
    ContainerDestroyed,
    DockUp,
    DockDown,
    DockUnhealthy,
    DockWaitForRemoval,
    DockRemoved,
    DockReplacementRequested,
}

impl EventKind {
    pub const ALL: [EventKind; 8] = [
        EventKind::ContainerDied,
        EventKind::ContainerDestroyed,
        EventKind::DockUp,
        EventKind::DockDown,
        EventKind::DockUnhealthy,
        EventKind::DockWaitForRemoval,
        EventKind::DockRemoved,
        EventKind::DockReplacementRequested,
    ];

    pub fn as_str(&self) -> &'static str {
        use event_types::*;
        match self {
            EventKind::ContainerDied => CONTAINER_DIED,
            EventKind::ContainerDestroyed => CONTAINER_DESTROYED,
            EventKind::DockUp => DOCK_UP,
            EventKind::DockDown => DOCK_DOWN,
            EventKind::DockUnhealthy => DOCK_UNHEALTHY,
            EventKind::DockWaitForRemoval => DOCK_WAIT_FOR_REMOVAL,
            EventKind::DockRemoved => DOCK_REMOVED,
            EventKind::DockReplacementRequested => DOCK_REPLACEMENT_REQUESTED,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = EventError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| EventError::UnknownEventType(s.to_string()))
    }
}

// =============================================================================
// Event Payloads
// =============================================================================

/// Payload of `container.died` / `container.destroyed`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerLifecyclePayload {
    /// IP address of the dock the container ran on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,

    /// Dock URL (`scheme://ip:port`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    /// Image the container was started from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,

    /// Comma separated dock labels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,

    /// Raw container inspect output, passed through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inspect_data: Option<serde_json::Value>,
}

/// Payload of `dock.up`, `dock.down` and `dock.unhealthy`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DockLifecyclePayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,
}

/// Payload of `dock.wait-for-removal`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaitForRemovalPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docker_url: Option<String>,
}

/// Payload of `dock.removed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DockRemovedPayload {
    pub host: String,
}

/// Payload of `dock.replacement-requested`, emitted after an unhealthy dock
/// has been evicted so capacity can be provisioned elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DockReplacementRequestedPayload {
    pub host: String,
}

/// Decode a JSON payload into one of the payload types.
pub fn decode_payload<T: DeserializeOwned>(value: serde_json::Value) -> Result<T, EventError> {
    serde_json::from_value(value).map_err(|e| EventError::InvalidPayload(e.to_string()))
}
