//! Event envelope - the common wrapper for published events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::EventKind;

/// The event envelope - common metadata for every published event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEnvelope {
    /// Unique identifier for this publication.
    pub event_id: Uuid,

    /// When the event was published.
    pub occurred_at: DateTime<Utc>,

    /// The event name (e.g., "dock.removed").
    pub event_type: String,

    /// Number of delivery attempts so far (0 before the first attempt).
    #[serde(default)]
    pub attempt: u32,

    /// Event ID of the event that caused this one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub causation_id: Option<Uuid>,

    /// Event-specific payload.
    pub payload: serde_json::Value,
}

impl EventEnvelope {
    /// Wrap a payload for the given event kind.
    pub fn new(kind: EventKind, payload: serde_json::Value) -> Self {
        Self::named(kind.as_str(), payload)
    }

    /// Wrap a payload under an arbitrary event name.
    pub fn named(event_type: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            event_type: event_type.into(),
            attempt: 0,
            causation_id: None,
            payload,
        }
    }

    /// Record the event that caused this one.
    pub fn caused_by(mut self, causation_id: Uuid) -> Self {
        self.causation_id = Some(causation_id);
        self
    }

    /// The typed event kind, if the name is known.
    pub fn kind(&self) -> Option<EventKind> {
        self.event_type.parse().ok()
    }
}
