//! Synchronous event delivery.
//!
//! The pub/sub path: the handler runs inside the request and the response
//! tells the publisher whether to redeliver.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use dockyard_events::EventEnvelope;

use crate::jobs::{run_guarded, ImmediateDelivery, JobOutcome};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/{event_name}", post(deliver_event))
}

async fn deliver_event(
    State(state): State<AppState>,
    Path(event_name): Path<String>,
    Json(payload): Json<serde_json::Value>,
) -> (StatusCode, Json<JobOutcome>) {
    let envelope = EventEnvelope::named(event_name, payload);
    let outcome = run_guarded(state.ingestion().clone(), envelope, ImmediateDelivery).await;

    let status = if outcome.is_retry() {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };
    (status, Json(outcome))
}
