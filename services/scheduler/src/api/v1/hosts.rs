//! Host selection endpoint.
//!
//! Every request goes through the admission queue; handlers never call the
//! selector directly.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;

use crate::api::error::ApiError;
use crate::scheduler::HintRequest;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/optimal", get(optimal_from_query).post(optimal_from_body))
}

#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
#[serde(rename_all = "camelCase")]
pub struct OptimalHostResponse {
    pub dock_host: String,
}

async fn optimal_from_body(
    State(state): State<AppState>,
    Json(request): Json<HintRequest>,
) -> Result<Json<OptimalHostResponse>, ApiError> {
    select(&state, request).await
}

async fn optimal_from_query(
    State(state): State<AppState>,
    Query(request): Query<HintRequest>,
) -> Result<Json<OptimalHostResponse>, ApiError> {
    select(&state, request).await
}

async fn select(
    state: &AppState,
    request: HintRequest,
) -> Result<Json<OptimalHostResponse>, ApiError> {
    let dock_host = state.admission().submit(request).await?;
    Ok(Json(OptimalHostResponse { dock_host }))
}
