//! Dock registry administration.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::registry::{CounterField, DockRecord, RawDockRecord};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_docks).post(add_dock).delete(remove_dock))
        .route("/raw", get(list_raw_docks))
        .route("/fields", put(set_field))
}

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct ListDocksQuery {
    #[serde(default)]
    pub tag: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ListDocksResponse {
    pub items: Vec<DockRecord>,
}

#[derive(Debug, Serialize)]
pub struct ListRawDocksResponse {
    pub items: Vec<RawDockRecord>,
}

#[derive(Debug, Deserialize)]
pub struct AddDockRequest {
    pub host: String,

    /// Comma separated labels. Omit to keep the stored labels.
    #[serde(default)]
    pub tags: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DockResponse {
    /// Canonical dock URL used as the registry key.
    pub host: String,
}

#[derive(Debug, Deserialize)]
pub struct RemoveDockQuery {
    pub host: String,
}

#[derive(Debug, Deserialize)]
pub struct SetFieldRequest {
    pub host: String,
    pub key: String,
    pub value: i64,
}

// =============================================================================
// Handlers
// =============================================================================

async fn list_docks(
    State(state): State<AppState>,
    Query(query): Query<ListDocksQuery>,
) -> Result<Json<ListDocksResponse>, ApiError> {
    let tag = query.tag.as_deref().map(str::trim).filter(|t| !t.is_empty());
    let items = state.registry().list_valid_docks(tag).await?;
    Ok(Json(ListDocksResponse { items }))
}

async fn list_raw_docks(
    State(state): State<AppState>,
) -> Result<Json<ListRawDocksResponse>, ApiError> {
    let items = state.registry().list_all_docks().await?;
    Ok(Json(ListRawDocksResponse { items }))
}

async fn add_dock(
    State(state): State<AppState>,
    Json(request): Json<AddDockRequest>,
) -> Result<Json<DockResponse>, ApiError> {
    let dock = state
        .registry()
        .add_host(&request.host, request.tags.as_deref())
        .await?;
    Ok(Json(DockResponse {
        host: dock.as_key(),
    }))
}

async fn remove_dock(
    State(state): State<AppState>,
    Query(query): Query<RemoveDockQuery>,
) -> Result<StatusCode, ApiError> {
    state.registry().delete_host(&query.host).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn set_field(
    State(state): State<AppState>,
    Json(request): Json<SetFieldRequest>,
) -> Result<StatusCode, ApiError> {
    let field: CounterField = request.key.parse().map_err(|_| {
        ApiError::bad_request(
            "invalid_field",
            format!(
                "field '{}' is not one of numBuilds, numContainers",
                request.key
            ),
        )
    })?;

    state
        .registry()
        .set_field(&request.host, field, request.value)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
