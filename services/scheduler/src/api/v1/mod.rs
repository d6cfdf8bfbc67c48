//! API v1 routes.

mod docks;
mod events;
mod hosts;

use axum::Router;

use crate::state::AppState;

/// Create API v1 routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/hosts", hosts::routes())
        .nest("/docks", docks::routes())
        .nest("/events", events::routes())
}
