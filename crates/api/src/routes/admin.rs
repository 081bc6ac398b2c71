//! Route definitions for admin endpoints (provider credential pool,
//! runtime settings).

use axum::routing::{get, patch, put};
use axum::Router;

use crate::handlers::{provider_keys, settings};
use crate::state::AppState;

/// Routes mounted at `/admin`. All require the admin token header.
///
/// ```text
/// GET   /api-keys       -> list
/// POST  /api-keys       -> create
/// PATCH /api-keys/{id}  -> update
/// GET   /settings       -> list
/// PUT   /settings/{key} -> upsert
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api-keys",
            get(provider_keys::list).post(provider_keys::create),
        )
        .route("/api-keys/{id}", patch(provider_keys::update))
        .route("/settings", get(settings::list))
        .route("/settings/{key}", put(settings::upsert))
}
