//! Route definitions for the `/rewards` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::rewards;
use crate::state::AppState;

/// Routes mounted at `/rewards`.
///
/// ```text
/// GET  /            -> list
/// POST /{id}/watch  -> watch
/// POST /{id}/claim  -> claim
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(rewards::list))
        .route("/{id}/watch", post(rewards::watch))
        .route("/{id}/claim", post(rewards::claim))
}
