//! Route definitions for the `/generations` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::generation;
use crate::state::AppState;

/// Routes mounted at `/generations`.
///
/// ```text
/// POST /                       -> submit
/// GET  /                       -> list
/// GET  /{public_id}            -> get_by_id
/// POST /{public_id}/enhance    -> enhance
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(generation::submit).get(generation::list))
        .route("/{public_id}", get(generation::get_by_id))
        .route("/{public_id}/enhance", post(generation::enhance))
}
