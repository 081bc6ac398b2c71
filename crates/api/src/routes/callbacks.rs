//! Route definitions for provider push callbacks.

use axum::routing::post;
use axum::Router;

use crate::handlers::callbacks;
use crate::state::AppState;

/// Routes mounted at `/callbacks`.
///
/// ```text
/// POST /generation -> provider_callback
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/generation", post(callbacks::provider_callback))
}
