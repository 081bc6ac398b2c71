pub mod admin;
pub mod auth;
pub mod callbacks;
pub mod generation;
pub mod health;
pub mod rewards;

use axum::routing::get;
use axum::Router;

use crate::handlers;
use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /auth/register                   create account (public)
/// /auth/login                      username + password login (public)
/// /auth/device                     anonymous device session (public)
///
/// /me                              current account + credit balance
///
/// /generations                     submit (POST), list (GET)
/// /generations/{public_id}         job detail (GET)
/// /generations/{public_id}/enhance start enhancement (POST)
///
/// /callbacks/generation            provider push callback (public)
///
/// /rewards                         active reward videos (GET)
/// /rewards/{id}/watch              record watch progress (POST)
/// /rewards/{id}/claim              claim reward credits (POST)
///
/// /admin/api-keys                  list (GET), register (POST)  [admin token]
/// /admin/api-keys/{id}             update (PATCH)               [admin token]
/// /admin/settings                  list (GET)                   [admin token]
/// /admin/settings/{key}            upsert (PUT)                 [admin token]
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .route("/me", get(handlers::auth::me))
        .nest("/generations", generation::router())
        .nest("/callbacks", callbacks::router())
        .nest("/rewards", rewards::router())
        .nest("/admin", admin::router())
}
