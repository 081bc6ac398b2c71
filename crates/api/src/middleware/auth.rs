//! Bearer-token extractor for authenticated handlers.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use reelgen_core::error::CoreError;
use reelgen_core::types::DbId;

use crate::auth::jwt;
use crate::error::AppError;
use crate::state::AppState;

/// The authenticated account behind a request.
///
/// Adding this as a handler parameter makes the route require a valid
/// `Authorization: Bearer <token>` header; requests without one are
/// rejected with 401 before the handler body runs.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// Internal database id from the token's `sub` claim.
    pub user_id: DbId,
}

fn unauthorized(msg: &str) -> AppError {
    AppError::Core(CoreError::Unauthorized(msg.into()))
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| unauthorized("Missing Authorization header"))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| unauthorized("Invalid Authorization format. Expected: Bearer <token>"))?;

        let claims = jwt::validate_token(token, &state.config.jwt)
            .map_err(|_| unauthorized("Invalid or expired token"))?;

        Ok(AuthUser {
            user_id: claims.sub,
        })
    }
}
