//! Admin handlers for the provider credential pool.
//!
//! Admin access is controlled with a static token (`ADMIN_TOKEN`) sent as
//! `X-Admin-Token`; there is no role system on user accounts.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use reelgen_core::error::CoreError;
use reelgen_core::types::DbId;
use reelgen_db::models::provider_key::{CreateProviderKey, ProviderKey, UpdateProviderKey};
use reelgen_db::repositories::ProviderKeyRepo;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Reject the request unless it carries the configured admin token.
pub(crate) fn require_admin(state: &AppState, headers: &HeaderMap) -> Result<(), AppError> {
    let presented = headers
        .get("x-admin-token")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    match &state.config.admin_token {
        Some(expected) if !expected.is_empty() && presented == expected => Ok(()),
        _ => Err(CoreError::Forbidden("Admin access required".into()).into()),
    }
}

/// GET /api/v1/admin/api-keys
pub async fn list(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<Json<DataResponse<Vec<ProviderKey>>>> {
    require_admin(&state, &headers)?;
    let keys = ProviderKeyRepo::list(&state.pool).await?;
    Ok(Json(DataResponse::new(keys)))
}

/// POST /api/v1/admin/api-keys
pub async fn create(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<CreateProviderKey>,
) -> AppResult<(StatusCode, Json<DataResponse<ProviderKey>>)> {
    require_admin(&state, &headers)?;

    if input.name.trim().is_empty() {
        return Err(CoreError::Validation("name must not be empty".into()).into());
    }
    if input.secret.trim().is_empty() {
        return Err(CoreError::Validation("secret must not be empty".into()).into());
    }
    if input.remaining_credits < 0 {
        return Err(
            CoreError::Validation("remaining_credits must not be negative".into()).into(),
        );
    }

    let key = ProviderKeyRepo::create(&state.pool, &input).await?;
    tracing::info!(key_id = key.id, name = %key.name, "Provider credential registered");

    Ok((StatusCode::CREATED, Json(DataResponse::new(key))))
}

/// PATCH /api/v1/admin/api-keys/{id}
pub async fn update(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateProviderKey>,
) -> AppResult<Json<DataResponse<ProviderKey>>> {
    require_admin(&state, &headers)?;

    let key = ProviderKeyRepo::update(&state.pool, id, &input)
        .await?
        .ok_or_else(|| CoreError::NotFound {
            entity: "provider key",
            id: id.to_string(),
        })?;

    Ok(Json(DataResponse::new(key)))
}
