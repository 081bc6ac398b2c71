//! Admin handlers for runtime settings.
//!
//! Settings are opaque key/value strings; the server does not interpret
//! them beyond storage. Gated by the same static admin token as the
//! credential pool.

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use reelgen_core::error::CoreError;
use reelgen_db::models::setting::Setting;
use reelgen_db::repositories::SettingRepo;
use serde::Deserialize;

use crate::error::AppResult;
use crate::handlers::provider_keys::require_admin;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for `PUT /admin/settings/{key}`.
#[derive(Debug, Deserialize)]
pub struct SetSettingRequest {
    pub value: String,
}

/// GET /api/v1/admin/settings
pub async fn list(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<Json<DataResponse<Vec<Setting>>>> {
    require_admin(&state, &headers)?;
    let settings = SettingRepo::list(&state.pool).await?;
    Ok(Json(DataResponse::new(settings)))
}

/// PUT /api/v1/admin/settings/{key}
///
/// Creates the key on first write, overwrites on later ones.
pub async fn upsert(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(key): Path<String>,
    Json(input): Json<SetSettingRequest>,
) -> AppResult<Json<DataResponse<Setting>>> {
    require_admin(&state, &headers)?;

    let key = key.trim();
    if key.is_empty() {
        return Err(CoreError::Validation("setting key must not be empty".into()).into());
    }

    let setting = SettingRepo::set(&state.pool, key, &input.value).await?;
    tracing::info!(key = %setting.key, "Setting updated");

    Ok(Json(DataResponse::new(setting)))
}
