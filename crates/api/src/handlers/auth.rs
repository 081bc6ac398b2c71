//! Handlers for the `/auth` resource (register, login, device sessions).

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use reelgen_core::credits::STARTING_CREDITS;
use reelgen_core::error::CoreError;
use reelgen_db::models::user::{CreateUser, User, UserResponse};
use reelgen_db::repositories::UserRepo;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::jwt::generate_access_token;
use crate::auth::password::{hash_password, validate_password_strength, verify_password};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Minimum accepted username length.
const MIN_USERNAME_LENGTH: usize = 3;
/// Maximum accepted username length.
const MAX_USERNAME_LENGTH: usize = 32;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /auth/register` and `POST /auth/login`.
#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub username: String,
    pub password: String,
}

/// Request body for `POST /auth/device`.
#[derive(Debug, Deserialize)]
pub struct DeviceRequest {
    pub device_id: String,
}

/// Successful authentication response.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    pub user: UserResponse,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/auth/register
///
/// Create an account with username + password. New accounts start with a
/// fixed credit grant. Duplicate usernames surface as 409 through the
/// unique constraint.
pub async fn register(
    State(state): State<AppState>,
    Json(input): Json<CredentialsRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    let username = input.username.trim();
    let username_chars = username.chars().count();
    if !(MIN_USERNAME_LENGTH..=MAX_USERNAME_LENGTH).contains(&username_chars) {
        return Err(CoreError::Validation(format!(
            "Username must be between {MIN_USERNAME_LENGTH} and {MAX_USERNAME_LENGTH} characters"
        ))
        .into());
    }
    validate_password_strength(&input.password).map_err(CoreError::Validation)?;

    let password_hash = hash_password(&input.password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;

    let user = UserRepo::create(
        &state.pool,
        &CreateUser {
            username: username.to_string(),
            password_hash,
            credits: STARTING_CREDITS,
            device_id: None,
        },
    )
    .await?;

    tracing::info!(user_id = user.id, username = %user.username, "User registered");

    let response = auth_response(&state, &user)?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /api/v1/auth/login
///
/// Authenticate with username + password. A missing user and a wrong
/// password return the same 401 body.
pub async fn login(
    State(state): State<AppState>,
    Json(input): Json<CredentialsRequest>,
) -> AppResult<Json<AuthResponse>> {
    let user = UserRepo::find_by_username(&state.pool, input.username.trim())
        .await?
        .ok_or_else(|| invalid_credentials())?;

    let password_valid = verify_password(&input.password, &user.password_hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;

    if !password_valid {
        return Err(invalid_credentials());
    }

    tracing::info!(user_id = user.id, "User logged in");

    Ok(Json(auth_response(&state, &user)?))
}

/// POST /api/v1/auth/device
///
/// Anonymous device session: find or create the account bound to this
/// device identifier. First contact from a device creates an account with
/// the standard starting grant.
pub async fn device_login(
    State(state): State<AppState>,
    Json(input): Json<DeviceRequest>,
) -> AppResult<Json<AuthResponse>> {
    let device_id = input.device_id.trim();
    if device_id.is_empty() {
        return Err(CoreError::Validation("device_id must not be empty".into()).into());
    }

    let user = match UserRepo::find_by_device(&state.pool, device_id).await? {
        Some(user) => user,
        None => {
            // Device accounts never log in with a password; store an
            // unguessable hash so the credential path stays closed.
            let password_hash = hash_password(&Uuid::new_v4().to_string())
                .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;

            let user = UserRepo::create(
                &state.pool,
                &CreateUser {
                    username: format!("device-{}", Uuid::new_v4()),
                    password_hash,
                    credits: STARTING_CREDITS,
                    device_id: Some(device_id.to_string()),
                },
            )
            .await?;
            tracing::info!(user_id = user.id, "Device account created");
            user
        }
    };

    Ok(Json(auth_response(&state, &user)?))
}

/// GET /api/v1/me
///
/// Current account, including the live credit balance.
pub async fn me(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<DataResponse<UserResponse>>> {
    let user = UserRepo::find_by_id(&state.pool, auth.user_id)
        .await?
        .ok_or_else(|| CoreError::NotFound {
            entity: "user",
            id: auth.user_id.to_string(),
        })?;

    Ok(Json(DataResponse::new(UserResponse::from(&user))))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn invalid_credentials() -> AppError {
    AppError::Core(CoreError::Unauthorized("Invalid username or password".into()))
}

fn auth_response(state: &AppState, user: &User) -> Result<AuthResponse, AppError> {
    let access_token = generate_access_token(user.id, &state.config.jwt)
        .map_err(|e| AppError::InternalError(format!("Token generation error: {e}")))?;

    Ok(AuthResponse {
        access_token,
        expires_in: state.config.jwt.access_token_expiry_mins * 60,
        user: UserResponse::from(user),
    })
}
