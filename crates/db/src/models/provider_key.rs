//! Provider credential pool models and DTOs.

use reelgen_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `provider_keys` table.
///
/// **Note:** `secret` is the upstream API key material and is never
/// serialized to responses.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ProviderKey {
    pub id: DbId,
    pub name: String,
    #[serde(skip_serializing)]
    pub secret: String,
    pub is_active: bool,
    pub remaining_credits: i32,
    pub last_checked_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

/// DTO for registering a new provider credential.
#[derive(Debug, Deserialize)]
pub struct CreateProviderKey {
    pub name: String,
    pub secret: String,
    pub remaining_credits: i32,
}

/// DTO for updating an existing provider credential. All fields optional.
#[derive(Debug, Deserialize)]
pub struct UpdateProviderKey {
    pub name: Option<String>,
    pub is_active: Option<bool>,
    pub remaining_credits: Option<i32>,
}
