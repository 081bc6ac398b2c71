//! Repository for the `provider_keys` table (upstream credential pool).

use reelgen_core::types::DbId;
use sqlx::PgPool;

use crate::models::provider_key::{CreateProviderKey, ProviderKey, UpdateProviderKey};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, name, secret, is_active, remaining_credits, last_checked_at, created_at";

/// Provides CRUD and rotation operations for provider credentials.
pub struct ProviderKeyRepo;

impl ProviderKeyRepo {
    /// Register a new credential, returning the created row.
    pub async fn create(
        pool: &PgPool,
        input: &CreateProviderKey,
    ) -> Result<ProviderKey, sqlx::Error> {
        let query = format!(
            "INSERT INTO provider_keys (name, secret, remaining_credits)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ProviderKey>(&query)
            .bind(&input.name)
            .bind(&input.secret)
            .bind(input.remaining_credits)
            .fetch_one(pool)
            .await
    }

    /// Find a credential by ID.
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<ProviderKey>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM provider_keys WHERE id = $1");
        sqlx::query_as::<_, ProviderKey>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List all credentials, newest first.
    pub async fn list(pool: &PgPool) -> Result<Vec<ProviderKey>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM provider_keys ORDER BY created_at DESC");
        sqlx::query_as::<_, ProviderKey>(&query).fetch_all(pool).await
    }

    /// Pick an active credential with at least `cost` credits remaining.
    ///
    /// Least-recently-used first so load spreads across the pool.
    pub async fn pick_active(
        pool: &PgPool,
        cost: i32,
    ) -> Result<Option<ProviderKey>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM provider_keys \
             WHERE is_active = TRUE AND remaining_credits >= $1 \
             ORDER BY last_checked_at ASC NULLS FIRST \
             LIMIT 1"
        );
        sqlx::query_as::<_, ProviderKey>(&query)
            .bind(cost)
            .fetch_optional(pool)
            .await
    }

    /// Debit upstream usage against a credential.
    ///
    /// Conditional on remaining capacity; `false` means the key was
    /// exhausted between selection and use.
    pub async fn record_usage(
        pool: &PgPool,
        id: DbId,
        amount: i32,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE provider_keys \
             SET remaining_credits = remaining_credits - $2, last_checked_at = NOW() \
             WHERE id = $1 AND remaining_credits >= $2",
        )
        .bind(id)
        .bind(amount)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Deactivate a credential (exhausted or rejected upstream).
    pub async fn deactivate(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE provider_keys SET is_active = FALSE WHERE id = $1 AND is_active = TRUE",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Update a credential. Only non-`None` fields in `input` are applied.
    ///
    /// Returns `None` if no row with the given `id` exists.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateProviderKey,
    ) -> Result<Option<ProviderKey>, sqlx::Error> {
        let query = format!(
            "UPDATE provider_keys SET
                name = COALESCE($2, name),
                is_active = COALESCE($3, is_active),
                remaining_credits = COALESCE($4, remaining_credits)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ProviderKey>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(input.is_active)
            .bind(input.remaining_credits)
            .fetch_optional(pool)
            .await
    }
}
