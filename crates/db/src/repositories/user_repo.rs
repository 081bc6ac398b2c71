//! Repository for the `users` table, including the credit ledger.
//!
//! Credit mutations are single atomic conditional UPDATEs. There is no
//! read-then-write anywhere in this module: a reservation that would drive
//! the balance negative simply affects zero rows.

use reelgen_core::types::DbId;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::user::{CreateUser, User};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, public_id, username, password_hash, credits, device_id, created_at";

/// Provides CRUD and credit-ledger operations for users.
pub struct UserRepo;

impl UserRepo {
    /// Insert a new user, returning the created row.
    ///
    /// A duplicate username violates `uq_users_username` and surfaces as a
    /// `sqlx::Error::Database` the API layer maps to 409.
    pub async fn create(pool: &PgPool, input: &CreateUser) -> Result<User, sqlx::Error> {
        let query = format!(
            "INSERT INTO users (username, password_hash, credits, device_id)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(&input.username)
            .bind(&input.password_hash)
            .bind(input.credits)
            .bind(&input.device_id)
            .fetch_one(pool)
            .await
    }

    /// Find a user by internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a user by external (public) ID.
    pub async fn find_by_public_id(
        pool: &PgPool,
        public_id: Uuid,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE public_id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(public_id)
            .fetch_optional(pool)
            .await
    }

    /// Find a user by username (case-sensitive).
    pub async fn find_by_username(
        pool: &PgPool,
        username: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE username = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(username)
            .fetch_optional(pool)
            .await
    }

    /// Find a user by device identifier (anonymous/device sessions).
    pub async fn find_by_device(
        pool: &PgPool,
        device_id: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE device_id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(device_id)
            .fetch_optional(pool)
            .await
    }

    /// Atomically reserve `amount` credits.
    ///
    /// Returns `true` if the debit was applied, `false` if the balance was
    /// insufficient. The check and the debit are one statement, so two
    /// concurrent reservations can never both pass on a balance that only
    /// covers one of them.
    pub async fn reserve_credits(
        pool: &PgPool,
        user_id: DbId,
        amount: i32,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET credits = credits - $2 WHERE id = $1 AND credits >= $2",
        )
        .bind(user_id)
        .bind(amount)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Credit `amount` back to a user (failed job refund, reward claim).
    ///
    /// Refund-at-most-once is enforced by the caller flipping the job's
    /// `credits_refunded` flag in the same guarded transition that makes
    /// the job terminal; this method itself is a plain credit.
    pub async fn refund_credits(
        pool: &PgPool,
        user_id: DbId,
        amount: i32,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET credits = credits + $2 WHERE id = $1")
            .bind(user_id)
            .bind(amount)
            .execute(pool)
            .await?;
        Ok(())
    }
}
