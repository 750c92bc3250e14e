//! Repository for the `users` table (provisioned accounts).
//!
//! Accounts are created exclusively by the redemption and activation
//! engines (see `redemption_repo` and `device_repo`); this repository
//! covers the read and maintenance paths.

use sqlx::PgPool;

use primex_core::accounts::AccountStatus;
use primex_core::types::DbId;

use crate::models::user::User;

/// Column list shared across queries to avoid repetition.
pub(crate) const COLUMNS: &str =
    "id, username, password_hash, status, subscription_start, subscription_end, \
     plan_id, max_devices, created_by, last_login_at, created_at, updated_at";

/// Provides read and maintenance operations for provisioned accounts.
pub struct UserRepo;

impl UserRepo {
    /// Find a user by internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
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

    /// Set `last_login_at` to now.
    pub async fn record_login(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Set the account status. Returns `true` if the row was updated.
    pub async fn set_status(
        pool: &PgPool,
        id: DbId,
        status: AccountStatus,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(status.as_str())
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
