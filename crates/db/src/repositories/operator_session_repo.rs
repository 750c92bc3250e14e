//! Repository for the `operator_sessions` table.
//!
//! Sessions are keyed by a SHA-256 hash of the bearer token. Token
//! verification itself is pure JWT validation; this table exists so
//! operators can list and revoke their sessions ("log out everywhere",
//! "kick this one device").

use sqlx::PgPool;

use primex_core::types::DbId;

use crate::models::operator_session::{
    CreateOperatorSession, OperatorSession, OperatorSessionView,
};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, operator_id, token_hash, ip_address, user_agent, \
                        expires_at, last_activity, created_at, updated_at";

/// Provides CRUD operations for operator sessions.
pub struct OperatorSessionRepo;

impl OperatorSessionRepo {
    /// Insert a new session, returning the created row.
    pub async fn create(
        pool: &PgPool,
        input: &CreateOperatorSession,
    ) -> Result<OperatorSession, sqlx::Error> {
        let query = format!(
            "INSERT INTO operator_sessions (operator_id, token_hash, ip_address, user_agent, expires_at)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, OperatorSession>(&query)
            .bind(input.operator_id)
            .bind(&input.token_hash)
            .bind(&input.ip_address)
            .bind(&input.user_agent)
            .bind(input.expires_at)
            .fetch_one(pool)
            .await
    }

    /// Find an unexpired session by its token hash.
    pub async fn find_valid_by_token_hash(
        pool: &PgPool,
        token_hash: &str,
    ) -> Result<Option<OperatorSession>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM operator_sessions
             WHERE token_hash = $1 AND expires_at > NOW()"
        );
        sqlx::query_as::<_, OperatorSession>(&query)
            .bind(token_hash)
            .fetch_optional(pool)
            .await
    }

    /// List unexpired sessions for an operator, most recently active first.
    pub async fn list_active_for_operator(
        pool: &PgPool,
        operator_id: DbId,
    ) -> Result<Vec<OperatorSessionView>, sqlx::Error> {
        sqlx::query_as::<_, OperatorSessionView>(
            "SELECT id, ip_address, user_agent, last_activity, created_at
             FROM operator_sessions
             WHERE operator_id = $1 AND expires_at > NOW()
             ORDER BY last_activity DESC",
        )
        .bind(operator_id)
        .fetch_all(pool)
        .await
    }

    /// Bump `last_activity` for the session matching this token hash.
    pub async fn touch(pool: &PgPool, token_hash: &str) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE operator_sessions SET last_activity = NOW() WHERE token_hash = $1")
            .bind(token_hash)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Delete one session, scoped to its owner so an operator cannot kick
    /// someone else's device. Returns `true` if a row was deleted.
    pub async fn delete_for_operator(
        pool: &PgPool,
        id: DbId,
        operator_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("DELETE FROM operator_sessions WHERE id = $1 AND operator_id = $2")
                .bind(id)
                .bind(operator_id)
                .execute(pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete all sessions for an operator. Returns the count deleted.
    pub async fn delete_all_for_operator(
        pool: &PgPool,
        operator_id: DbId,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM operator_sessions WHERE operator_id = $1")
            .bind(operator_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Delete expired sessions. Returns the count of deleted rows.
    pub async fn cleanup_expired(pool: &PgPool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM operator_sessions WHERE expires_at < NOW()")
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
