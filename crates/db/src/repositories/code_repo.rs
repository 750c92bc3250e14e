//! Repository for the `subscription_codes` table.
//!
//! Bulk generation and the admin management surface live here. The
//! redemption state machine itself is in `redemption_repo`; the only
//! `used_count` mutation path is [`CodeRepo::try_consume`], so the
//! check-then-increment race is closed in one place.

use sqlx::{PgConnection, PgPool};

use primex_core::codes::CodeStatus;
use primex_core::tokens::generate_code;
use primex_core::types::DbId;

use crate::models::code::{
    CodeFilter, CodeStats, NewCodeBatch, SourceCount, SubscriptionCode, UpdateCode,
};

/// Column list shared across queries to avoid repetition.
pub(crate) const COLUMNS: &str =
    "id, code, source_name, duration_days, max_uses, used_count, status, \
     expires_at, plan_id, created_by, created_at, updated_at";

/// Result of a successful [`CodeRepo::try_consume`].
#[derive(Debug, Clone, Copy)]
pub struct ConsumedCode {
    pub used_count: i32,
    pub max_uses: i32,
}

impl ConsumedCode {
    /// Whether this consumption used the last remaining slot.
    pub fn exhausted(self) -> bool {
        self.used_count >= self.max_uses
    }
}

/// Provides CRUD operations for redemption codes.
pub struct CodeRepo;

impl CodeRepo {
    /// Generate `count` codes sharing the batch parameters. Returns the
    /// created rows in insertion order.
    pub async fn create_batch(
        pool: &PgPool,
        count: usize,
        batch: &NewCodeBatch,
    ) -> Result<Vec<SubscriptionCode>, sqlx::Error> {
        let codes: Vec<String> = (0..count).map(|_| generate_code()).collect();

        let query = format!(
            "INSERT INTO subscription_codes
                (code, source_name, duration_days, max_uses, plan_id, expires_at, created_by)
             SELECT unnest($1::text[]), $2, $3, $4, $5, $6, $7
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, SubscriptionCode>(&query)
            .bind(&codes)
            .bind(&batch.source_name)
            .bind(batch.duration_days)
            .bind(batch.max_uses)
            .bind(batch.plan_id)
            .bind(batch.expires_at)
            .bind(batch.created_by)
            .fetch_all(pool)
            .await
    }

    /// Find a code by internal ID.
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<SubscriptionCode>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM subscription_codes WHERE id = $1");
        sqlx::query_as::<_, SubscriptionCode>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List codes matching the filter, newest first.
    pub async fn list(
        pool: &PgPool,
        filter: &CodeFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<SubscriptionCode>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM subscription_codes
             WHERE ($1::text IS NULL OR status = $1)
               AND ($2::text IS NULL OR source_name = $2)
               AND ($3::text IS NULL OR code ILIKE '%' || $3 || '%')
             ORDER BY created_at DESC
             LIMIT $4 OFFSET $5"
        );
        sqlx::query_as::<_, SubscriptionCode>(&query)
            .bind(filter.status.map(CodeStatus::as_str))
            .bind(&filter.source_name)
            .bind(&filter.search)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Aggregate counts by status.
    pub async fn stats(pool: &PgPool) -> Result<CodeStats, sqlx::Error> {
        sqlx::query_as::<_, CodeStats>(
            "SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE status = 'active') AS active,
                COUNT(*) FILTER (WHERE status = 'used') AS used,
                COUNT(*) FILTER (WHERE status = 'expired') AS expired,
                COUNT(*) FILTER (WHERE status = 'disabled') AS disabled
             FROM subscription_codes",
        )
        .fetch_one(pool)
        .await
    }

    /// Per-source code counts, for the admin dashboard.
    pub async fn counts_by_source(pool: &PgPool) -> Result<Vec<SourceCount>, sqlx::Error> {
        sqlx::query_as::<_, SourceCount>(
            "SELECT source_name, COUNT(*) AS count
             FROM subscription_codes
             WHERE source_name IS NOT NULL
             GROUP BY source_name
             ORDER BY count DESC",
        )
        .fetch_all(pool)
        .await
    }

    /// Update a code's mutable fields. Only non-`None` fields are applied.
    ///
    /// Returns `None` if no row with the given `id` exists. A status change
    /// that the transition table forbids (reviving a `used` or `expired`
    /// code) is rejected with a check-style error by the caller; this method
    /// applies whatever it is given.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateCode,
    ) -> Result<Option<SubscriptionCode>, sqlx::Error> {
        let query = format!(
            "UPDATE subscription_codes SET
                status = COALESCE($2, status),
                max_uses = COALESCE($3, max_uses),
                expires_at = COALESCE($4, expires_at),
                source_name = COALESCE($5, source_name)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, SubscriptionCode>(&query)
            .bind(id)
            .bind(input.status.map(CodeStatus::as_str))
            .bind(input.max_uses)
            .bind(input.expires_at)
            .bind(&input.source_name)
            .fetch_optional(pool)
            .await
    }

    /// Delete a code. Returns `true` if a row was deleted.
    ///
    /// The handler refuses deletion of `used` codes before calling this;
    /// the `status != 'used'` guard repeats the rule at the store boundary.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM subscription_codes WHERE id = $1 AND status != 'used'")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Atomically consume one use of a code.
    ///
    /// The compare-and-increment happens in a single UPDATE guarded by
    /// `used_count < max_uses`, so two concurrent redemptions of a
    /// one-use code can never both succeed. Returns `None` when no slot
    /// was available.
    pub async fn try_consume(
        conn: &mut PgConnection,
        id: DbId,
    ) -> Result<Option<ConsumedCode>, sqlx::Error> {
        let row: Option<(i32, i32)> = sqlx::query_as(
            "UPDATE subscription_codes
             SET used_count = used_count + 1
             WHERE id = $1 AND status = 'active' AND used_count < max_uses
             RETURNING used_count, max_uses",
        )
        .bind(id)
        .fetch_optional(conn)
        .await?;

        Ok(row.map(|(used_count, max_uses)| ConsumedCode {
            used_count,
            max_uses,
        }))
    }
}
