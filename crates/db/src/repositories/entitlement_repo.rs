//! Entitlement Resolver: maps a plan to the content identifiers to grant.
//!
//! Methods take `&mut PgConnection` rather than `&PgPool` so they can run
//! both standalone (device status polls) and inside the provisioning
//! transactions.

use sqlx::PgConnection;

use primex_core::entitlements::EntitlementGrant;
use primex_core::types::DbId;

/// Resolves and persists entitlement grants.
pub struct EntitlementRepo;

impl EntitlementRepo {
    /// Resolve the content set for a plan.
    ///
    /// A plan with explicit `plan_channels` / `plan_categories` mappings
    /// grants exactly the mapped active content. A plan with no mapping for
    /// a content kind falls back to ALL active content of that kind. The
    /// fallback is deliberate (plans ship before their mappings do) and is
    /// logged and flagged on the returned grant so callers and tests can
    /// tell which path was taken.
    pub async fn resolve(
        conn: &mut PgConnection,
        plan_id: DbId,
    ) -> Result<EntitlementGrant, sqlx::Error> {
        let mapped_channels: Vec<(DbId,)> = sqlx::query_as(
            "SELECT DISTINCT ch.id
             FROM channels ch
             JOIN plan_channels pc ON ch.id = pc.channel_id
             WHERE pc.plan_id = $1 AND ch.is_active = true",
        )
        .bind(plan_id)
        .fetch_all(&mut *conn)
        .await?;

        let channel_fallback = mapped_channels.is_empty();
        let channel_ids: Vec<DbId> = if channel_fallback {
            let all: Vec<(DbId,)> =
                sqlx::query_as("SELECT id FROM channels WHERE is_active = true ORDER BY id")
                    .fetch_all(&mut *conn)
                    .await?;
            tracing::info!(
                plan_id,
                channel_count = all.len(),
                "No plan-channel mappings found, granting all active channels"
            );
            all.into_iter().map(|(id,)| id).collect()
        } else {
            mapped_channels.into_iter().map(|(id,)| id).collect()
        };

        let mapped_categories: Vec<(DbId,)> = sqlx::query_as(
            "SELECT DISTINCT c.id
             FROM categories c
             JOIN plan_categories pc ON c.id = pc.category_id
             WHERE pc.plan_id = $1 AND c.is_active = true",
        )
        .bind(plan_id)
        .fetch_all(&mut *conn)
        .await?;

        let category_fallback = mapped_categories.is_empty();
        let category_ids: Vec<DbId> = if category_fallback {
            let all: Vec<(DbId,)> =
                sqlx::query_as("SELECT id FROM categories WHERE is_active = true ORDER BY id")
                    .fetch_all(&mut *conn)
                    .await?;
            tracing::info!(
                plan_id,
                category_count = all.len(),
                "No plan-category mappings found, granting all active categories"
            );
            all.into_iter().map(|(id,)| id).collect()
        } else {
            mapped_categories.into_iter().map(|(id,)| id).collect()
        };

        Ok(EntitlementGrant {
            channel_ids,
            category_ids,
            channel_fallback,
            category_fallback,
        })
    }

    /// Replace a user's entitlement grants with the given set.
    ///
    /// Used at provisioning time and on explicit re-sync (device renewal).
    pub async fn grant(
        conn: &mut PgConnection,
        user_id: DbId,
        grant: &EntitlementGrant,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM user_channels WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *conn)
            .await?;
        sqlx::query("DELETE FROM user_categories WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *conn)
            .await?;

        if !grant.channel_ids.is_empty() {
            sqlx::query(
                "INSERT INTO user_channels (user_id, channel_id)
                 SELECT $1, unnest($2::bigint[])",
            )
            .bind(user_id)
            .bind(&grant.channel_ids)
            .execute(&mut *conn)
            .await?;
        }

        if !grant.category_ids.is_empty() {
            sqlx::query(
                "INSERT INTO user_categories (user_id, category_id)
                 SELECT $1, unnest($2::bigint[])",
            )
            .bind(user_id)
            .bind(&grant.category_ids)
            .execute(&mut *conn)
            .await?;
        }

        Ok(())
    }

    /// List the channel ids granted to a user, ordered by id.
    pub async fn channels_for_user(
        conn: &mut PgConnection,
        user_id: DbId,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        let rows: Vec<(DbId,)> = sqlx::query_as(
            "SELECT channel_id FROM user_channels WHERE user_id = $1 ORDER BY channel_id",
        )
        .bind(user_id)
        .fetch_all(conn)
        .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    /// List the category ids granted to a user, ordered by id.
    pub async fn categories_for_user(
        conn: &mut PgConnection,
        user_id: DbId,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        let rows: Vec<(DbId,)> = sqlx::query_as(
            "SELECT category_id FROM user_categories WHERE user_id = $1 ORDER BY category_id",
        )
        .bind(user_id)
        .fetch_all(conn)
        .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}
