//! Read-only repository for the `subscription_plans` table.
//!
//! Plans are owned by catalog management; the provisioning engines never
//! mutate them.

use sqlx::PgPool;

use primex_core::types::DbId;

use crate::models::plan::Plan;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, name, duration_days, max_devices, server_id, is_active, \
                        created_at, updated_at";

/// Provides read access to subscription plans.
pub struct PlanRepo;

impl PlanRepo {
    /// Find a plan by internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Plan>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM subscription_plans WHERE id = $1");
        sqlx::query_as::<_, Plan>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find an active plan by internal ID.
    pub async fn find_active_by_id(pool: &PgPool, id: DbId) -> Result<Option<Plan>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM subscription_plans WHERE id = $1 AND is_active = true");
        sqlx::query_as::<_, Plan>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}
