//! Repository for the `code_usage` table (append-only redemption history).
//!
//! Rows are inserted inside the redemption transaction (see
//! `redemption_repo`); this repository covers the read side.

use sqlx::PgPool;

use primex_core::types::DbId;

use crate::models::code_usage::CodeUsageWithUser;

/// Provides read access to redemption history.
pub struct CodeUsageRepo;

impl CodeUsageRepo {
    /// List redemptions of a code with the provisioned account's username,
    /// newest first.
    pub async fn list_for_code(
        pool: &PgPool,
        code_id: DbId,
    ) -> Result<Vec<CodeUsageWithUser>, sqlx::Error> {
        sqlx::query_as::<_, CodeUsageWithUser>(
            "SELECT cu.id, cu.code_id, cu.user_id, u.username, cu.ip_address, cu.activated_at
             FROM code_usage cu
             JOIN users u ON cu.user_id = u.id
             WHERE cu.code_id = $1
             ORDER BY cu.activated_at DESC",
        )
        .bind(code_id)
        .fetch_all(pool)
        .await
    }
}
