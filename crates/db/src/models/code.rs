//! Redemption code model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use primex_core::codes::CodeStatus;
use primex_core::types::{DbId, Timestamp};

/// A redemption code row from the `subscription_codes` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SubscriptionCode {
    pub id: DbId,
    pub code: String,
    pub source_name: Option<String>,
    pub duration_days: i32,
    pub max_uses: i32,
    pub used_count: i32,
    #[sqlx(try_from = "String")]
    pub status: CodeStatus,
    pub expires_at: Option<Timestamp>,
    pub plan_id: DbId,
    pub created_by: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for a bulk code-generation request (values shared by the batch).
#[derive(Debug, Clone)]
pub struct NewCodeBatch {
    pub source_name: Option<String>,
    pub duration_days: i32,
    pub max_uses: i32,
    pub plan_id: DbId,
    pub expires_at: Option<Timestamp>,
    pub created_by: Option<DbId>,
}

/// DTO for updating a code's mutable fields. All fields optional.
#[derive(Debug, Deserialize)]
pub struct UpdateCode {
    pub status: Option<CodeStatus>,
    pub max_uses: Option<i32>,
    pub expires_at: Option<Timestamp>,
    pub source_name: Option<String>,
}

/// Filter parameters for listing codes.
#[derive(Debug, Default, Deserialize)]
pub struct CodeFilter {
    pub status: Option<CodeStatus>,
    pub source_name: Option<String>,
    /// Substring match on the code itself.
    pub search: Option<String>,
}

/// Aggregate counts for the admin dashboard.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CodeStats {
    pub total: i64,
    pub active: i64,
    pub used: i64,
    pub expired: i64,
    pub disabled: i64,
}

/// Per-source code counts.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SourceCount {
    pub source_name: String,
    pub count: i64,
}
