//! Redemption history model. Append-only; rows have no update path.

use serde::Serialize;
use sqlx::FromRow;

use primex_core::types::{DbId, Timestamp};

/// A `code_usage` row: one successful redemption of a code.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CodeUsage {
    pub id: DbId,
    pub code_id: DbId,
    pub user_id: DbId,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub device_id: Option<String>,
    pub mac_address: Option<String>,
    pub activated_at: Timestamp,
}

/// A usage row joined with the provisioned account's username, for the
/// admin code-detail view.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CodeUsageWithUser {
    pub id: DbId,
    pub code_id: DbId,
    pub user_id: DbId,
    pub username: String,
    pub ip_address: Option<String>,
    pub activated_at: Timestamp,
}
