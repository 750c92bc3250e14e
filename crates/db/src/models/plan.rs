//! Subscription plan model (read-only catalog collaborator).

use serde::Serialize;
use sqlx::FromRow;

use primex_core::types::{DbId, Timestamp};

/// A subscription plan row from the `subscription_plans` table.
///
/// Plans are owned by catalog management; the provisioning engines only
/// read them.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Plan {
    pub id: DbId,
    pub name: String,
    pub duration_days: i32,
    pub max_devices: i32,
    /// Delivery server assignment. `None` means the plan cannot provision
    /// accounts yet.
    pub server_id: Option<DbId>,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
