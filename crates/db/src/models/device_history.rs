//! Device activation history model. Append-only audit trail per device.

use serde::Serialize;
use sqlx::FromRow;

use primex_core::types::{DbId, Timestamp};

/// A `device_activation_history` row.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DeviceHistoryEntry {
    pub id: DbId,
    pub device_activation_id: DbId,
    pub action: String,
    pub performed_by: Option<DbId>,
    pub details: serde_json::Value,
    pub ip_address: Option<String>,
    pub created_at: Timestamp,
}
