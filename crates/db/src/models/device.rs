//! Device activation model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use primex_core::devices::DeviceStatus;
use primex_core::types::{DbId, Timestamp};

/// A device activation row from the `device_activations` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DeviceActivation {
    pub id: DbId,
    pub device_key: String,
    pub mac_address: String,
    pub device_info: serde_json::Value,
    #[sqlx(try_from = "String")]
    pub status: DeviceStatus,
    pub subscription_plan_id: Option<DbId>,
    pub user_id: Option<DbId>,
    pub expires_at: Option<Timestamp>,
    pub last_check_at: Option<Timestamp>,
    pub last_ip: Option<String>,
    pub check_count: i32,
    pub activated_by: Option<DbId>,
    pub activated_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A device row joined with its plan name, for admin listings.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DeviceActivationWithPlan {
    pub id: DbId,
    pub device_key: String,
    pub mac_address: String,
    #[sqlx(try_from = "String")]
    pub status: DeviceStatus,
    pub plan_name: Option<String>,
    pub expires_at: Option<Timestamp>,
    pub last_check_at: Option<Timestamp>,
    pub check_count: i32,
    pub activated_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

/// Filter parameters for listing devices.
#[derive(Debug, Default, Deserialize)]
pub struct DeviceFilter {
    pub status: Option<DeviceStatus>,
}

/// What a polling device learns about its pairing.
///
/// The payload varies by state: `pending`, `expired`, and `deactivated`
/// devices get the status alone; `active` devices also get their expiry,
/// plan name, and content access. Credentials are never included here.
#[derive(Debug, Serialize)]
pub struct DeviceStatusView {
    pub device_key: String,
    pub status: DeviceStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_access: Option<primex_core::entitlements::ContentAccess>,
}
