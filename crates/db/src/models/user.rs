//! Provisioned account model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use primex_core::accounts::AccountStatus;
use primex_core::types::{DbId, Timestamp};

/// Full user row from the `users` table.
///
/// Contains the password hash -- NEVER serialize this to API responses
/// directly. Use [`UserResponse`] for external-facing output.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: DbId,
    pub username: String,
    pub password_hash: String,
    #[sqlx(try_from = "String")]
    pub status: AccountStatus,
    pub subscription_start: Timestamp,
    pub subscription_end: Timestamp,
    pub plan_id: Option<DbId>,
    pub max_devices: i32,
    pub created_by: Option<String>,
    pub last_login_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Safe user representation for API responses (no password hash).
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: DbId,
    pub username: String,
    pub status: AccountStatus,
    pub subscription_start: Timestamp,
    pub subscription_end: Timestamp,
    pub plan_id: Option<DbId>,
    pub max_devices: i32,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        UserResponse {
            id: user.id,
            username: user.username.clone(),
            status: user.status,
            subscription_start: user.subscription_start,
            subscription_end: user.subscription_end,
            plan_id: user.plan_id,
            max_devices: user.max_devices,
        }
    }
}

/// DTO for creating a new provisioned account.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUser {
    pub username: String,
    pub password_hash: String,
    pub subscription_start: Timestamp,
    pub subscription_end: Timestamp,
    pub plan_id: Option<DbId>,
    pub max_devices: i32,
    /// Which flow created this account (`code_redemption`, `device_activation`).
    pub created_by: Option<String>,
}
