//! Operator (back-office staff) model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use primex_core::types::{DbId, Timestamp};

/// Full operator row from the `operators` table.
///
/// Contains the password hash -- NEVER serialize this to API responses
/// directly.
#[derive(Debug, Clone, FromRow)]
pub struct Operator {
    pub id: DbId,
    pub username: String,
    pub email: Option<String>,
    pub password_hash: String,
    pub role: String,
    pub is_active: bool,
    pub failed_login_count: i32,
    pub locked_until: Option<Timestamp>,
    pub last_login_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Safe operator representation for API responses.
#[derive(Debug, Clone, Serialize)]
pub struct OperatorResponse {
    pub id: DbId,
    pub username: String,
    pub email: Option<String>,
    pub role: String,
}

impl From<&Operator> for OperatorResponse {
    fn from(op: &Operator) -> Self {
        OperatorResponse {
            id: op.id,
            username: op.username.clone(),
            email: op.email.clone(),
            role: op.role.clone(),
        }
    }
}

/// DTO for creating a new operator.
#[derive(Debug, Deserialize)]
pub struct CreateOperator {
    pub username: String,
    pub email: Option<String>,
    pub password_hash: String,
    pub role: String,
}
