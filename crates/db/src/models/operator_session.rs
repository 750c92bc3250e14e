//! Operator session model and DTOs.

use serde::Serialize;
use sqlx::FromRow;

use primex_core::types::{DbId, Timestamp};

/// An operator session row from the `operator_sessions` table.
///
/// `token_hash` is the SHA-256 hex digest of the bearer token; the raw
/// token is never persisted.
#[derive(Debug, Clone, FromRow)]
pub struct OperatorSession {
    pub id: DbId,
    pub operator_id: DbId,
    pub token_hash: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub expires_at: Timestamp,
    pub last_activity: Timestamp,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Session view for the "your active sessions" listing (no token hash).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct OperatorSessionView {
    pub id: DbId,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub last_activity: Timestamp,
    pub created_at: Timestamp,
}

/// DTO for creating a new operator session.
pub struct CreateOperatorSession {
    pub operator_id: DbId,
    pub token_hash: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub expires_at: Timestamp,
}
