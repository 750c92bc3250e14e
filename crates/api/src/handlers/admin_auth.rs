//! Handlers for operator authentication and session management.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use primex_core::error::CoreError;
use primex_core::types::DbId;
use primex_db::models::operator::OperatorResponse;
use primex_db::models::operator_session::CreateOperatorSession;
use primex_db::repositories::{OperatorRepo, OperatorSessionRepo};

use crate::auth::jwt::{generate_access_token, hash_token, PrincipalKind};
use crate::auth::password::verify_password;
use crate::error::{AppError, AppResult};
use crate::handlers::{client_ip, user_agent};
use crate::middleware::auth::AuthOperator;
use crate::response::DataResponse;
use crate::state::AppState;

/// Maximum consecutive failed login attempts before locking the account.
const MAX_FAILED_ATTEMPTS: i32 = 5;

/// Duration in minutes to lock an account after exceeding failed attempts.
const LOCK_DURATION_MINS: i64 = 15;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /admin/auth/login`.
#[derive(Debug, Deserialize)]
pub struct OperatorLoginRequest {
    pub username: String,
    pub password: String,
}

/// Successful operator login response.
#[derive(Debug, Serialize)]
pub struct OperatorAuthResponse {
    pub token: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    pub operator: OperatorResponse,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/admin/auth/login
///
/// Authenticate an operator. The issued token is tracked in the session
/// table (by hash) so it can be revoked individually or in bulk.
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<OperatorLoginRequest>,
) -> AppResult<Json<OperatorAuthResponse>> {
    let operator = OperatorRepo::find_by_username(&state.pool, &input.username)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Invalid username or password".into(),
            ))
        })?;

    if !operator.is_active {
        return Err(AppError::Core(CoreError::Forbidden(
            "Account is deactivated".into(),
        )));
    }

    if let Some(locked_until) = operator.locked_until {
        if locked_until > Utc::now() {
            return Err(AppError::Core(CoreError::Forbidden(
                "Account is temporarily locked. Try again later.".into(),
            )));
        }
    }

    let password_valid = verify_password(&input.password, &operator.password_hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;

    if !password_valid {
        OperatorRepo::increment_failed_login(&state.pool, operator.id).await?;

        let new_count = operator.failed_login_count + 1;
        if new_count >= MAX_FAILED_ATTEMPTS {
            let lock_until = Utc::now() + chrono::Duration::minutes(LOCK_DURATION_MINS);
            OperatorRepo::lock_account(&state.pool, operator.id, lock_until).await?;
        }

        return Err(AppError::Core(CoreError::Unauthorized(
            "Invalid username or password".into(),
        )));
    }

    OperatorRepo::record_successful_login(&state.pool, operator.id).await?;

    let token = generate_access_token(operator.id, PrincipalKind::Operator, &state.config.jwt)
        .map_err(|e| AppError::InternalError(format!("Token generation error: {e}")))?;

    let expires_in = state.config.jwt.operator_token_expiry_hours * 3600;
    let session = CreateOperatorSession {
        operator_id: operator.id,
        token_hash: hash_token(&token),
        ip_address: client_ip(&headers),
        user_agent: user_agent(&headers),
        expires_at: Utc::now() + chrono::Duration::seconds(expires_in),
    };
    OperatorSessionRepo::create(&state.pool, &session).await?;

    tracing::info!(operator_id = operator.id, username = %operator.username, "Operator logged in");

    Ok(Json(OperatorAuthResponse {
        token,
        expires_in,
        operator: OperatorResponse::from(&operator),
    }))
}

/// POST /api/v1/admin/auth/logout
///
/// Revoke all sessions for the authenticated operator. Returns 204.
pub async fn logout(
    State(state): State<AppState>,
    operator: AuthOperator,
) -> AppResult<StatusCode> {
    let revoked =
        OperatorSessionRepo::delete_all_for_operator(&state.pool, operator.operator_id).await?;
    tracing::info!(operator_id = operator.operator_id, revoked, "Operator logged out everywhere");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/admin/auth/sessions
///
/// List the authenticated operator's active sessions.
pub async fn list_sessions(
    State(state): State<AppState>,
    operator: AuthOperator,
) -> AppResult<Json<DataResponse<Vec<primex_db::models::operator_session::OperatorSessionView>>>> {
    let sessions =
        OperatorSessionRepo::list_active_for_operator(&state.pool, operator.operator_id).await?;
    Ok(Json(DataResponse { data: sessions }))
}

/// DELETE /api/v1/admin/auth/sessions/{id}
///
/// Revoke one of the authenticated operator's sessions ("kick this device").
pub async fn delete_session(
    State(state): State<AppState>,
    operator: AuthOperator,
    Path(session_id): Path<DbId>,
) -> AppResult<StatusCode> {
    let deleted =
        OperatorSessionRepo::delete_for_operator(&state.pool, session_id, operator.operator_id)
            .await?;
    if !deleted {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "OperatorSession",
            id: session_id,
        }));
    }
    Ok(StatusCode::NO_CONTENT)
}
