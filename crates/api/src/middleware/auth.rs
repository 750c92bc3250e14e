//! JWT-based authentication extractors for Axum handlers.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use primex_core::error::CoreError;
use primex_core::types::DbId;
use primex_db::repositories::{OperatorRepo, OperatorSessionRepo};

use crate::auth::jwt::{hash_token, validate_access_token, PrincipalKind};
use crate::error::AppError;
use crate::state::AppState;

/// Authenticated subscriber account extracted from a Bearer token.
#[derive(Debug, Clone)]
pub struct AuthAccount {
    /// The account's internal database id (from `claims.sub`).
    pub user_id: DbId,
}

impl FromRequestParts<AppState> for AuthAccount {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let claims = validate_access_token(token, PrincipalKind::Account, &state.config.jwt)
            .map_err(|_| {
                AppError::Core(CoreError::Unauthorized("Invalid or expired token".into()))
            })?;

        Ok(AuthAccount {
            user_id: claims.sub,
        })
    }
}

/// Authenticated operator extracted from a Bearer token.
///
/// Operator tokens are tracked in the revocable session table, so on top
/// of JWT validation the session row must still exist: logging out (one
/// device or everywhere) takes effect immediately. Subscriber and device
/// traffic -- the overwhelming majority -- never touches this table.
#[derive(Debug, Clone)]
pub struct AuthOperator {
    /// The operator's internal database id (from `claims.sub`).
    pub operator_id: DbId,
    /// The operator's role (`admin`, `codes_seller`).
    pub role: String,
}

impl FromRequestParts<AppState> for AuthOperator {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let claims = validate_access_token(token, PrincipalKind::Operator, &state.config.jwt)
            .map_err(|_| {
                AppError::Core(CoreError::Unauthorized("Invalid or expired token".into()))
            })?;

        let token_hash = hash_token(token);
        let session = OperatorSessionRepo::find_valid_by_token_hash(&state.pool, &token_hash)
            .await?
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized("Session revoked or expired".into()))
            })?;
        OperatorSessionRepo::touch(&state.pool, &session.token_hash).await?;

        let operator = OperatorRepo::find_by_id(&state.pool, claims.sub)
            .await?
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized("Operator no longer exists".into()))
            })?;

        if !operator.is_active {
            return Err(AppError::Core(CoreError::Forbidden(
                "Operator account is deactivated".into(),
            )));
        }

        Ok(AuthOperator {
            operator_id: operator.id,
            role: operator.role,
        })
    }
}

/// Pull the Bearer token out of the `Authorization` header.
fn bearer_token(parts: &Parts) -> Result<&str, AppError> {
    let auth_header = parts
        .headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Missing Authorization header".into(),
            ))
        })?;

    auth_header.strip_prefix("Bearer ").ok_or_else(|| {
        AppError::Core(CoreError::Unauthorized(
            "Invalid Authorization format. Expected: Bearer <token>".into(),
        ))
    })
}
