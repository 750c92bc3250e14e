//! Role-based access control (RBAC) extractors.
//!
//! Each extractor wraps [`AuthOperator`] and rejects requests whose role
//! does not meet the minimum requirement. Use these in route handlers to
//! enforce authorization at the type level.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use primex_core::error::CoreError;
use primex_core::roles::{ROLE_ADMIN, ROLE_CODES_SELLER};

use super::auth::AuthOperator;
use crate::error::AppError;
use crate::state::AppState;

/// Requires the `admin` role. Rejects with 403 Forbidden otherwise.
///
/// ```ignore
/// async fn admin_only(RequireAdmin(operator): RequireAdmin) -> AppResult<Json<()>> {
///     // operator is guaranteed to be an admin here
///     Ok(Json(()))
/// }
/// ```
pub struct RequireAdmin(pub AuthOperator);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let operator = AuthOperator::from_request_parts(parts, state).await?;
        if operator.role != ROLE_ADMIN {
            return Err(AppError::Core(CoreError::Forbidden(
                "Admin role required".into(),
            )));
        }
        Ok(RequireAdmin(operator))
    }
}

/// Requires `codes_seller` or `admin` role. Rejects with 403 Forbidden
/// otherwise. Code management is the one surface resellers get.
pub struct RequireCodesManager(pub AuthOperator);

impl FromRequestParts<AppState> for RequireCodesManager {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let operator = AuthOperator::from_request_parts(parts, state).await?;
        if operator.role != ROLE_ADMIN && operator.role != ROLE_CODES_SELLER {
            return Err(AppError::Core(CoreError::Forbidden(
                "Codes seller or Admin role required".into(),
            )));
        }
        Ok(RequireCodesManager(operator))
    }
}
