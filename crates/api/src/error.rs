use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use primex_core::error::CoreError;
use primex_db::repositories::{ActivationError, RedemptionError};

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors, the two provisioning-engine error
/// taxonomies, and raw sqlx errors. Implements [`IntoResponse`] to produce
/// consistent JSON error responses; engine errors map to fixed enum-backed
/// messages and never expose store internals.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `primex_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A redemption-engine failure.
    #[error(transparent)]
    Redemption(#[from] RedemptionError),

    /// An activation-engine failure.
    #[error(transparent)]
    Activation(#[from] ActivationError),

    /// A database error from sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} with id {id} not found"),
                ),
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
                CoreError::Unauthorized(msg) => {
                    (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone())
                }
                CoreError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR",
                        "An internal error occurred".to_string(),
                    )
                }
            },

            // --- Redemption taxonomy ---
            AppError::Redemption(err) => match err {
                RedemptionError::CodeNotFound => {
                    (StatusCode::BAD_REQUEST, "CODE_NOT_FOUND", err.to_string())
                }
                RedemptionError::CodeInactive => {
                    (StatusCode::BAD_REQUEST, "CODE_INACTIVE", err.to_string())
                }
                RedemptionError::CodeExpired => {
                    (StatusCode::BAD_REQUEST, "CODE_EXPIRED", err.to_string())
                }
                RedemptionError::CodeExhausted => {
                    (StatusCode::BAD_REQUEST, "CODE_EXHAUSTED", err.to_string())
                }
                RedemptionError::PlanMissing => {
                    (StatusCode::BAD_REQUEST, "PLAN_MISSING", err.to_string())
                }
                // The retry budget in the handler should absorb collisions;
                // reaching here means the budget is exhausted.
                RedemptionError::UsernameCollision => {
                    tracing::error!("Username collision retry budget exhausted");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR",
                        "An internal error occurred".to_string(),
                    )
                }
                RedemptionError::Db(db) => classify_sqlx_error(db),
            },

            // --- Activation taxonomy ---
            AppError::Activation(err) => match err {
                ActivationError::DeviceNotFound => {
                    (StatusCode::NOT_FOUND, "DEVICE_NOT_FOUND", err.to_string())
                }
                ActivationError::PlanNotFound => {
                    (StatusCode::NOT_FOUND, "PLAN_NOT_FOUND", err.to_string())
                }
                ActivationError::AlreadyActive => {
                    (StatusCode::BAD_REQUEST, "ALREADY_ACTIVE", err.to_string())
                }
                ActivationError::Db(db) => classify_sqlx_error(db),
            },

            // --- Database errors ---
            AppError::Database(err) => classify_sqlx_error(err),

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Classify a sqlx error into an HTTP status, error code, and message.
///
/// - `RowNotFound` maps to 404.
/// - Unique constraint violations (constraint name starting with `uq_`) map to 409.
/// - Everything else maps to 500 with a sanitized message.
fn classify_sqlx_error(err: &sqlx::Error) -> (StatusCode, &'static str, String) {
    match err {
        sqlx::Error::RowNotFound => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Resource not found".to_string(),
        ),
        sqlx::Error::Database(db_err) => {
            // PostgreSQL unique constraint violation: error code 23505
            if db_err.code().as_deref() == Some("23505") {
                let constraint = db_err.constraint().unwrap_or("unknown");
                if constraint.starts_with("uq_") {
                    return (
                        StatusCode::CONFLICT,
                        "CONFLICT",
                        format!("Duplicate value violates unique constraint: {constraint}"),
                    );
                }
            }
            tracing::error!(error = %db_err, "Database error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            )
        }
        other => {
            tracing::error!(error = %other, "Database error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            )
        }
    }
}
