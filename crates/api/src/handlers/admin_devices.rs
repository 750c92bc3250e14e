//! Admin handlers for device activation management.
//!
//! Activation and revocation require the admin role; resellers do not see
//! devices.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use validator::Validate;

use primex_core::devices::DeviceStatus;
use primex_core::error::CoreError;
use primex_core::tokens::credentials_for_device;
use primex_core::types::{DbId, Timestamp};
use primex_db::models::device::DeviceFilter;
use primex_db::repositories::device_repo::ActivateRequest;
use primex_db::repositories::DeviceRepo;

use crate::auth::password::hash_password;
use crate::error::{AppError, AppResult};
use crate::handlers::auth::IssuedCredentials;
use crate::middleware::rbac::RequireAdmin;
use crate::query::PaginationParams;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /admin/device/activate`.
#[derive(Debug, Deserialize, Validate)]
pub struct ActivateDeviceRequest {
    #[validate(length(min = 8, max = 8, message = "Valid 8-digit device key required"))]
    pub device_key: String,
    pub subscription_plan_id: DbId,
    #[validate(range(min = 1, message = "Duration must be a positive integer"))]
    pub duration_days: Option<i32>,
}

/// Response body for a successful activation.
#[derive(Debug, Serialize)]
pub struct ActivatedDeviceResponse {
    pub device_key: String,
    pub mac_address: String,
    pub status: DeviceStatus,
    pub plan_name: String,
    pub expires_at: Option<Timestamp>,
    /// Credentials for the account now bound to the device. Shown once.
    pub credentials: IssuedCredentials,
}

/// Query parameters for `GET /admin/devices`.
#[derive(Debug, Deserialize)]
pub struct DeviceListParams {
    pub status: Option<DeviceStatus>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/admin/device/activate
///
/// Bind a registered device to a plan. Rejects with 400 when the device is
/// already active and unexpired; re-activating an expired device renews it.
pub async fn activate(
    RequireAdmin(operator): RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<ActivateDeviceRequest>,
) -> AppResult<impl IntoResponse> {
    input
        .validate()
        .map_err(|e| AppError::BadRequest(format!("Validation failed: {e}")))?;
    if !input.device_key.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::BadRequest(
            "Valid 8-digit device key required".into(),
        ));
    }

    let credentials = credentials_for_device(&input.device_key);
    let password_hash = hash_password(&credentials.password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;

    let request = ActivateRequest {
        device_key: input.device_key.clone(),
        plan_id: input.subscription_plan_id,
        operator_id: operator.operator_id,
        duration_days: input.duration_days,
        username: credentials.username,
        password_hash,
    };

    let activated = DeviceRepo::activate(&state.pool, &request).await?;

    let response = ActivatedDeviceResponse {
        device_key: activated.device.device_key.clone(),
        mac_address: activated.device.mac_address.clone(),
        status: activated.device.status,
        plan_name: activated.plan_name,
        expires_at: activated.device.expires_at,
        credentials: IssuedCredentials {
            username: activated.username,
            password: credentials.password,
        },
    };
    Ok(Json(DataResponse { data: response }))
}

/// GET /api/v1/admin/devices
///
/// List devices with optional status filter.
pub async fn list(
    _operator: RequireAdmin,
    State(state): State<AppState>,
    Query(params): Query<DeviceListParams>,
) -> AppResult<impl IntoResponse> {
    let filter = DeviceFilter {
        status: params.status,
    };
    let page = PaginationParams {
        limit: params.limit,
        offset: params.offset,
    };
    let devices = DeviceRepo::list(&state.pool, &filter, page.limit(), page.offset()).await?;
    Ok(Json(DataResponse { data: devices }))
}

/// GET /api/v1/admin/devices/pending
///
/// The activation queue: devices waiting for an operator, oldest first.
pub async fn pending(
    _operator: RequireAdmin,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let devices = DeviceRepo::list_pending(&state.pool).await?;
    Ok(Json(DataResponse { data: devices }))
}

/// POST /api/v1/admin/devices/{id}/deactivate
///
/// Revoke a device. Suspends the linked account, if any. Idempotent.
pub async fn deactivate(
    RequireAdmin(operator): RequireAdmin,
    State(state): State<AppState>,
    Path(device_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let device = DeviceRepo::deactivate(&state.pool, device_id, operator.operator_id).await?;
    Ok(Json(DataResponse { data: device }))
}

/// GET /api/v1/admin/devices/{id}/history
///
/// The device's append-only audit trail.
pub async fn history(
    _operator: RequireAdmin,
    State(state): State<AppState>,
    Path(device_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    // 404 for unknown ids rather than an empty list.
    DeviceRepo::find_by_id(&state.pool, device_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "DeviceActivation",
            id: device_id,
        }))?;

    let entries = DeviceRepo::list_history(&state.pool, device_id).await?;
    Ok(Json(DataResponse { data: entries }))
}
