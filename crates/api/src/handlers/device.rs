//! Public device-pairing endpoints, called by TV apps.
//!
//! `register` runs once per boot on unprovisioned devices; `status` is
//! polled at high frequency while the on-screen key waits for an operator.
//! Neither endpoint requires authentication; `status` is double-keyed on
//! (device_key, mac_address) instead.

use std::sync::LazyLock;

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::Json;
use regex::Regex;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use primex_core::devices::DeviceStatus;
use primex_db::models::device::DeviceStatusView;
use primex_db::repositories::DeviceRepo;

use crate::error::{AppError, AppResult};
use crate::handlers::client_ip;
use crate::state::AppState;

/// Colon- or dash-separated 48-bit MAC address.
static MAC_ADDRESS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9A-Fa-f]{2}[:-]){5}[0-9A-Fa-f]{2}$").expect("MAC regex is valid")
});

fn validate_mac_address(mac: &str) -> Result<(), ValidationError> {
    if MAC_ADDRESS_RE.is_match(mac) {
        Ok(())
    } else {
        Err(ValidationError::new("mac_address"))
    }
}

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /device/register`.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterDeviceRequest {
    #[validate(custom(function = "validate_mac_address"))]
    pub mac_address: String,
    /// Free-form device metadata (model, firmware, app version).
    pub device_info: Option<serde_json::Value>,
}

/// Query parameters for `GET /device/status`.
#[derive(Debug, Deserialize)]
pub struct DeviceStatusParams {
    pub device_key: String,
    pub mac_address: String,
}

/// Response body for `POST /device/register`.
#[derive(Debug, Serialize)]
pub struct RegisterDeviceResponse {
    pub device_key: String,
    pub status: DeviceStatus,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/device/register
///
/// Register (or re-announce) a device by MAC address. Safe to call on every
/// boot: an existing pairing is returned as-is instead of minting a new key.
pub async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<RegisterDeviceRequest>,
) -> AppResult<Json<RegisterDeviceResponse>> {
    input
        .validate()
        .map_err(|_| AppError::BadRequest("Valid MAC address required".into()))?;

    let device_info = input.device_info.unwrap_or_else(|| serde_json::json!({}));
    let ip = client_ip(&headers);

    let device = DeviceRepo::register(
        &state.pool,
        &input.mac_address,
        &device_info,
        ip.as_deref(),
    )
    .await?;

    Ok(Json(RegisterDeviceResponse {
        device_key: device.device_key,
        status: device.status,
    }))
}

/// GET /api/v1/device/status?device_key=&mac_address=
///
/// Status poll. Benign "not yet activated" states are 200 responses; only
/// an unknown (key, MAC) pair is an error.
pub async fn status(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<DeviceStatusParams>,
) -> AppResult<Json<DeviceStatusView>> {
    if params.device_key.trim().is_empty() || params.mac_address.trim().is_empty() {
        return Err(AppError::BadRequest(
            "Device key and MAC address required".into(),
        ));
    }

    let ip = client_ip(&headers);
    let view = DeviceRepo::check_status(
        &state.pool,
        params.device_key.trim(),
        params.mac_address.trim(),
        ip.as_deref(),
    )
    .await?;

    Ok(Json(view))
}
