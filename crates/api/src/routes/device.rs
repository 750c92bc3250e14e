//! Route definitions for the public `/device` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::device;
use crate::state::AppState;

/// Routes mounted at `/device`.
///
/// ```text
/// POST /register  -> register device by MAC address
/// GET  /status    -> activation status poll (?device_key=&mac_address=)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(device::register))
        .route("/status", get(device::status))
}
