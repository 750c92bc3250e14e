//! Route definitions for the `/admin` resource.
//!
//! Authorization is enforced per-handler via the RBAC extractors, not at
//! the router level, so each handler's requirement is visible in its
//! signature.

use axum::routing::{delete, get, post};
use axum::Router;

use crate::handlers::{admin_auth, admin_codes, admin_devices};
use crate::state::AppState;

/// Routes mounted at `/admin`.
pub fn router() -> Router<AppState> {
    Router::new()
        // Operator authentication and sessions.
        .route("/auth/login", post(admin_auth::login))
        .route("/auth/logout", post(admin_auth::logout))
        .route("/auth/sessions", get(admin_auth::list_sessions))
        .route("/auth/sessions/{id}", delete(admin_auth::delete_session))
        // Device activation management.
        .route("/device/activate", post(admin_devices::activate))
        .route("/devices", get(admin_devices::list))
        .route("/devices/pending", get(admin_devices::pending))
        .route("/devices/{id}/deactivate", post(admin_devices::deactivate))
        .route("/devices/{id}/history", get(admin_devices::history))
        // Redemption code management.
        .route("/codes", get(admin_codes::list))
        .route("/codes/generate", post(admin_codes::generate))
        .route("/codes/stats", get(admin_codes::stats))
        .route(
            "/codes/{id}",
            get(admin_codes::get)
                .put(admin_codes::update)
                .delete(admin_codes::delete),
        )
}
