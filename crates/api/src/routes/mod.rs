pub mod admin;
pub mod auth;
pub mod device;
pub mod health;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /auth/login                          subscriber login (public)
/// /auth/code-login                     redeem a code into an account (public)
/// /auth/refresh                        exchange refresh token (public)
/// /auth/me                             account + entitlements (account token)
///
/// /device/register                     register device by MAC (public)
/// /device/status                       activation status poll (public)
///
/// /admin/auth/login                    operator login (public)
/// /admin/auth/logout                   revoke all sessions (operator)
/// /admin/auth/sessions                 list sessions (operator)
/// /admin/auth/sessions/{id}            revoke one session (operator)
///
/// /admin/device/activate               bind device to plan (admin only)
/// /admin/devices                       list devices (admin only)
/// /admin/devices/pending               activation queue (admin only)
/// /admin/devices/{id}/deactivate       revoke device (admin only)
/// /admin/devices/{id}/history          device audit trail (admin only)
///
/// /admin/codes                         list (admin or codes_seller)
/// /admin/codes/generate                bulk create
/// /admin/codes/stats                   counts by status and source
/// /admin/codes/{id}                    get with usage history, update, delete
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/device", device::router())
        .nest("/admin", admin::router())
}
