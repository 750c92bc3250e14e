//! Route definitions for the public `/auth` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::auth;
use crate::state::AppState;

/// Routes mounted at `/auth`.
///
/// ```text
/// POST /login       -> subscriber login
/// POST /code-login  -> redeem a code into a fresh account
/// POST /refresh     -> exchange refresh token for a new access token
/// GET  /me          -> authenticated account + entitlements
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(auth::login))
        .route("/code-login", post(auth::code_login))
        .route("/refresh", post(auth::refresh))
        .route("/me", get(auth::me))
}
