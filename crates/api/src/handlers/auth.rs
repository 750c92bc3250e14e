//! Handlers for the public `/auth` resource (subscriber login, code
//! redemption, token refresh).

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use primex_core::accounts::AccountStatus;
use primex_core::error::CoreError;
use primex_core::tokens::generate_credentials;
use primex_core::types::DbId;
use primex_db::models::user::UserResponse;
use primex_db::repositories::redemption_repo::RedeemRequest;
use primex_db::repositories::{EntitlementRepo, RedemptionError, RedemptionRepo, UserRepo};

use crate::auth::jwt::{
    generate_access_token, generate_refresh_token, validate_refresh_token, PrincipalKind,
};
use crate::auth::password::{hash_password, verify_password};
use crate::error::{AppError, AppResult};
use crate::handlers::{client_ip, user_agent};
use crate::middleware::auth::AuthAccount;
use crate::state::AppState;

/// Bounded retries when a generated username collides with an existing one.
const MAX_USERNAME_ATTEMPTS: u32 = 5;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /auth/login`.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Request body for `POST /auth/code-login`.
#[derive(Debug, Deserialize)]
pub struct CodeLoginRequest {
    pub code: String,
    pub device_id: Option<String>,
    pub mac_address: Option<String>,
}

/// Request body for `POST /auth/refresh`.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Successful login response.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    pub user: UserResponse,
}

/// One-time credentials for a freshly provisioned account.
#[derive(Debug, Serialize)]
pub struct IssuedCredentials {
    pub username: String,
    pub password: String,
}

/// Successful code-redemption response. The credentials are shown exactly
/// once; only the password hash is stored.
#[derive(Debug, Serialize)]
pub struct CodeLoginResponse {
    pub token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub credentials: IssuedCredentials,
    pub user: UserResponse,
}

/// Successful refresh response. No new refresh token: refresh tokens are
/// not rotated on exchange.
#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub token: String,
    pub expires_in: i64,
}

/// The authenticated account with its entitlement grants.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: UserResponse,
    pub channel_ids: Vec<DbId>,
    pub category_ids: Vec<DbId>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/auth/login
///
/// Authenticate a subscriber with username + password.
pub async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let user = UserRepo::find_by_username(&state.pool, &input.username)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Invalid username or password".into(),
            ))
        })?;

    let password_valid = verify_password(&input.password, &user.password_hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;
    if !password_valid {
        return Err(AppError::Core(CoreError::Unauthorized(
            "Invalid username or password".into(),
        )));
    }

    match user.status {
        AccountStatus::Active => {}
        AccountStatus::Expired => {
            return Err(AppError::Core(CoreError::Forbidden(
                "Subscription expired".into(),
            )))
        }
        AccountStatus::Inactive | AccountStatus::Suspended => {
            return Err(AppError::Core(CoreError::Forbidden(
                "Account is not active".into(),
            )))
        }
    }

    // Lazy account expiry: flip on first sight rather than via a sweep.
    if user.subscription_end < Utc::now() {
        UserRepo::set_status(&state.pool, user.id, AccountStatus::Expired).await?;
        return Err(AppError::Core(CoreError::Forbidden(
            "Subscription expired".into(),
        )));
    }

    UserRepo::record_login(&state.pool, user.id).await?;

    let token = generate_access_token(user.id, PrincipalKind::Account, &state.config.jwt)
        .map_err(|e| AppError::InternalError(format!("Token generation error: {e}")))?;
    let refresh_token = generate_refresh_token(user.id, PrincipalKind::Account, &state.config.jwt)
        .map_err(|e| AppError::InternalError(format!("Token generation error: {e}")))?;

    Ok(Json(AuthResponse {
        token,
        refresh_token,
        expires_in: state.config.jwt.account_token_expiry_hours * 3600,
        user: UserResponse::from(&user),
    }))
}

/// POST /api/v1/auth/code-login
///
/// Redeem a subscription code into a freshly provisioned account and log
/// straight into it. The generated credentials are returned exactly once.
pub async fn code_login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<CodeLoginRequest>,
) -> AppResult<Json<CodeLoginResponse>> {
    let code = input.code.trim();
    if code.is_empty() {
        return Err(AppError::BadRequest("Code is required".into()));
    }

    let ip_address = client_ip(&headers);
    let agent = user_agent(&headers);

    // Each attempt runs the full transaction with fresh credentials; only a
    // username collision is retried.
    let mut attempt = 0;
    let (redemption, password) = loop {
        attempt += 1;

        let credentials = generate_credentials();
        let password_hash = hash_password(&credentials.password)
            .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;

        let request = RedeemRequest {
            code: code.to_string(),
            username: credentials.username.clone(),
            password_hash,
            ip_address: ip_address.clone(),
            user_agent: agent.clone(),
            device_id: input.device_id.clone(),
            mac_address: input.mac_address.clone(),
        };

        match RedemptionRepo::redeem(&state.pool, &request).await {
            Ok(redemption) => break (redemption, credentials.password),
            Err(RedemptionError::UsernameCollision) if attempt < MAX_USERNAME_ATTEMPTS => {
                tracing::warn!(attempt, "Generated username collided, retrying");
                continue;
            }
            Err(e) => return Err(e.into()),
        }
    };

    let user = &redemption.user;
    let token = generate_access_token(user.id, PrincipalKind::Account, &state.config.jwt)
        .map_err(|e| AppError::InternalError(format!("Token generation error: {e}")))?;
    let refresh_token = generate_refresh_token(user.id, PrincipalKind::Account, &state.config.jwt)
        .map_err(|e| AppError::InternalError(format!("Token generation error: {e}")))?;

    Ok(Json(CodeLoginResponse {
        token,
        refresh_token,
        expires_in: state.config.jwt.account_token_expiry_hours * 3600,
        credentials: IssuedCredentials {
            username: user.username.clone(),
            password,
        },
        user: UserResponse::from(user),
    }))
}

/// POST /api/v1/auth/refresh
///
/// Exchange a valid refresh token for a new access token. The refresh
/// token itself stays valid until its own expiry (no rotation).
pub async fn refresh(
    State(state): State<AppState>,
    Json(input): Json<RefreshRequest>,
) -> AppResult<Json<RefreshResponse>> {
    let claims = validate_refresh_token(&input.refresh_token, &state.config.jwt).map_err(|_| {
        AppError::Core(CoreError::Unauthorized(
            "Invalid or expired refresh token".into(),
        ))
    })?;

    if claims.kind != PrincipalKind::Account {
        return Err(AppError::Core(CoreError::Unauthorized(
            "Invalid or expired refresh token".into(),
        )));
    }

    let user = UserRepo::find_by_id(&state.pool, claims.sub)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::Unauthorized("Account no longer exists".into())))?;

    if user.status != AccountStatus::Active || user.subscription_end < Utc::now() {
        return Err(AppError::Core(CoreError::Forbidden(
            "Subscription expired or not active".into(),
        )));
    }

    let token = generate_access_token(user.id, PrincipalKind::Account, &state.config.jwt)
        .map_err(|e| AppError::InternalError(format!("Token generation error: {e}")))?;

    Ok(Json(RefreshResponse {
        token,
        expires_in: state.config.jwt.account_token_expiry_hours * 3600,
    }))
}

/// GET /api/v1/auth/me
///
/// The authenticated account and the content it may access. This is what a
/// player app uses to build its channel list after login.
pub async fn me(
    State(state): State<AppState>,
    account: AuthAccount,
) -> AppResult<Json<MeResponse>> {
    let user = UserRepo::find_by_id(&state.pool, account.user_id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::Unauthorized("Account no longer exists".into())))?;

    let mut conn = state.pool.acquire().await?;
    let channel_ids = EntitlementRepo::channels_for_user(&mut *conn, user.id).await?;
    let category_ids = EntitlementRepo::categories_for_user(&mut *conn, user.id).await?;

    Ok(Json(MeResponse {
        user: UserResponse::from(&user),
        channel_ids,
        category_ids,
    }))
}
