//! Bearer token issuing and validation for both principal kinds.
//!
//! Access tokens are HS256-signed JWTs carrying a [`Claims`] payload with a
//! `kind` discriminator. Subscriber accounts and operators use independent
//! secrets and expiry policies, so a leaked account token can never pass as
//! an operator token regardless of its claims.
//!
//! Refresh tokens (account principals only) carry just the principal id and
//! are signed with a third secret. They are exchanged for a new access
//! token without re-authentication and are NOT rotated on use; a refresh
//! token stays valid until its own expiry.

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use primex_core::types::DbId;

/// Who a token speaks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrincipalKind {
    /// A provisioned subscriber account.
    Account,
    /// A back-office operator.
    Operator,
}

/// JWT claims embedded in every access token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject -- the principal's internal database id.
    pub sub: DbId,
    /// Principal kind (`account` or `operator`).
    pub kind: PrincipalKind,
    /// Expiration time (UTC Unix timestamp).
    pub exp: i64,
    /// Issued-at time (UTC Unix timestamp).
    pub iat: i64,
    /// Unique token identifier (UUID v4) for session tracking / audit.
    pub jti: String,
}

/// Claims embedded in a refresh token: principal id and kind only.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RefreshClaims {
    pub sub: DbId,
    pub kind: PrincipalKind,
    pub exp: i64,
    pub iat: i64,
}

/// Configuration for JWT generation and validation.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// HMAC-SHA256 secret for subscriber access tokens.
    pub account_secret: String,
    /// HMAC-SHA256 secret for operator access tokens.
    pub operator_secret: String,
    /// HMAC-SHA256 secret for refresh tokens.
    pub refresh_secret: String,
    /// Subscriber access token lifetime in hours (default: 24).
    pub account_token_expiry_hours: i64,
    /// Operator access token lifetime in hours (default: 24).
    pub operator_token_expiry_hours: i64,
    /// Refresh token lifetime in days (default: 7).
    pub refresh_token_expiry_days: i64,
}

/// Default subscriber access token expiry in hours.
const DEFAULT_ACCOUNT_EXPIRY_HOURS: i64 = 24;
/// Default operator access token expiry in hours.
const DEFAULT_OPERATOR_EXPIRY_HOURS: i64 = 24;
/// Default refresh token expiry in days.
const DEFAULT_REFRESH_EXPIRY_DAYS: i64 = 7;

impl JwtConfig {
    /// Load JWT configuration from environment variables.
    ///
    /// | Env Var                       | Required | Default |
    /// |-------------------------------|----------|---------|
    /// | `ACCOUNT_JWT_SECRET`          | **yes**  | --      |
    /// | `OPERATOR_JWT_SECRET`         | **yes**  | --      |
    /// | `REFRESH_JWT_SECRET`          | **yes**  | --      |
    /// | `ACCOUNT_TOKEN_EXPIRY_HOURS`  | no       | `24`    |
    /// | `OPERATOR_TOKEN_EXPIRY_HOURS` | no       | `24`    |
    /// | `REFRESH_TOKEN_EXPIRY_DAYS`   | no       | `7`     |
    ///
    /// # Panics
    ///
    /// Panics if a required secret is not set or is empty.
    pub fn from_env() -> Self {
        let account_secret = required_secret("ACCOUNT_JWT_SECRET");
        let operator_secret = required_secret("OPERATOR_JWT_SECRET");
        let refresh_secret = required_secret("REFRESH_JWT_SECRET");

        let account_token_expiry_hours = env_i64(
            "ACCOUNT_TOKEN_EXPIRY_HOURS",
            DEFAULT_ACCOUNT_EXPIRY_HOURS,
        );
        let operator_token_expiry_hours = env_i64(
            "OPERATOR_TOKEN_EXPIRY_HOURS",
            DEFAULT_OPERATOR_EXPIRY_HOURS,
        );
        let refresh_token_expiry_days =
            env_i64("REFRESH_TOKEN_EXPIRY_DAYS", DEFAULT_REFRESH_EXPIRY_DAYS);

        Self {
            account_secret,
            operator_secret,
            refresh_secret,
            account_token_expiry_hours,
            operator_token_expiry_hours,
            refresh_token_expiry_days,
        }
    }

    fn secret_for(&self, kind: PrincipalKind) -> &str {
        match kind {
            PrincipalKind::Account => &self.account_secret,
            PrincipalKind::Operator => &self.operator_secret,
        }
    }

    fn expiry_secs_for(&self, kind: PrincipalKind) -> i64 {
        match kind {
            PrincipalKind::Account => self.account_token_expiry_hours * 3600,
            PrincipalKind::Operator => self.operator_token_expiry_hours * 3600,
        }
    }
}

fn required_secret(var: &str) -> String {
    let value = std::env::var(var).unwrap_or_else(|_| panic!("{var} must be set in the environment"));
    assert!(!value.is_empty(), "{var} must not be empty");
    value
}

fn env_i64(var: &str, default: i64) -> i64 {
    std::env::var(var)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .unwrap_or_else(|_| panic!("{var} must be a valid i64"))
}

/// Generate an HS256 access token for the given principal.
pub fn generate_access_token(
    principal_id: DbId,
    kind: PrincipalKind,
    config: &JwtConfig,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: principal_id,
        kind,
        exp: now + config.expiry_secs_for(kind),
        iat: now,
        jti: Uuid::new_v4().to_string(),
    };

    encode(
        &Header::default(), // HS256
        &claims,
        &EncodingKey::from_secret(config.secret_for(kind).as_bytes()),
    )
}

/// Validate an access token for the expected principal kind.
///
/// Validates the signature (against the kind's own secret) and expiry; the
/// embedded `kind` claim is also cross-checked against `expected`.
pub fn validate_access_token(
    token: &str,
    expected: PrincipalKind,
    config: &JwtConfig,
) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret_for(expected).as_bytes()),
        &Validation::default(), // HS256, validates exp
    )?;

    if token_data.claims.kind != expected {
        return Err(jsonwebtoken::errors::ErrorKind::InvalidToken.into());
    }
    Ok(token_data.claims)
}

/// Generate a refresh token for an account principal.
pub fn generate_refresh_token(
    principal_id: DbId,
    kind: PrincipalKind,
    config: &JwtConfig,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now().timestamp();
    let claims = RefreshClaims {
        sub: principal_id,
        kind,
        exp: now + config.refresh_token_expiry_days * 86_400,
        iat: now,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.refresh_secret.as_bytes()),
    )
}

/// Validate a refresh token, returning its claims.
pub fn validate_refresh_token(
    token: &str,
    config: &JwtConfig,
) -> Result<RefreshClaims, jsonwebtoken::errors::Error> {
    let token_data = decode::<RefreshClaims>(
        token,
        &DecodingKey::from_secret(config.refresh_secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}

/// SHA-256 hex digest of a bearer token, for the operator session table.
pub fn hash_token(token: &str) -> String {
    primex_core::hashing::sha256_hex(token.as_bytes())
}
