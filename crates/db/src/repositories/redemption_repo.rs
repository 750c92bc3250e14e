//! Redemption Engine: turns a subscription code into a provisioned account.
//!
//! The whole sequence runs inside one transaction so a failure at any step
//! leaves no half-provisioned account and no incremented-but-unused code.
//! The two deliberate exceptions are the lazy status flips (`expired`,
//! exhaustion discovered before consumption): those are committed even
//! though the attempt itself fails, per the code lifecycle contract.

use chrono::{Duration, Utc};
use sqlx::PgPool;

use primex_core::accounts::AccountStatus;
use primex_core::codes::CodeStatus;
use primex_core::entitlements::EntitlementGrant;

use crate::models::code::SubscriptionCode;
use crate::models::plan::Plan;
use crate::models::user::User;
use crate::repositories::code_repo::{self, CodeRepo};
use crate::repositories::entitlement_repo::EntitlementRepo;
use crate::repositories::user_repo;

/// Why a redemption attempt failed.
///
/// Every variant maps to a distinct, fixed user-facing message; none of
/// them leak store internals.
#[derive(Debug, thiserror::Error)]
pub enum RedemptionError {
    #[error("Invalid code")]
    CodeNotFound,

    #[error("Code is not redeemable")]
    CodeInactive,

    #[error("Code has expired")]
    CodeExpired,

    #[error("Code has been fully used")]
    CodeExhausted,

    #[error("Code is not linked to an available delivery server")]
    PlanMissing,

    /// The generated username already exists. Retried by the caller with
    /// fresh credentials; never surfaced to the subscriber directly.
    #[error("Generated username collided")]
    UsernameCollision,

    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

/// Input for one redemption attempt. Credentials are generated (and the
/// password hashed) by the caller before the transaction starts.
#[derive(Debug, Clone)]
pub struct RedeemRequest {
    pub code: String,
    pub username: String,
    pub password_hash: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub device_id: Option<String>,
    pub mac_address: Option<String>,
}

/// A successful redemption: the new account, the post-redemption code row,
/// and the entitlements that were granted.
#[derive(Debug)]
pub struct Redemption {
    pub user: User,
    pub code: SubscriptionCode,
    pub grant: EntitlementGrant,
}

/// Runs the redemption state machine.
pub struct RedemptionRepo;

impl RedemptionRepo {
    /// Redeem a code, provisioning a new account.
    ///
    /// Concurrent redemptions of the same code serialize on a row lock;
    /// the `used_count` increment itself is additionally guarded by
    /// [`CodeRepo::try_consume`] so exactly `max_uses` attempts can ever
    /// succeed.
    pub async fn redeem(
        pool: &PgPool,
        input: &RedeemRequest,
    ) -> Result<Redemption, RedemptionError> {
        let mut tx = pool.begin().await?;

        // Lock the code row for the duration of the attempt.
        let query = format!(
            "SELECT {} FROM subscription_codes WHERE code = $1 FOR UPDATE",
            code_repo::COLUMNS
        );
        let code: SubscriptionCode = sqlx::query_as(&query)
            .bind(&input.code)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(RedemptionError::CodeNotFound)?;

        match code.status {
            CodeStatus::Active => {}
            CodeStatus::Used => return Err(RedemptionError::CodeExhausted),
            CodeStatus::Expired => return Err(RedemptionError::CodeExpired),
            CodeStatus::Disabled => return Err(RedemptionError::CodeInactive),
        }

        // Lazy expiry: the flip is persisted even though the attempt fails.
        if code.expires_at.is_some_and(|at| at < Utc::now()) {
            Self::transition(&mut tx, &code, CodeStatus::Expired).await?;
            tx.commit().await?;
            return Err(RedemptionError::CodeExpired);
        }

        // Exhaustion discovered before consumption: also persisted.
        if code.used_count >= code.max_uses {
            Self::transition(&mut tx, &code, CodeStatus::Used).await?;
            tx.commit().await?;
            return Err(RedemptionError::CodeExhausted);
        }

        // A code must never provision an account with no delivery server.
        let plan: Option<Plan> = sqlx::query_as(
            "SELECT id, name, duration_days, max_devices, server_id, is_active,
                    created_at, updated_at
             FROM subscription_plans WHERE id = $1 AND is_active = true",
        )
        .bind(code.plan_id)
        .fetch_optional(&mut *tx)
        .await?;
        let plan = plan
            .filter(|p| p.server_id.is_some())
            .ok_or(RedemptionError::PlanMissing)?;

        // Subscription window. Codes snapshot the plan duration at
        // generation time; take the longer of the two if they diverged.
        let now = Utc::now();
        let days = plan.duration_days.max(code.duration_days);
        let subscription_end = now + Duration::days(i64::from(days));

        let insert_user = format!(
            "INSERT INTO users
                (username, password_hash, status, subscription_start, subscription_end,
                 plan_id, max_devices, created_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7, 'code_redemption')
             RETURNING {}",
            user_repo::COLUMNS
        );
        let user: User = sqlx::query_as(&insert_user)
            .bind(&input.username)
            .bind(&input.password_hash)
            .bind(AccountStatus::Active.as_str())
            .bind(now)
            .bind(subscription_end)
            .bind(plan.id)
            .bind(plan.max_devices)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                if is_unique_violation(&e, "uq_users_username") {
                    RedemptionError::UsernameCollision
                } else {
                    RedemptionError::Db(e)
                }
            })?;

        // Consume one use. Unreachable-to-fail under the row lock, but the
        // CAS is authoritative: a miss rolls back the account insert too.
        let consumed = CodeRepo::try_consume(&mut *tx, code.id)
            .await?
            .ok_or(RedemptionError::CodeExhausted)?;

        if consumed.exhausted() {
            Self::transition(&mut tx, &code, CodeStatus::Used).await?;
        }

        // Entitlements are copied onto the account, not live-linked.
        let grant = EntitlementRepo::resolve(&mut *tx, plan.id).await?;
        EntitlementRepo::grant(&mut *tx, user.id, &grant).await?;

        sqlx::query(
            "INSERT INTO code_usage
                (code_id, user_id, ip_address, user_agent, device_id, mac_address)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(code.id)
        .bind(user.id)
        .bind(&input.ip_address)
        .bind(&input.user_agent)
        .bind(&input.device_id)
        .bind(&input.mac_address)
        .execute(&mut *tx)
        .await?;

        let reload = format!(
            "SELECT {} FROM subscription_codes WHERE id = $1",
            code_repo::COLUMNS
        );
        let code: SubscriptionCode = sqlx::query_as(&reload)
            .bind(code.id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(
            code_id = code.id,
            user_id = user.id,
            username = %user.username,
            used_count = code.used_count,
            "Code redeemed"
        );

        Ok(Redemption { user, code, grant })
    }

    /// Apply a status transition, enforcing the forward-only table.
    async fn transition(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        code: &SubscriptionCode,
        next: CodeStatus,
    ) -> Result<(), RedemptionError> {
        debug_assert!(code.status.can_transition_to(next));
        sqlx::query("UPDATE subscription_codes SET status = $2 WHERE id = $1 AND status = $3")
            .bind(code.id)
            .bind(next.as_str())
            .bind(code.status.as_str())
            .execute(&mut **tx)
            .await?;
        Ok(())
    }
}

/// Whether a sqlx error is a unique-constraint violation on the named
/// constraint.
pub(crate) fn is_unique_violation(err: &sqlx::Error, constraint: &str) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            db_err.code().as_deref() == Some("23505")
                && db_err.constraint() == Some(constraint)
        }
        _ => false,
    }
}
