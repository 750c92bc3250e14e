//! Activation Engine: the device-pairing state machine.
//!
//! Devices register themselves anonymously, an operator binds them to a
//! plan, and the device polls for the outcome. Registration and activation
//! each run inside one transaction together with their history append;
//! status polls are side-effect-light (telemetry plus the idempotent lazy
//! expiry flip) and take no locks.

use chrono::{Duration, Utc};
use sqlx::PgPool;

use primex_core::accounts::AccountStatus;
use primex_core::devices::{actions, DeviceStatus};
use primex_core::entitlements::ContentAccess;
use primex_core::tokens::generate_device_key;
use primex_core::types::DbId;

use crate::models::device::{
    DeviceActivation, DeviceActivationWithPlan, DeviceFilter, DeviceStatusView,
};
use crate::models::device_history::DeviceHistoryEntry;
use crate::repositories::entitlement_repo::EntitlementRepo;
use crate::repositories::redemption_repo::is_unique_violation;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str =
    "id, device_key, mac_address, device_info, status, subscription_plan_id, user_id, \
     expires_at, last_check_at, last_ip, check_count, activated_by, activated_at, \
     created_at, updated_at";

/// Bounded retries for device-key collisions (the 8-digit space is small
/// enough that collisions happen at scale).
const MAX_KEY_ATTEMPTS: u32 = 5;

/// Why an activation-engine operation failed.
#[derive(Debug, thiserror::Error)]
pub enum ActivationError {
    /// Unknown device key, wrong (key, MAC) pair, or a revoked device.
    /// Deliberately indistinguishable so callers cannot probe which MACs
    /// exist.
    #[error("Device not found")]
    DeviceNotFound,

    #[error("Subscription plan not found")]
    PlanNotFound,

    /// The device is already active and unexpired; re-activation is
    /// rejected rather than silently extended.
    #[error("Device already activated")]
    AlreadyActive,

    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

/// Input for an activation. Credentials are generated (and the password
/// hashed) by the caller before the transaction starts.
#[derive(Debug, Clone)]
pub struct ActivateRequest {
    pub device_key: String,
    pub plan_id: DbId,
    pub operator_id: DbId,
    /// Override for the plan's own duration, in days.
    pub duration_days: Option<i32>,
    pub username: String,
    pub password_hash: String,
}

/// A successful activation: the updated device row, plan name for display,
/// and the account the device is now bound to.
#[derive(Debug)]
pub struct ActivatedDevice {
    pub device: DeviceActivation,
    pub plan_name: String,
    pub username: String,
    /// False when an existing linked account was renewed instead.
    pub account_created: bool,
}

/// Runs the device-pairing state machine.
pub struct DeviceRepo;

impl DeviceRepo {
    /// Register a device by MAC address, returning its pairing record.
    ///
    /// Idempotent with respect to repeated boot-time calls: an existing
    /// non-deactivated record for the MAC is returned as-is (after the
    /// lazy expiry flip where due) instead of minting a new key.
    pub async fn register(
        pool: &PgPool,
        mac_address: &str,
        device_info: &serde_json::Value,
        ip_address: Option<&str>,
    ) -> Result<DeviceActivation, sqlx::Error> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match Self::try_register(pool, mac_address, device_info, ip_address).await {
                Err(e)
                    if attempt < MAX_KEY_ATTEMPTS
                        && (is_unique_violation(&e, "uq_device_activations_device_key")
                            || is_unique_violation(&e, "uq_device_activations_live_mac")) =>
                {
                    // Key collision: retry with a fresh key. Concurrent
                    // registration of the same MAC: retry and return the
                    // winner's record.
                    continue;
                }
                other => return other,
            }
        }
    }

    async fn try_register(
        pool: &PgPool,
        mac_address: &str,
        device_info: &serde_json::Value,
        ip_address: Option<&str>,
    ) -> Result<DeviceActivation, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "SELECT {COLUMNS} FROM device_activations
             WHERE mac_address = $1 AND status != 'deactivated'
             FOR UPDATE"
        );
        let existing: Option<DeviceActivation> = sqlx::query_as(&query)
            .bind(mac_address)
            .fetch_optional(&mut *tx)
            .await?;

        if let Some(device) = existing {
            // An active record whose window lapsed flips to expired before
            // being handed back.
            if device.status == DeviceStatus::Active
                && device.expires_at.is_some_and(|at| at < Utc::now())
            {
                let flip = format!(
                    "UPDATE device_activations SET status = 'expired'
                     WHERE id = $1 AND status = 'active'
                     RETURNING {COLUMNS}"
                );
                let expired: DeviceActivation = sqlx::query_as(&flip)
                    .bind(device.id)
                    .fetch_one(&mut *tx)
                    .await?;
                tx.commit().await?;
                return Ok(expired);
            }
            tx.commit().await?;
            return Ok(device);
        }

        let device_key = generate_device_key();
        let insert = format!(
            "INSERT INTO device_activations
                (device_key, mac_address, device_info, status, last_ip, last_check_at)
             VALUES ($1, $2, $3, 'pending', $4, NOW())
             RETURNING {COLUMNS}"
        );
        let device: DeviceActivation = sqlx::query_as(&insert)
            .bind(&device_key)
            .bind(mac_address)
            .bind(device_info)
            .bind(ip_address)
            .fetch_one(&mut *tx)
            .await?;

        Self::append_history(
            &mut tx,
            device.id,
            actions::REGISTERED,
            None,
            serde_json::json!({ "device_info": device_info }),
            ip_address,
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            device_key = %device.device_key,
            mac_address = %device.mac_address,
            "Device registered"
        );

        Ok(device)
    }

    /// Bind a pending (or expired) device to a plan.
    ///
    /// Provisions an account for the device when it has none; renews the
    /// linked account (new password, fresh subscription window, re-synced
    /// entitlements) when it does. Re-activating an already-active,
    /// unexpired device is rejected with [`ActivationError::AlreadyActive`].
    pub async fn activate(
        pool: &PgPool,
        input: &ActivateRequest,
    ) -> Result<ActivatedDevice, ActivationError> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "SELECT {COLUMNS} FROM device_activations WHERE device_key = $1 FOR UPDATE"
        );
        let device: DeviceActivation = sqlx::query_as(&query)
            .bind(&input.device_key)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(ActivationError::DeviceNotFound)?;

        // Revoked devices are terminal and reported as unknown.
        if device.status == DeviceStatus::Deactivated {
            return Err(ActivationError::DeviceNotFound);
        }

        // An active record whose window already lapsed counts as expired
        // here, which makes this a renewal rather than a rejection.
        let prior_status = if device.status == DeviceStatus::Active
            && device.expires_at.is_some_and(|at| at < Utc::now())
        {
            DeviceStatus::Expired
        } else {
            device.status
        };

        if prior_status == DeviceStatus::Active {
            return Err(ActivationError::AlreadyActive);
        }
        debug_assert!(prior_status.can_transition_to(DeviceStatus::Active));

        let plan: Option<(String, i32, i32)> = sqlx::query_as(
            "SELECT name, duration_days, max_devices
             FROM subscription_plans WHERE id = $1 AND is_active = true",
        )
        .bind(input.plan_id)
        .fetch_optional(&mut *tx)
        .await?;
        let (plan_name, plan_duration_days, max_devices) =
            plan.ok_or(ActivationError::PlanNotFound)?;

        let now = Utc::now();
        let days = input.duration_days.unwrap_or(plan_duration_days);
        let expires_at = now + Duration::days(i64::from(days));

        // Bind an account: renew the linked one, or provision a new one.
        let renewed: Option<(DbId, String)> = match device.user_id {
            Some(user_id) => {
                sqlx::query_as(
                    "UPDATE users SET
                        password_hash = $2,
                        status = $3,
                        subscription_end = $4,
                        plan_id = $5,
                        max_devices = $6
                     WHERE id = $1
                     RETURNING id, username",
                )
                .bind(user_id)
                .bind(&input.password_hash)
                .bind(AccountStatus::Active.as_str())
                .bind(expires_at)
                .bind(input.plan_id)
                .bind(max_devices)
                .fetch_optional(&mut *tx)
                .await?
            }
            None => None,
        };

        let account_created = renewed.is_none();
        let (user_id, username) = match renewed {
            Some(pair) => pair,
            None => {
                sqlx::query_as(
                    "INSERT INTO users
                        (username, password_hash, status, subscription_start, subscription_end,
                         plan_id, max_devices, created_by)
                     VALUES ($1, $2, $3, $4, $5, $6, $7, 'device_activation')
                     RETURNING id, username",
                )
                .bind(&input.username)
                .bind(&input.password_hash)
                .bind(AccountStatus::Active.as_str())
                .bind(now)
                .bind(expires_at)
                .bind(input.plan_id)
                .bind(max_devices)
                .fetch_one(&mut *tx)
                .await?
            }
        };

        // Activation is an explicit (re-)sync point for entitlements.
        let grant = EntitlementRepo::resolve(&mut *tx, input.plan_id).await?;
        EntitlementRepo::grant(&mut *tx, user_id, &grant).await?;

        let update = format!(
            "UPDATE device_activations SET
                status = 'active',
                subscription_plan_id = $2,
                user_id = $3,
                expires_at = $4,
                activated_by = $5,
                activated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        let device: DeviceActivation = sqlx::query_as(&update)
            .bind(device.id)
            .bind(input.plan_id)
            .bind(user_id)
            .bind(expires_at)
            .bind(input.operator_id)
            .fetch_one(&mut *tx)
            .await?;

        Self::append_history(
            &mut tx,
            device.id,
            actions::ACTIVATED,
            Some(input.operator_id),
            serde_json::json!({
                "prior_status": prior_status,
                "plan_id": input.plan_id,
                "plan_name": plan_name,
                "duration_days": days,
                "expires_at": expires_at,
            }),
            None,
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            device_key = %device.device_key,
            plan = %plan_name,
            operator_id = input.operator_id,
            account_created,
            "Device activated"
        );

        Ok(ActivatedDevice {
            device,
            plan_name,
            username,
            account_created,
        })
    }

    /// Answer a device status poll.
    ///
    /// The (key, MAC) pair must match a record; a valid key presented with
    /// the wrong MAC is reported as not found so a leaked key is useless on
    /// other hardware. Benign states (`pending`, `expired`, `deactivated`)
    /// are answers, not errors.
    pub async fn check_status(
        pool: &PgPool,
        device_key: &str,
        mac_address: &str,
        ip_address: Option<&str>,
    ) -> Result<DeviceStatusView, ActivationError> {
        let mut conn = pool.acquire().await?;

        let query = format!(
            "SELECT {COLUMNS} FROM device_activations
             WHERE device_key = $1 AND mac_address = $2"
        );
        let device: DeviceActivation = sqlx::query_as(&query)
            .bind(device_key)
            .bind(mac_address)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or(ActivationError::DeviceNotFound)?;

        // Telemetry only; correctness never depends on these columns.
        sqlx::query(
            "UPDATE device_activations
             SET check_count = check_count + 1,
                 last_check_at = NOW(),
                 last_ip = COALESCE($2, last_ip)
             WHERE id = $1",
        )
        .bind(device.id)
        .bind(ip_address)
        .execute(&mut *conn)
        .await?;

        // Lazy expiry: the flip persists, so the next poll reads `expired`
        // directly off the row. Writing it twice is harmless.
        let mut status = device.status;
        if status == DeviceStatus::Active && device.expires_at.is_some_and(|at| at < Utc::now()) {
            sqlx::query(
                "UPDATE device_activations SET status = 'expired'
                 WHERE id = $1 AND status = 'active'",
            )
            .bind(device.id)
            .execute(&mut *conn)
            .await?;
            status = DeviceStatus::Expired;
        }

        if status != DeviceStatus::Active {
            return Ok(DeviceStatusView {
                device_key: device.device_key,
                status,
                expires_at: None,
                plan_name: None,
                content_access: None,
            });
        }

        // Active: include the plan and the content the device may access.
        let plan: Option<(String, i32)> = match device.subscription_plan_id {
            Some(plan_id) => {
                sqlx::query_as("SELECT name, max_devices FROM subscription_plans WHERE id = $1")
                    .bind(plan_id)
                    .fetch_optional(&mut *conn)
                    .await?
            }
            None => None,
        };

        let content_access = match device.subscription_plan_id {
            Some(plan_id) => {
                let grant = EntitlementRepo::resolve(&mut *conn, plan_id).await?;
                Some(ContentAccess {
                    channel_ids: grant.channel_ids,
                    category_ids: grant.category_ids,
                    max_connections: plan.as_ref().map_or(1, |(_, max)| *max),
                })
            }
            None => None,
        };

        Ok(DeviceStatusView {
            device_key: device.device_key,
            status,
            expires_at: device.expires_at,
            plan_name: plan.map(|(name, _)| name),
            content_access,
        })
    }

    /// Revoke a device. Idempotent: revoking an already-deactivated device
    /// returns the row unchanged. Suspends the linked account, if any.
    pub async fn deactivate(
        pool: &PgPool,
        id: DbId,
        operator_id: DbId,
    ) -> Result<DeviceActivation, ActivationError> {
        let mut tx = pool.begin().await?;

        let query = format!("SELECT {COLUMNS} FROM device_activations WHERE id = $1 FOR UPDATE");
        let device: DeviceActivation = sqlx::query_as(&query)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(ActivationError::DeviceNotFound)?;

        if device.status == DeviceStatus::Deactivated {
            tx.commit().await?;
            return Ok(device);
        }
        debug_assert!(device.status.can_transition_to(DeviceStatus::Deactivated));

        let update = format!(
            "UPDATE device_activations SET status = 'deactivated'
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        let updated: DeviceActivation = sqlx::query_as(&update)
            .bind(device.id)
            .fetch_one(&mut *tx)
            .await?;

        if let Some(user_id) = device.user_id {
            sqlx::query("UPDATE users SET status = $2 WHERE id = $1")
                .bind(user_id)
                .bind(AccountStatus::Suspended.as_str())
                .execute(&mut *tx)
                .await?;
        }

        Self::append_history(
            &mut tx,
            device.id,
            actions::DEACTIVATED,
            Some(operator_id),
            serde_json::json!({ "prior_status": device.status }),
            None,
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            device_key = %updated.device_key,
            operator_id,
            suspended_user = ?device.user_id,
            "Device deactivated"
        );

        Ok(updated)
    }

    /// Find a device by internal ID.
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<DeviceActivation>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM device_activations WHERE id = $1");
        sqlx::query_as::<_, DeviceActivation>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List devices with their plan names, newest first.
    pub async fn list(
        pool: &PgPool,
        filter: &DeviceFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<DeviceActivationWithPlan>, sqlx::Error> {
        sqlx::query_as::<_, DeviceActivationWithPlan>(
            "SELECT d.id, d.device_key, d.mac_address, d.status, sp.name AS plan_name,
                    d.expires_at, d.last_check_at, d.check_count, d.activated_at, d.created_at
             FROM device_activations d
             LEFT JOIN subscription_plans sp ON d.subscription_plan_id = sp.id
             WHERE ($1::text IS NULL OR d.status = $1)
             ORDER BY d.created_at DESC
             LIMIT $2 OFFSET $3",
        )
        .bind(filter.status.map(DeviceStatus::as_str))
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
    }

    /// List devices waiting for activation, oldest first (operator queue).
    pub async fn list_pending(pool: &PgPool) -> Result<Vec<DeviceActivation>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM device_activations
             WHERE status = 'pending'
             ORDER BY created_at ASC"
        );
        sqlx::query_as::<_, DeviceActivation>(&query)
            .fetch_all(pool)
            .await
    }

    /// Read the append-only history for a device, oldest first.
    pub async fn list_history(
        pool: &PgPool,
        device_activation_id: DbId,
    ) -> Result<Vec<DeviceHistoryEntry>, sqlx::Error> {
        sqlx::query_as::<_, DeviceHistoryEntry>(
            "SELECT id, device_activation_id, action, performed_by, details, ip_address, created_at
             FROM device_activation_history
             WHERE device_activation_id = $1
             ORDER BY created_at ASC, id ASC",
        )
        .bind(device_activation_id)
        .fetch_all(pool)
        .await
    }

    async fn append_history(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        device_activation_id: DbId,
        action: &str,
        performed_by: Option<DbId>,
        details: serde_json::Value,
        ip_address: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO device_activation_history
                (device_activation_id, action, performed_by, details, ip_address)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(device_activation_id)
        .bind(action)
        .bind(performed_by)
        .bind(details)
        .bind(ip_address)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}
