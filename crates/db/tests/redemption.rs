//! Integration tests for the Redemption Engine.
//!
//! Exercises the full transaction against a real database: the no-double-
//! spend guarantee under concurrency, all-or-nothing atomicity, lazy status
//! flips, and the entitlement copy.

use chrono::{Duration, Utc};
use sqlx::PgPool;

use primex_core::codes::CodeStatus;
use primex_db::models::code::SubscriptionCode;
use primex_db::repositories::redemption_repo::RedeemRequest;
use primex_db::repositories::{CodeRepo, RedemptionError, RedemptionRepo};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Insert a plan with a delivery server assigned.
async fn seed_plan(pool: &PgPool, name: &str, duration_days: i32) -> i64 {
    sqlx::query_scalar(
        "INSERT INTO subscription_plans (name, duration_days, max_devices, server_id)
         VALUES ($1, $2, 2, 1) RETURNING id",
    )
    .bind(name)
    .bind(duration_days)
    .fetch_one(pool)
    .await
    .expect("plan insert should succeed")
}

/// Insert a plan with NO delivery server.
async fn seed_serverless_plan(pool: &PgPool, name: &str) -> i64 {
    sqlx::query_scalar(
        "INSERT INTO subscription_plans (name, duration_days) VALUES ($1, 30) RETURNING id",
    )
    .bind(name)
    .fetch_one(pool)
    .await
    .expect("plan insert should succeed")
}

async fn seed_channel(pool: &PgPool, name: &str) -> i64 {
    sqlx::query_scalar("INSERT INTO channels (name) VALUES ($1) RETURNING id")
        .bind(name)
        .fetch_one(pool)
        .await
        .expect("channel insert should succeed")
}

async fn map_channel(pool: &PgPool, plan_id: i64, channel_id: i64) {
    sqlx::query("INSERT INTO plan_channels (plan_id, channel_id) VALUES ($1, $2)")
        .bind(plan_id)
        .bind(channel_id)
        .execute(pool)
        .await
        .expect("mapping insert should succeed");
}

/// Insert a code with an explicit token value.
async fn seed_code(
    pool: &PgPool,
    code: &str,
    plan_id: i64,
    duration_days: i32,
    max_uses: i32,
    expires_at: Option<chrono::DateTime<Utc>>,
) -> SubscriptionCode {
    sqlx::query_as(
        "INSERT INTO subscription_codes (code, duration_days, max_uses, plan_id, expires_at)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING id, code, source_name, duration_days, max_uses, used_count, status,
                   expires_at, plan_id, created_by, created_at, updated_at",
    )
    .bind(code)
    .bind(duration_days)
    .bind(max_uses)
    .bind(plan_id)
    .bind(expires_at)
    .fetch_one(pool)
    .await
    .expect("code insert should succeed")
}

fn request(code: &str, username: &str) -> RedeemRequest {
    RedeemRequest {
        code: code.to_string(),
        username: username.to_string(),
        password_hash: "$argon2id$fake-hash-for-tests".to_string(),
        ip_address: Some("203.0.113.7".to_string()),
        user_agent: Some("test-agent".to_string()),
        device_id: None,
        mac_address: None,
    }
}

async fn code_row(pool: &PgPool, id: i64) -> SubscriptionCode {
    CodeRepo::find_by_id(pool, id)
        .await
        .expect("lookup should succeed")
        .expect("code should exist")
}

async fn count_users(pool: &PgPool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await
        .expect("count should succeed")
}

// ---------------------------------------------------------------------------
// Happy path
// ---------------------------------------------------------------------------

/// A successful redemption provisions an account, grants entitlements,
/// consumes one use, and records the audit row.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_redeem_provisions_account(pool: PgPool) {
    let plan_id = seed_plan(&pool, "Monthly", 30).await;
    let ch = seed_channel(&pool, "News HD").await;
    map_channel(&pool, plan_id, ch).await;
    let code = seed_code(&pool, "AAAA-BBBB-CCCC-DDDD", plan_id, 30, 2, None).await;

    let redemption = RedemptionRepo::redeem(&pool, &request("AAAA-BBBB-CCCC-DDDD", "user_alpha01"))
        .await
        .expect("redemption should succeed");

    assert_eq!(redemption.user.username, "user_alpha01");
    assert_eq!(redemption.user.plan_id, Some(plan_id));
    assert_eq!(redemption.user.max_devices, 2);

    // Subscription window: now + 30 days, within a minute of tolerance.
    let expected_end = Utc::now() + Duration::days(30);
    let delta = (redemption.user.subscription_end - expected_end).num_seconds().abs();
    assert!(delta < 60, "subscription_end should be ~30 days out");

    // One use consumed, still active.
    assert_eq!(redemption.code.used_count, 1);
    assert_eq!(redemption.code.status, CodeStatus::Active);

    // Entitlements were copied.
    assert_eq!(redemption.grant.channel_ids, vec![ch]);
    assert!(!redemption.grant.channel_fallback);
    let granted: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM user_channels WHERE user_id = $1")
        .bind(redemption.user.id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(granted, 1);

    // Audit row exists with the caller's IP.
    let (usage_count, ip): (i64, Option<String>) = sqlx::query_as(
        "SELECT COUNT(*), MAX(ip_address) FROM code_usage WHERE code_id = $1",
    )
    .bind(code.id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(usage_count, 1);
    assert_eq!(ip.as_deref(), Some("203.0.113.7"));
}

/// The exact lifecycle scenario: max_uses=2, duration 30 days.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_two_use_code_lifecycle(pool: PgPool) {
    let plan_id = seed_plan(&pool, "Monthly", 30).await;
    let code = seed_code(&pool, "ABCD-1234", plan_id, 30, 2, None).await;

    // First redemption: success, used_count=1, status=active.
    RedemptionRepo::redeem(&pool, &request("ABCD-1234", "user_first00"))
        .await
        .expect("first redemption should succeed");
    let after_first = code_row(&pool, code.id).await;
    assert_eq!(after_first.used_count, 1);
    assert_eq!(after_first.status, CodeStatus::Active);

    // Second redemption: success, used_count=2, status=used.
    RedemptionRepo::redeem(&pool, &request("ABCD-1234", "user_secnd00"))
        .await
        .expect("second redemption should succeed");
    let after_second = code_row(&pool, code.id).await;
    assert_eq!(after_second.used_count, 2);
    assert_eq!(after_second.status, CodeStatus::Used);

    // Third redemption: CodeExhausted.
    let err = RedemptionRepo::redeem(&pool, &request("ABCD-1234", "user_third00"))
        .await
        .expect_err("third redemption must fail");
    assert!(matches!(err, RedemptionError::CodeExhausted));

    // Status never reverses.
    let final_row = code_row(&pool, code.id).await;
    assert_eq!(final_row.status, CodeStatus::Used);
    assert_eq!(final_row.used_count, 2);
}

// ---------------------------------------------------------------------------
// No double-spend under concurrency
// ---------------------------------------------------------------------------

/// Firing N concurrent redemptions at a one-use code yields exactly one
/// success; the rest fail with CodeExhausted and used_count stays at 1.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_concurrent_redemptions_single_use(pool: PgPool) {
    let plan_id = seed_plan(&pool, "Monthly", 30).await;
    let code = seed_code(&pool, "RACE-RACE-RACE-RACE", plan_id, 30, 1, None).await;

    let attempts = 5;
    let futures: Vec<_> = (0..attempts)
        .map(|i| {
            let pool = pool.clone();
            let req = request("RACE-RACE-RACE-RACE", &format!("user_race{i:04}"));
            async move { RedemptionRepo::redeem(&pool, &req).await }
        })
        .collect();

    let results = futures::future::join_all(futures).await;

    let successes = results.iter().filter(|r| r.is_ok()).count();
    let exhausted = results
        .iter()
        .filter(|r| matches!(r, Err(RedemptionError::CodeExhausted)))
        .count();

    assert_eq!(successes, 1, "exactly one concurrent redemption must win");
    assert_eq!(exhausted, attempts - 1, "the rest must see CodeExhausted");

    let final_row = code_row(&pool, code.id).await;
    assert_eq!(final_row.used_count, 1);
    assert_eq!(final_row.status, CodeStatus::Used);
    assert_eq!(count_users(&pool).await, 1, "exactly one account provisioned");
}

// ---------------------------------------------------------------------------
// Atomicity
// ---------------------------------------------------------------------------

/// A failure after the account insert (username collision) leaves zero new
/// accounts, an unchanged used_count, and no audit rows.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_failed_redemption_leaves_no_partial_state(pool: PgPool) {
    let plan_id = seed_plan(&pool, "Monthly", 30).await;
    let code = seed_code(&pool, "ATOM-ATOM-ATOM-ATOM", plan_id, 30, 1, None).await;

    // Occupy the username the redemption will try to claim.
    sqlx::query(
        "INSERT INTO users (username, password_hash, subscription_start, subscription_end)
         VALUES ('user_taken00', 'x', NOW(), NOW() + INTERVAL '30 days')",
    )
    .execute(&pool)
    .await
    .unwrap();
    let users_before = count_users(&pool).await;

    let err = RedemptionRepo::redeem(&pool, &request("ATOM-ATOM-ATOM-ATOM", "user_taken00"))
        .await
        .expect_err("collision must fail the attempt");
    assert!(matches!(err, RedemptionError::UsernameCollision));

    // Nothing from the failed attempt is visible.
    assert_eq!(count_users(&pool).await, users_before);
    let after = code_row(&pool, code.id).await;
    assert_eq!(after.used_count, 0, "used_count must roll back");
    assert_eq!(after.status, CodeStatus::Active);
    let usage: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM code_usage WHERE code_id = $1")
        .bind(code.id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(usage, 0, "no audit row for a failed attempt");
}

/// A plan with no delivery server fails the attempt before any insert.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_serverless_plan_is_rejected(pool: PgPool) {
    let plan_id = seed_serverless_plan(&pool, "Unassigned").await;
    let code = seed_code(&pool, "PLAN-LESS-PLAN-LESS", plan_id, 30, 1, None).await;

    let err = RedemptionRepo::redeem(&pool, &request("PLAN-LESS-PLAN-LESS", "user_nosrv00"))
        .await
        .expect_err("serverless plan must be rejected");
    assert!(matches!(err, RedemptionError::PlanMissing));

    assert_eq!(count_users(&pool).await, 0);
    let after = code_row(&pool, code.id).await;
    assert_eq!(after.used_count, 0);
}

// ---------------------------------------------------------------------------
// Status gates and lazy flips
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_unknown_code_is_rejected(pool: PgPool) {
    let err = RedemptionRepo::redeem(&pool, &request("NOPE-NOPE-NOPE-NOPE", "user_ghost00"))
        .await
        .expect_err("unknown code must fail");
    assert!(matches!(err, RedemptionError::CodeNotFound));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_disabled_code_is_inactive(pool: PgPool) {
    let plan_id = seed_plan(&pool, "Monthly", 30).await;
    let code = seed_code(&pool, "OFFX-OFFX-OFFX-OFFX", plan_id, 30, 1, None).await;
    sqlx::query("UPDATE subscription_codes SET status = 'disabled' WHERE id = $1")
        .bind(code.id)
        .execute(&pool)
        .await
        .unwrap();

    let err = RedemptionRepo::redeem(&pool, &request("OFFX-OFFX-OFFX-OFFX", "user_offed00"))
        .await
        .expect_err("disabled code must fail");
    assert!(matches!(err, RedemptionError::CodeInactive));
}

/// Redeeming a time-expired code fails AND persists the status flip, so the
/// next attempt short-circuits off the stored status.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_expired_code_flip_is_persisted(pool: PgPool) {
    let plan_id = seed_plan(&pool, "Monthly", 30).await;
    let expired_at = Utc::now() - Duration::hours(1);
    let code = seed_code(&pool, "LATE-LATE-LATE-LATE", plan_id, 30, 1, Some(expired_at)).await;

    let err = RedemptionRepo::redeem(&pool, &request("LATE-LATE-LATE-LATE", "user_late000"))
        .await
        .expect_err("expired code must fail");
    assert!(matches!(err, RedemptionError::CodeExpired));

    // The flip survives the failed attempt.
    let after = code_row(&pool, code.id).await;
    assert_eq!(after.status, CodeStatus::Expired);

    // And the second attempt sees the stored status.
    let err = RedemptionRepo::redeem(&pool, &request("LATE-LATE-LATE-LATE", "user_late001"))
        .await
        .expect_err("expired code must keep failing");
    assert!(matches!(err, RedemptionError::CodeExpired));
}

// ---------------------------------------------------------------------------
// Entitlement copy semantics
// ---------------------------------------------------------------------------

/// Grants are copied at provisioning time: a later plan-mapping change does
/// not alter an existing account.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_grants_are_copied_not_linked(pool: PgPool) {
    let plan_id = seed_plan(&pool, "Monthly", 30).await;
    let first = seed_channel(&pool, "First").await;
    map_channel(&pool, plan_id, first).await;
    seed_code(&pool, "COPY-COPY-COPY-COPY", plan_id, 30, 1, None).await;

    let redemption = RedemptionRepo::redeem(&pool, &request("COPY-COPY-COPY-COPY", "user_copy000"))
        .await
        .expect("redemption should succeed");

    // The plan gains a channel afterwards.
    let second = seed_channel(&pool, "Second").await;
    map_channel(&pool, plan_id, second).await;

    let granted: Vec<(i64,)> = sqlx::query_as(
        "SELECT channel_id FROM user_channels WHERE user_id = $1 ORDER BY channel_id",
    )
    .bind(redemption.user.id)
    .fetch_all(&pool)
    .await
    .unwrap();
    assert_eq!(granted, vec![(first,)], "grant set must not change retroactively");
}
