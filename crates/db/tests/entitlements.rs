//! Integration tests for the Entitlement Resolver.

use sqlx::PgPool;

use primex_core::entitlements::EntitlementGrant;
use primex_db::repositories::EntitlementRepo;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn seed_plan(pool: &PgPool, name: &str) -> i64 {
    sqlx::query_scalar(
        "INSERT INTO subscription_plans (name, duration_days, server_id)
         VALUES ($1, 30, 1) RETURNING id",
    )
    .bind(name)
    .fetch_one(pool)
    .await
    .expect("plan insert should succeed")
}

async fn seed_channel(pool: &PgPool, name: &str, active: bool) -> i64 {
    sqlx::query_scalar("INSERT INTO channels (name, is_active) VALUES ($1, $2) RETURNING id")
        .bind(name)
        .bind(active)
        .fetch_one(pool)
        .await
        .expect("channel insert should succeed")
}

async fn seed_category(pool: &PgPool, name: &str) -> i64 {
    sqlx::query_scalar("INSERT INTO categories (name) VALUES ($1) RETURNING id")
        .bind(name)
        .fetch_one(pool)
        .await
        .expect("category insert should succeed")
}

async fn map_channel(pool: &PgPool, plan_id: i64, channel_id: i64) {
    sqlx::query("INSERT INTO plan_channels (plan_id, channel_id) VALUES ($1, $2)")
        .bind(plan_id)
        .bind(channel_id)
        .execute(pool)
        .await
        .expect("mapping insert should succeed");
}

async fn seed_user(pool: &PgPool, username: &str) -> i64 {
    sqlx::query_scalar(
        "INSERT INTO users (username, password_hash, subscription_start, subscription_end)
         VALUES ($1, 'x', NOW(), NOW() + INTERVAL '30 days') RETURNING id",
    )
    .bind(username)
    .fetch_one(pool)
    .await
    .expect("user insert should succeed")
}

async fn resolve(pool: &PgPool, plan_id: i64) -> EntitlementGrant {
    let mut conn = pool.acquire().await.expect("acquire should succeed");
    EntitlementRepo::resolve(&mut *conn, plan_id)
        .await
        .expect("resolve should succeed")
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Explicitly mapped plans grant exactly the mapped active content, and the
/// fallback flags say so.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_mapped_plan_grants_mapped_content_only(pool: PgPool) {
    let plan_id = seed_plan(&pool, "Sports").await;
    let mapped = seed_channel(&pool, "Sports One", true).await;
    let inactive = seed_channel(&pool, "Sports Off-Air", false).await;
    let _unmapped = seed_channel(&pool, "Movies", true).await;
    map_channel(&pool, plan_id, mapped).await;
    map_channel(&pool, plan_id, inactive).await;

    let grant = resolve(&pool, plan_id).await;

    assert_eq!(grant.channel_ids, vec![mapped], "only active mapped channels");
    assert!(!grant.channel_fallback);
}

/// A plan with no mapping falls back to all active content, flagged.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_unmapped_plan_falls_back_to_all_active(pool: PgPool) {
    let plan_id = seed_plan(&pool, "Everything").await;
    let a = seed_channel(&pool, "A", true).await;
    let b = seed_channel(&pool, "B", true).await;
    let _off = seed_channel(&pool, "Off", false).await;
    let cat = seed_category(&pool, "General").await;

    let grant = resolve(&pool, plan_id).await;

    assert_eq!(grant.channel_ids, vec![a, b]);
    assert!(grant.channel_fallback, "fallback branch must be flagged");
    assert_eq!(grant.category_ids, vec![cat]);
    assert!(grant.category_fallback);
}

/// Channel and category fallbacks are independent.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_fallbacks_are_independent(pool: PgPool) {
    let plan_id = seed_plan(&pool, "Mixed").await;
    let ch = seed_channel(&pool, "Mapped", true).await;
    let cat = seed_category(&pool, "Unmapped Cat").await;
    map_channel(&pool, plan_id, ch).await;

    let grant = resolve(&pool, plan_id).await;

    assert!(!grant.channel_fallback);
    assert!(grant.category_fallback);
    assert_eq!(grant.category_ids, vec![cat]);
}

// ---------------------------------------------------------------------------
// Grant persistence
// ---------------------------------------------------------------------------

/// grant() replaces the previous set rather than accumulating.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_grant_replaces_previous_set(pool: PgPool) {
    let a = seed_channel(&pool, "A", true).await;
    let b = seed_channel(&pool, "B", true).await;
    let user_id = seed_user(&pool, "user_grants0").await;

    let mut conn = pool.acquire().await.unwrap();

    let first = EntitlementGrant {
        channel_ids: vec![a],
        category_ids: vec![],
        channel_fallback: false,
        category_fallback: false,
    };
    EntitlementRepo::grant(&mut *conn, user_id, &first).await.unwrap();

    let second = EntitlementGrant {
        channel_ids: vec![b],
        category_ids: vec![],
        channel_fallback: false,
        category_fallback: false,
    };
    EntitlementRepo::grant(&mut *conn, user_id, &second).await.unwrap();

    let channels = EntitlementRepo::channels_for_user(&mut *conn, user_id)
        .await
        .unwrap();
    assert_eq!(channels, vec![b], "re-grant must replace, not append");
}
