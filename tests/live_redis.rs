//! Page cache tests against a running Redis.
//!
//! - Reads the connection url from `SCRIBE_TEST_REDIS_URL` (default `redis://127.0.0.1:6379/15`).
//! - Marked `#[ignore]` so it only runs when a Redis instance is available.

use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;
use uuid::Uuid;

use scribe::application::pagination::PageKey;
use scribe::cache::{CacheBackend, CacheConfig, CacheKey, PageCache, RedisBackend};
use scribe::domain::entities::PostRecord;

type TestResult<T> = Result<T, Box<dyn std::error::Error>>;

fn redis_url() -> String {
    std::env::var("SCRIBE_TEST_REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379/15".into())
}

/// Each run uses its own namespace so concurrent runs never see each other's keys.
fn isolated_config() -> CacheConfig {
    CacheConfig {
        namespace: format!("scribe-test:{}:", Uuid::new_v4().simple()),
        ..CacheConfig::default()
    }
}

fn post(id: i64) -> PostRecord {
    let now = OffsetDateTime::now_utc();
    PostRecord {
        id,
        title: format!("Live post {id}"),
        body: "cached in redis".into(),
        created_at: now,
        updated_at: now,
        deleted_at: None,
    }
}

#[tokio::test]
#[ignore]
async fn live_redis_round_trip_and_invalidate() -> TestResult<()> {
    let backend = Arc::new(RedisBackend::connect(&redis_url())?);
    backend.ping().await?;

    let config = isolated_config();
    let cache = PageCache::new(backend, &config);
    let key = CacheKey::from(PageKey::new(1, 10).ok_or("invalid page key")?);

    assert!(cache.get(&key).await.is_none());
    cache
        .put(&key, &[post(1), post(2)], Duration::from_secs(30))
        .await?;
    cache
        .put(&CacheKey::AllPosts, &[post(1)], Duration::from_secs(30))
        .await?;

    let cached = cache.get(&key).await.ok_or("expected cached page")?;
    assert_eq!(
        cached.iter().map(|post| post.id).collect::<Vec<_>>(),
        vec![1, 2]
    );

    let removed = cache.invalidate_all().await?;
    assert_eq!(removed, 2);
    assert!(cache.get(&key).await.is_none());
    assert!(cache.get(&CacheKey::AllPosts).await.is_none());
    Ok(())
}

#[tokio::test]
#[ignore]
async fn live_redis_entries_expire() -> TestResult<()> {
    let backend = Arc::new(RedisBackend::connect(&redis_url())?);
    let config = isolated_config();
    let cache = PageCache::new(backend, &config);

    cache
        .put(&CacheKey::AllPosts, &[post(7)], Duration::from_secs(1))
        .await?;
    assert!(cache.get(&CacheKey::AllPosts).await.is_some());

    tokio::time::sleep(Duration::from_millis(1_500)).await;
    assert!(cache.get(&CacheKey::AllPosts).await.is_none());
    Ok(())
}
