//! Integration tests for the two-tier cache against a real Redis.
//!
//! - L1 (DashMap): per-instance
//! - L2 (Redis): shared across instances, with pub/sub invalidation
//!
//! Tests use testcontainers to spin up Redis.

use std::sync::Arc;
use std::time::Duration;

use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::redis::Redis;
use tokio::sync::OnceCell;
use userserv_server::{RedisConfig, create_cache_backend};

// Shared Redis container for all tests
static SHARED_REDIS: OnceCell<(ContainerAsync<Redis>, String)> = OnceCell::const_new();

async fn get_redis_url() -> String {
    let (_, url) = SHARED_REDIS
        .get_or_init(|| async {
            let container = Redis::default()
                .start()
                .await
                .expect("start redis container");

            let host_port = container.get_host_port_ipv4(6379).await.expect("get port");
            let url = format!("redis://127.0.0.1:{host_port}");

            (container, url)
        })
        .await;

    url.clone()
}

async fn redis_config() -> RedisConfig {
    RedisConfig {
        enabled: true,
        url: get_redis_url().await,
        pool_size: 5,
        timeout_ms: 5000,
    }
}

const TTL: Duration = Duration::from_secs(60);

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_redis_cache_connection() {
    let cache = create_cache_backend(&redis_config().await, TTL).await;

    assert!(cache.is_redis_available().await);
    assert_eq!(cache.stats().mode, "redis");
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_set_is_visible_to_another_instance() {
    let config = redis_config().await;
    let cache1 = create_cache_backend(&config, TTL).await;
    let cache2 = create_cache_backend(&config, TTL).await;

    cache1
        .set("principal:promotion", b"view".to_vec(), TTL)
        .await;

    // The write reached Redis before set returned; cache2 promotes it into L1
    let value = cache2.get("principal:promotion").await;
    assert_eq!(value, Some(Arc::new(b"view".to_vec())));
    assert!(cache2.local_cache().contains_key("principal:promotion"));
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_invalidation_reaches_other_instances() {
    let config = redis_config().await;
    let cache1 = create_cache_backend(&config, TTL).await;
    let cache2 = create_cache_backend(&config, TTL).await;
    // Let both listeners subscribe
    tokio::time::sleep(Duration::from_millis(300)).await;

    cache1.set("card:77", b"card".to_vec(), TTL).await;
    assert!(cache2.get("card:77").await.is_some());
    assert!(cache2.local_cache().contains_key("card:77"));

    cache1.invalidate("card:77").await;
    assert!(cache1.get("card:77").await.is_none());

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(!cache2.local_cache().contains_key("card:77"));
    assert!(cache2.get("card:77").await.is_none());
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_overwrite_replaces_promoted_copy_on_other_instances() {
    let config = redis_config().await;
    let cache1 = create_cache_backend(&config, TTL).await;
    let cache2 = create_cache_backend(&config, TTL).await;
    tokio::time::sleep(Duration::from_millis(300)).await;

    cache1.set("card:88", b"1111".to_vec(), TTL).await;
    assert_eq!(cache2.get("card:88").await, Some(Arc::new(b"1111".to_vec())));
    assert!(cache2.local_cache().contains_key("card:88"));

    cache1.set("card:88", b"2222".to_vec(), TTL).await;
    tokio::time::sleep(Duration::from_millis(300)).await;

    // The writer keeps its own fresh L1 copy
    assert!(cache1.local_cache().contains_key("card:88"));
    assert_eq!(cache2.get("card:88").await, Some(Arc::new(b"2222".to_vec())));
}

#[tokio::test]
async fn test_graceful_degradation_invalid_url() {
    let config = RedisConfig {
        enabled: true,
        url: "redis://nonexistent:9999".to_string(),
        pool_size: 5,
        timeout_ms: 1000,
    };

    let cache = create_cache_backend(&config, TTL).await;
    assert!(!cache.is_redis_available().await);

    cache.set("fallback_key", b"fallback_value".to_vec(), TTL).await;
    let value = cache.get("fallback_key").await;
    assert_eq!(value, Some(Arc::new(b"fallback_value".to_vec())));
    assert_eq!(cache.stats().mode, "local");
}
