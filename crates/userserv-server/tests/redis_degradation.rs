//! With Redis unreachable every operation still succeeds against the store.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::Harness;
use userserv_core::CardPatch;
use userserv_db_memory::InMemoryStore;
use userserv_server::{CacheBackend, CacheKey, RedisConfig, create_cache_backend, create_redis_pool};

fn unreachable_redis() -> RedisConfig {
    RedisConfig {
        enabled: true,
        url: "redis://127.0.0.1:1".to_string(),
        pool_size: 2,
        timeout_ms: 200,
    }
}

#[tokio::test]
async fn test_startup_falls_back_to_local_cache() {
    let backend = create_cache_backend(&unreachable_redis(), Duration::from_secs(60)).await;
    assert_eq!(backend.stats().mode, "local");
}

#[tokio::test]
async fn test_operations_succeed_when_redis_is_down() {
    let pool = create_redis_pool(&unreachable_redis()).unwrap();
    let backend = CacheBackend::new_redis(pool, Duration::from_secs(60));
    assert!(!backend.is_redis_available().await);

    let h = Harness::with(Arc::new(InMemoryStore::new()), backend);
    let (caller, user) = h.signup("a@x.com").await;
    let card = h.add_card(&caller, "1111").await;

    let view = h.principals.find_by_id(&caller, user.id).await.unwrap();
    assert_eq!(view.cards, vec![card.clone()]);
    h.principals.find_by_email(&caller, "a@x.com").await.unwrap();

    let patch = CardPatch {
        number: Some("2222".to_string()),
        ..Default::default()
    };
    let updated = h.cards.update(&caller, card.id, patch).await.unwrap();
    assert_eq!(updated.number, "2222");

    // L1 still follows the protocol on its own
    assert!(h.cached_view(&CacheKey::principal_id(user.id)).await.is_none());
    let view = h.principals.find_by_id(&caller, user.id).await.unwrap();
    assert_eq!(view.cards[0].number, "2222");

    h.principals.delete(&caller, user.id).await.unwrap();
    assert!(h.cached_card(&CacheKey::card(card.id)).await.is_none());
}
