//! Cache backend implementation with L1 (DashMap) and L2 (Redis) tiers.

use dashmap::DashMap;
use deadpool_redis::Pool;
use redis::AsyncCommands;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::pubsub::{INVALIDATION_CHANNEL, invalidation_message};

/// A cached entry with TTL support.
#[derive(Clone, Debug)]
pub struct CachedEntry {
    pub data: Arc<Vec<u8>>,
    pub cached_at: Instant,
    pub ttl: Duration,
}

impl CachedEntry {
    /// Create a new cached entry.
    pub fn new(data: Vec<u8>, ttl: Duration) -> Self {
        Self {
            data: Arc::new(data),
            cached_at: Instant::now(),
            ttl,
        }
    }

    /// Check if this entry has expired.
    pub fn is_expired(&self) -> bool {
        self.cached_at.elapsed() > self.ttl
    }
}

/// Two-tier cache backend: L1 (DashMap) + L2 (Redis).
///
/// ## Cache Modes
///
/// - **Local**: Single-instance mode using only DashMap
/// - **Redis**: Multi-instance mode with DashMap (L1) + Redis (L2)
///
/// Redis writes and deletes complete before the call returns, so an eviction
/// issued after a put can never be overtaken by it. Both are published on the
/// invalidation channel, tagged with this instance's id, so peers drop any L1
/// copy they promoted earlier. Every Redis failure is logged and degrades to a
/// miss or a no-op; the cache never reports an error.
#[derive(Clone)]
pub enum CacheBackend {
    /// Single-instance: local DashMap only
    Local(Arc<DashMap<String, CachedEntry>>),

    /// Multi-instance: Redis + local L1
    Redis {
        redis: Pool,
        local: Arc<DashMap<String, CachedEntry>>,
        /// Lifetime of an L1 copy promoted from an L2 hit.
        promote_ttl: Duration,
        /// Origin tag on published invalidations; the listener skips its own.
        instance_id: Arc<str>,
    },
}

impl CacheBackend {
    /// Create a new local-only cache backend.
    pub fn new_local() -> Self {
        CacheBackend::Local(Arc::new(DashMap::new()))
    }

    /// Create a new Redis-backed cache backend.
    pub fn new_redis(redis_pool: Pool, promote_ttl: Duration) -> Self {
        CacheBackend::Redis {
            redis: redis_pool,
            local: Arc::new(DashMap::new()),
            promote_ttl,
            instance_id: Arc::from(uuid::Uuid::new_v4().to_string()),
        }
    }

    /// Get a value from the cache.
    ///
    /// Checks L1 first, then L2. An L2 hit is promoted to L1.
    pub async fn get(&self, key: &str) -> Option<Arc<Vec<u8>>> {
        match self {
            CacheBackend::Local(map) => {
                let result = lookup_local(map, key);
                if result.is_some() {
                    tracing::debug!(key = %key, "cache hit (L1)");
                    crate::metrics::record_cache_hit("L1");
                } else {
                    tracing::debug!(key = %key, "cache miss");
                    crate::metrics::record_cache_miss();
                }
                result
            }
            CacheBackend::Redis {
                redis,
                local,
                promote_ttl,
                ..
            } => {
                if let Some(data) = lookup_local(local, key) {
                    tracing::debug!(key = %key, "cache hit (L1)");
                    crate::metrics::record_cache_hit("L1");
                    return Some(data);
                }

                let mut conn = match redis.get().await {
                    Ok(conn) => conn,
                    Err(e) => {
                        tracing::warn!(key = %key, error = %e, "Failed to get Redis connection");
                        crate::metrics::record_cache_miss();
                        return None;
                    }
                };

                match conn.get::<_, Option<Vec<u8>>>(key).await {
                    Ok(Some(data)) => {
                        tracing::debug!(key = %key, "cache hit (L2)");
                        crate::metrics::record_cache_hit("L2");

                        let entry = CachedEntry::new(data, *promote_ttl);
                        let data_arc = Arc::clone(&entry.data);
                        local.insert(key.to_string(), entry);
                        Some(data_arc)
                    }
                    Ok(None) => {
                        tracing::debug!(key = %key, "cache miss");
                        crate::metrics::record_cache_miss();
                        None
                    }
                    Err(e) => {
                        tracing::warn!(key = %key, error = %e, "Redis GET error");
                        crate::metrics::record_cache_miss();
                        None
                    }
                }
            }
        }
    }

    /// Set a value in the cache with TTL, overwriting any previous entry.
    pub async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) {
        match self {
            CacheBackend::Local(map) => {
                map.insert(key.to_string(), CachedEntry::new(value, ttl));
            }
            CacheBackend::Redis {
                redis,
                local,
                instance_id,
                ..
            } => {
                let entry = CachedEntry::new(value, ttl);
                let data = Arc::clone(&entry.data);
                local.insert(key.to_string(), entry);

                let mut conn = match redis.get().await {
                    Ok(conn) => conn,
                    Err(e) => {
                        tracing::warn!(key = %key, error = %e, "Failed to get Redis connection");
                        return;
                    }
                };

                let ttl_secs = ttl.as_secs().max(1);
                match conn.set_ex::<_, _, ()>(key, data.as_slice(), ttl_secs).await {
                    Ok(()) => {
                        tracing::debug!(key = %key, ttl_secs = %ttl_secs, "cache set (L1+L2)")
                    }
                    Err(e) => tracing::warn!(key = %key, error = %e, "Redis SET error"),
                }
                // Peers may hold an older promoted copy
                let message = invalidation_message(instance_id, key);
                if let Err(e) = conn.publish::<_, _, ()>(INVALIDATION_CHANNEL, message).await {
                    tracing::warn!(key = %key, error = %e, "Redis PUBLISH error");
                }
            }
        }
    }

    /// Invalidate a cache entry. Removing an absent key is a no-op.
    ///
    /// In Redis mode the key is removed from L1 and L2, then published on the
    /// invalidation channel so other instances drop their L1 copy.
    pub async fn invalidate(&self, key: &str) {
        match self {
            CacheBackend::Local(map) => {
                map.remove(key);
                tracing::debug!(key = %key, "cache invalidated (local)");
            }
            CacheBackend::Redis {
                redis,
                local,
                instance_id,
                ..
            } => {
                local.remove(key);

                let mut conn = match redis.get().await {
                    Ok(conn) => conn,
                    Err(e) => {
                        tracing::warn!(key = %key, error = %e, "Failed to get Redis connection");
                        return;
                    }
                };

                if let Err(e) = conn.del::<_, ()>(key).await {
                    tracing::warn!(key = %key, error = %e, "Redis DEL error");
                }
                let message = invalidation_message(instance_id, key);
                match conn.publish::<_, _, ()>(INVALIDATION_CHANNEL, message).await {
                    Ok(()) => tracing::debug!(key = %key, "cache invalidated (L1+L2+pub/sub)"),
                    Err(e) => tracing::warn!(key = %key, error = %e, "Redis PUBLISH error"),
                }
            }
        }
    }

    /// Get cache statistics (L1 only).
    pub fn stats(&self) -> CacheStats {
        match self {
            CacheBackend::Local(map) => CacheStats {
                l1_entries: map.len(),
                mode: "local".to_string(),
            },
            CacheBackend::Redis { local, .. } => CacheStats {
                l1_entries: local.len(),
                mode: "redis".to_string(),
            },
        }
    }

    /// Check if Redis is available (for health checks).
    pub async fn is_redis_available(&self) -> bool {
        match self {
            CacheBackend::Local(_) => false,
            CacheBackend::Redis { redis, .. } => redis.get().await.is_ok(),
        }
    }

    /// Origin tag of this instance's published invalidations. `None` in local mode.
    pub fn instance_id(&self) -> Option<&str> {
        match self {
            CacheBackend::Local(_) => None,
            CacheBackend::Redis { instance_id, .. } => Some(&**instance_id),
        }
    }

    /// The L1 map, shared with the invalidation listener.
    pub fn local_cache(&self) -> &Arc<DashMap<String, CachedEntry>> {
        match self {
            CacheBackend::Local(map) => map,
            CacheBackend::Redis { local, .. } => local,
        }
    }
}

/// Returns a live L1 entry, dropping it if it has expired.
fn lookup_local(map: &DashMap<String, CachedEntry>, key: &str) -> Option<Arc<Vec<u8>>> {
    let entry = map.get(key)?;
    if entry.is_expired() {
        drop(entry);
        map.remove(key);
        return None;
    }
    Some(Arc::clone(&entry.data))
}

/// Cache statistics.
#[derive(Debug, Clone)]
pub struct CacheStats {
    pub l1_entries: usize,
    pub mode: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_local_get_set_invalidate() {
        let cache = CacheBackend::new_local();
        cache
            .set("card:1", b"value".to_vec(), Duration::from_secs(60))
            .await;

        assert_eq!(
            cache.get("card:1").await,
            Some(Arc::new(b"value".to_vec()))
        );
        assert_eq!(cache.stats().l1_entries, 1);
        assert_eq!(cache.stats().mode, "local");

        cache.invalidate("card:1").await;
        cache.invalidate("card:1").await;
        assert!(cache.get("card:1").await.is_none());
    }

    #[tokio::test]
    async fn test_expired_entries_are_dropped() {
        let cache = CacheBackend::new_local();
        cache
            .set("card:2", b"value".to_vec(), Duration::from_millis(20))
            .await;
        tokio::time::sleep(Duration::from_millis(40)).await;

        assert!(cache.get("card:2").await.is_none());
        assert_eq!(cache.stats().l1_entries, 0);
    }

    #[tokio::test]
    async fn test_set_overwrites() {
        let cache = CacheBackend::new_local();
        cache.set("k", b"a".to_vec(), Duration::from_secs(60)).await;
        cache.set("k", b"b".to_vec(), Duration::from_secs(60)).await;

        assert_eq!(cache.get("k").await, Some(Arc::new(b"b".to_vec())));
    }

    #[tokio::test]
    async fn test_local_is_never_redis_available() {
        assert!(!CacheBackend::new_local().is_redis_available().await);
    }
}
