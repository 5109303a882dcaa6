pub mod cache;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod observability;
pub mod routes;
pub mod server;
pub mod service;
pub mod validation;

use std::sync::Arc;
use std::time::Duration;

pub use cache::{CacheBackend, CacheCoordinator, CacheKey, CachedEntry, Namespace};
pub use config::{
    AppConfig, AuthConfig, CacheConfig, PostgresStorageConfig, RedisConfig, ServerConfig,
    StorageBackend, StorageConfig,
};
pub use error::{ServiceError, ServiceResult};
pub use observability::init_tracing;
pub use server::{AppState, ServerBuilder, UserservServer, build_app};
pub use service::{CardService, PrincipalService};

use userserv_db_postgres::PostgresStore;
use userserv_storage::{DynRecordStore, StorageError};

/// Open the record store selected by `storage.backend`.
///
/// # Errors
///
/// Returns the store's error if PostgreSQL cannot be reached or migrated.
pub async fn create_record_store(config: &StorageConfig) -> Result<DynRecordStore, StorageError> {
    match config.backend {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory record store; data is lost on restart");
            Ok(userserv_db_memory::create_record_store())
        }
        StorageBackend::Postgres => {
            let store = PostgresStore::new(config.postgres.store_config()).await?;
            Ok(Arc::new(store))
        }
    }
}

/// Build a Redis connection pool from configuration. No connection is opened.
///
/// # Errors
///
/// Returns an error if the URL is malformed.
pub fn create_redis_pool(
    config: &RedisConfig,
) -> Result<deadpool_redis::Pool, deadpool_redis::CreatePoolError> {
    let timeout = Some(Duration::from_millis(config.timeout_ms));
    let mut pool_config = deadpool_redis::PoolConfig::new(config.pool_size);
    pool_config.timeouts.wait = timeout;
    pool_config.timeouts.create = timeout;
    pool_config.timeouts.recycle = timeout;

    let mut redis_config = deadpool_redis::Config::from_url(&config.url);
    redis_config.pool = Some(pool_config);
    redis_config.create_pool(Some(deadpool_redis::Runtime::Tokio1))
}

/// Create a cache backend based on configuration.
///
/// ## Cache Modes
///
/// - **Redis disabled**: Returns local-only cache (DashMap)
/// - **Redis enabled**: Attempts to connect to Redis, falls back to local on failure
///
/// In Redis mode a [`cache::CacheInvalidationListener`] is started so that
/// writes and evictions made by other instances reach this instance's L1.
pub async fn create_cache_backend(config: &RedisConfig, ttl: Duration) -> CacheBackend {
    if !config.enabled {
        tracing::info!("Redis disabled, using local cache only");
        return CacheBackend::new_local();
    }

    tracing::info!(url = %config.url, "Connecting to Redis");

    let pool = match create_redis_pool(config) {
        Ok(pool) => pool,
        Err(e) => {
            tracing::warn!(
                error = %e,
                "Failed to create Redis pool. Falling back to local cache."
            );
            return CacheBackend::new_local();
        }
    };

    // Test connection
    match pool.get().await {
        Ok(_) => {
            tracing::info!("Connected to Redis");

            let backend = CacheBackend::new_redis(pool, ttl);
            cache::CacheInvalidationListener {
                redis_url: config.url.clone(),
                local_cache: Arc::clone(backend.local_cache()),
                instance_id: backend.instance_id().unwrap_or_default().to_string(),
            }
            .start();

            backend
        }
        Err(e) => {
            tracing::warn!(
                error = %e,
                "Failed to connect to Redis. Falling back to local cache."
            );
            CacheBackend::new_local()
        }
    }
}
