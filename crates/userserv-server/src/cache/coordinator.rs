//! Namespaced cache front used by the services.
//!
//! Principal views are cached under both `principal:id:{id}` and
//! `principal:email:{email}`; cards under `card:{id}`. The `id:`/`email:` tag
//! keeps an email lookup from ever reading an entry stored by id. Values are
//! MessagePack.
//! Every entry gets the same TTL.

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use userserv_core::{CardId, PrincipalId};

use super::backend::CacheBackend;

/// Isolated key space, one per record kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    Principal,
    Card,
}

impl Namespace {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Principal => "principal",
            Self::Card => "card",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A key within a namespace. Renders as `"{namespace}:{key}"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    namespace: Namespace,
    key: String,
}

impl CacheKey {
    pub fn new(namespace: Namespace, key: impl Into<String>) -> Self {
        Self {
            namespace,
            key: key.into(),
        }
    }

    pub fn principal_id(id: PrincipalId) -> Self {
        Self::new(Namespace::Principal, format!("id:{id}"))
    }

    pub fn principal_email(email: &str) -> Self {
        Self::new(Namespace::Principal, format!("email:{email}"))
    }

    pub fn card(id: CardId) -> Self {
        Self::new(Namespace::Card, id.to_string())
    }

    pub fn namespace(&self) -> Namespace {
        self.namespace
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.key)
    }
}

/// get/put/evict over a [`CacheBackend`], with typed values.
///
/// Nothing here returns an error: a backend failure is a miss on read and a
/// no-op on write, so callers always fall through to the store.
#[derive(Clone)]
pub struct CacheCoordinator {
    backend: CacheBackend,
    ttl: Duration,
}

impl CacheCoordinator {
    pub fn new(backend: CacheBackend, ttl: Duration) -> Self {
        Self { backend, ttl }
    }

    pub fn backend(&self) -> &CacheBackend {
        &self.backend
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the cached value, or `None` on a miss.
    ///
    /// An entry that fails to decode is evicted and reported as a miss.
    pub async fn get<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let rendered = key.to_string();
        let bytes = self.backend.get(&rendered).await?;

        match rmp_serde::from_slice(&bytes) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key = %rendered, error = %e, "Failed to decode cached entry");
                self.evict(key).await;
                None
            }
        }
    }

    /// Stores `value` at `key`, replacing whatever was there.
    pub async fn put<T: Serialize>(&self, key: &CacheKey, value: &T) {
        let rendered = key.to_string();
        match rmp_serde::to_vec_named(value) {
            Ok(bytes) => self.backend.set(&rendered, bytes, self.ttl).await,
            Err(e) => tracing::warn!(key = %rendered, error = %e, "Failed to encode cache entry"),
        }
    }

    /// Removes `key`. Absent keys are ignored.
    pub async fn evict(&self, key: &CacheKey) {
        self.backend.invalidate(&key.to_string()).await;
        crate::metrics::record_cache_eviction(key.namespace().as_str());
    }

    /// Evicts a set of keys that may span both namespaces.
    pub async fn evict_many(&self, keys: &[CacheKey]) {
        for key in keys {
            self.evict(key).await;
        }
    }
}
