//! Two-tier caching for principal views and cards.
//!
//! ## Architecture
//!
//! - **L1 Cache (DashMap)**: In-memory, per-instance
//! - **L2 Cache (Redis)**: Network, shared across instances
//! - **Pub/Sub**: Cross-instance L1 invalidation
//!
//! ```text
//! service → CacheCoordinator → L1 (DashMap) → L2 (Redis) → miss → RecordStore
//! ```
//!
//! ## Graceful Degradation
//!
//! If Redis is disabled or unreachable at startup the backend runs in L1-only
//! mode. If Redis fails later, reads miss and writes are skipped; the services
//! keep working against the store alone.

pub mod backend;
pub mod coordinator;
pub mod pubsub;

pub use backend::{CacheBackend, CacheStats, CachedEntry};
pub use coordinator::{CacheCoordinator, CacheKey, Namespace};
pub use pubsub::{CacheInvalidationListener, INVALIDATION_CHANNEL};
