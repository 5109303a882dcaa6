//! In-memory record store backend for the userserv server.
//!
//! This crate provides an in-memory implementation of the `RecordStore` trait
//! from `userserv-storage`. It is used by tests and by deployments started with
//! `storage.backend = "memory"`.
//!
//! # Example
//!
//! ```ignore
//! use userserv_db_memory::InMemoryStore;
//! use userserv_storage::RecordStore;
//!
//! let store = InMemoryStore::new();
//! let created = store.insert_principal(&principal).await?;
//! ```

mod record_impl;
pub mod storage;

pub use storage::InMemoryStore;
pub use userserv_storage::{RecordStore, StorageError};

/// Type alias for a shareable RecordStore instance.
pub type DynRecordStore = std::sync::Arc<dyn RecordStore>;

/// Creates a new in-memory RecordStore instance.
pub fn create_record_store() -> DynRecordStore {
    std::sync::Arc::new(InMemoryStore::new())
}
