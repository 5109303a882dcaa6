//! # userserv-storage
//!
//! Storage abstraction layer for the userserv record store.
//!
//! This crate defines the trait every authoritative backend implements and the
//! error type it reports. It does not contain any implementations - those are
//! provided by `userserv-db-memory` and `userserv-db-postgres`.
//!
//! ## Overview
//!
//! [`RecordStore`] covers both entity kinds:
//! - principals: insert, update, cascading delete, lookup by id / email / id batch,
//!   email existence
//! - cards: insert, update, delete, lookup by id / id batch / owner, number existence
//!
//! Uniqueness of principal emails and card numbers, and the card → principal
//! reference, are enforced by the backend itself: a colliding write fails with
//! [`StorageError::Conflict`] no matter what the caller checked beforehand.
//!
//! ## Example
//!
//! ```ignore
//! use userserv_storage::{RecordStore, StorageError};
//!
//! async fn owner_email(store: &dyn RecordStore, card: CardId) -> Result<String, StorageError> {
//!     let card = store
//!         .find_card(card)
//!         .await?
//!         .ok_or_else(|| StorageError::not_found("Card", card.to_string()))?;
//!     let owner = store
//!         .find_principal(card.owner_id)
//!         .await?
//!         .ok_or_else(|| StorageError::not_found("Principal", card.owner_id.to_string()))?;
//!     Ok(owner.email)
//! }
//! ```

mod error;
mod traits;

pub use error::{ErrorCategory, StorageError};
pub use traits::{DeletedPrincipal, RecordStore};

/// Type alias for a storage result.
pub type StorageResult<T> = Result<T, StorageError>;

/// Type alias for a shared record store trait object.
pub type DynRecordStore = std::sync::Arc<dyn RecordStore>;
