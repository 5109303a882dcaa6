//! The record store trait.

use async_trait::async_trait;
use userserv_core::{Card, CardId, NewCard, Principal, PrincipalId};

use crate::error::StorageError;

/// What a cascading principal delete removed.
///
/// The caller needs the email and the card ids to invalidate every cached
/// copy of the deleted records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletedPrincipal {
    pub principal: Principal,
    pub cards: Vec<CardId>,
}

/// Authoritative persistence for principals and cards.
///
/// Every mutating method is a single atomic unit: uniqueness checks,
/// existence checks and the write itself either all take effect or none do.
/// Implementations must be thread-safe (`Send + Sync`).
#[async_trait]
pub trait RecordStore: Send + Sync {
    // ==================== Principals ====================

    /// Inserts a new principal.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` (field `id` or `email`) if the identifier
    /// or the email is already taken.
    async fn insert_principal(&self, principal: &Principal) -> Result<Principal, StorageError>;

    /// Replaces the stored principal with the same id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the principal does not exist.
    /// Returns `StorageError::Conflict` if the email belongs to another principal.
    async fn update_principal(&self, principal: &Principal) -> Result<Principal, StorageError>;

    /// Deletes a principal and every card it owns.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the principal does not exist.
    async fn delete_principal(&self, id: PrincipalId) -> Result<DeletedPrincipal, StorageError>;

    /// Reads a principal by id. Returns `None` if it does not exist.
    async fn find_principal(&self, id: PrincipalId) -> Result<Option<Principal>, StorageError>;

    /// Reads a principal by email. Returns `None` if no principal has it.
    async fn find_principal_by_email(
        &self,
        email: &str,
    ) -> Result<Option<Principal>, StorageError>;

    /// Reads every existing principal whose id is in `ids`. Missing ids are skipped.
    async fn find_principals(&self, ids: &[PrincipalId]) -> Result<Vec<Principal>, StorageError>;

    /// Returns `true` if some principal has this email.
    async fn principal_email_exists(&self, email: &str) -> Result<bool, StorageError>;

    // ==================== Cards ====================

    /// Inserts a new card and assigns its id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the number is taken.
    /// Returns `StorageError::ForeignKeyViolation` if the owner does not exist.
    async fn insert_card(&self, card: &NewCard) -> Result<Card, StorageError>;

    /// Replaces number, holder and expiration date of the stored card with the
    /// same id. The owner is never changed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the card does not exist.
    /// Returns `StorageError::Conflict` if the number belongs to another card.
    async fn update_card(&self, card: &Card) -> Result<Card, StorageError>;

    /// Deletes a card and returns the removed record.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the card does not exist.
    async fn delete_card(&self, id: CardId) -> Result<Card, StorageError>;

    /// Reads a card by id. Returns `None` if it does not exist.
    async fn find_card(&self, id: CardId) -> Result<Option<Card>, StorageError>;

    /// Reads every existing card whose id is in `ids`. Missing ids are skipped.
    async fn find_cards(&self, ids: &[CardId]) -> Result<Vec<Card>, StorageError>;

    /// Reads every card owned by `owner`, ordered by id.
    async fn find_cards_by_owner(&self, owner: PrincipalId) -> Result<Vec<Card>, StorageError>;

    /// Returns `true` if some card has this number.
    async fn card_number_exists(&self, number: &str) -> Result<bool, StorageError>;

    // ==================== Metadata ====================

    /// Cheap round trip used by readiness probes.
    async fn ping(&self) -> Result<(), StorageError>;

    /// Returns the name of this storage backend for logging/debugging.
    fn backend_name(&self) -> &'static str;
}
