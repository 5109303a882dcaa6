use std::sync::Arc;

use userserv_auth::{AccessGuard, Caller};
use userserv_core::{Card, CardId, CardPatch, NewCard, Principal, PrincipalId};
use userserv_storage::DynRecordStore;

use super::{principal_keys, require_identity};
use crate::cache::{CacheCoordinator, CacheKey};
use crate::error::{ServiceError, ServiceResult};

/// Card operations over the record store and the cache.
///
/// Authorization always goes through the card's owning principal, never the
/// card id.
#[derive(Clone)]
pub struct CardService {
    store: DynRecordStore,
    cache: Arc<CacheCoordinator>,
}

impl CardService {
    pub fn new(store: DynRecordStore, cache: Arc<CacheCoordinator>) -> Self {
        Self { store, cache }
    }

    /// Creates a card for the caller. The declared owner must be the caller and
    /// must exist.
    #[tracing::instrument(skip(self, new), fields(owner_id = %new.owner_id))]
    pub async fn create(&self, caller: &Caller, new: NewCard) -> ServiceResult<Card> {
        ServiceError::check(AccessGuard::authorize(caller, new.owner_id))?;

        if self.store.card_number_exists(&new.number).await? {
            return Err(ServiceError::conflict("number", new.number));
        }
        let owner = self
            .store
            .find_principal(new.owner_id)
            .await?
            .ok_or_else(ServiceError::user_not_found)?;

        let card = self.store.insert_card(&new).await?;

        self.cache.evict_many(&principal_keys(&owner)).await;

        tracing::info!(card_id = %card.id, owner_id = %owner.id, "Card created");
        Ok(card)
    }

    #[tracing::instrument(skip(self))]
    pub async fn find_by_id(&self, caller: &Caller, id: CardId) -> ServiceResult<Card> {
        require_identity(caller)?;

        let key = CacheKey::card(id);
        if let Some(card) = self.cache.get::<Card>(&key).await {
            ServiceError::check(AccessGuard::authorize(caller, card.owner_id))?;
            return Ok(card);
        }

        let card = self
            .store
            .find_card(id)
            .await?
            .ok_or_else(ServiceError::card_not_found)?;
        ServiceError::check(AccessGuard::authorize(caller, card.owner_id))?;

        self.cache.put(&key, &card).await;
        Ok(card)
    }

    /// Batch lookup. Bypasses the cache; cards the caller does not own are
    /// dropped from the result.
    #[tracing::instrument(skip(self, ids), fields(count = ids.len()))]
    pub async fn find_by_ids(&self, caller: &Caller, ids: &[CardId]) -> ServiceResult<Vec<Card>> {
        require_identity(caller)?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let cards = self.store.find_cards(ids).await?;
        Ok(AccessGuard::retain_owned(caller, cards, |card| card.owner_id))
    }

    /// Applies `patch` to one of the caller's cards.
    ///
    /// Replaces the card entry and evicts the owner's principal entries.
    #[tracing::instrument(skip(self, patch))]
    pub async fn update(&self, caller: &Caller, id: CardId, patch: CardPatch) -> ServiceResult<Card> {
        let current = self.owned_card(caller, id).await?;

        if let Some(number) = current.number_change(&patch) {
            if self.store.card_number_exists(number).await? {
                return Err(ServiceError::conflict("number", number));
            }
        }
        let owner = self.store.find_principal(current.owner_id).await?;

        let updated = self.store.update_card(&current.patched(&patch)).await?;

        self.cache.put(&CacheKey::card(id), &updated).await;
        self.cache
            .evict_many(&owner_keys(updated.owner_id, owner.as_ref()))
            .await;

        tracing::info!(card_id = %id, "Card updated");
        Ok(updated)
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, caller: &Caller, id: CardId) -> ServiceResult<()> {
        let current = self.owned_card(caller, id).await?;
        let owner = self.store.find_principal(current.owner_id).await?;

        let deleted = self.store.delete_card(id).await?;

        let mut stale = owner_keys(deleted.owner_id, owner.as_ref());
        stale.push(CacheKey::card(id));
        self.cache.evict_many(&stale).await;

        tracing::info!(card_id = %id, "Card deleted");
        Ok(())
    }

    /// Reads the card from the store and checks the caller owns it.
    async fn owned_card(&self, caller: &Caller, id: CardId) -> ServiceResult<Card> {
        require_identity(caller)?;

        let card = self
            .store
            .find_card(id)
            .await?
            .ok_or_else(ServiceError::card_not_found)?;
        ServiceError::check(AccessGuard::authorize(caller, card.owner_id))?;
        Ok(card)
    }
}

/// Principal keys to evict after a card write. The email key is only known
/// when the owner row was read.
fn owner_keys(owner_id: PrincipalId, owner: Option<&Principal>) -> Vec<CacheKey> {
    match owner {
        Some(owner) => principal_keys(owner).to_vec(),
        None => vec![CacheKey::principal_id(owner_id)],
    }
}
