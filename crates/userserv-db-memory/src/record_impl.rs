//! RecordStore trait implementation for InMemoryStore.

use async_trait::async_trait;
use tracing::debug;
use userserv_core::{Card, CardId, NewCard, Principal, PrincipalId};
use userserv_storage::{DeletedPrincipal, RecordStore, StorageError};

use crate::storage::InMemoryStore;

#[async_trait]
impl RecordStore for InMemoryStore {
    async fn insert_principal(&self, principal: &Principal) -> Result<Principal, StorageError> {
        let mut tables = self.tables.write().await;

        if tables.principals.contains_key(&principal.id) {
            return Err(StorageError::conflict("id", principal.id.to_string()));
        }
        if tables.email_taken(&principal.email, None) {
            return Err(StorageError::conflict("email", &principal.email));
        }

        tables.principals.insert(principal.id, principal.clone());
        debug!(principal_id = %principal.id, "Inserted principal");
        Ok(principal.clone())
    }

    async fn update_principal(&self, principal: &Principal) -> Result<Principal, StorageError> {
        let mut tables = self.tables.write().await;

        if !tables.principals.contains_key(&principal.id) {
            return Err(StorageError::not_found("Principal", principal.id.to_string()));
        }
        if tables.email_taken(&principal.email, Some(principal.id)) {
            return Err(StorageError::conflict("email", &principal.email));
        }

        tables.principals.insert(principal.id, principal.clone());
        Ok(principal.clone())
    }

    async fn delete_principal(&self, id: PrincipalId) -> Result<DeletedPrincipal, StorageError> {
        let mut tables = self.tables.write().await;

        let principal = tables
            .principals
            .remove(&id)
            .ok_or_else(|| StorageError::not_found("Principal", id.to_string()))?;

        let cards: Vec<CardId> = tables.cards_of(id).iter().map(|c| c.id).collect();
        for card in &cards {
            tables.cards.remove(card);
        }

        debug!(principal_id = %id, cards = cards.len(), "Deleted principal with cards");
        Ok(DeletedPrincipal { principal, cards })
    }

    async fn find_principal(&self, id: PrincipalId) -> Result<Option<Principal>, StorageError> {
        Ok(self.tables.read().await.principals.get(&id).cloned())
    }

    async fn find_principal_by_email(
        &self,
        email: &str,
    ) -> Result<Option<Principal>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables
            .principals
            .values()
            .find(|p| p.email == email)
            .cloned())
    }

    async fn find_principals(&self, ids: &[PrincipalId]) -> Result<Vec<Principal>, StorageError> {
        let tables = self.tables.read().await;
        let mut found: Vec<Principal> = ids
            .iter()
            .filter_map(|id| tables.principals.get(id).cloned())
            .collect();
        found.sort_by_key(|p| p.id);
        found.dedup_by_key(|p| p.id);
        Ok(found)
    }

    async fn principal_email_exists(&self, email: &str) -> Result<bool, StorageError> {
        Ok(self.tables.read().await.email_taken(email, None))
    }

    async fn insert_card(&self, card: &NewCard) -> Result<Card, StorageError> {
        let mut tables = self.tables.write().await;

        if tables.number_taken(&card.number, None) {
            return Err(StorageError::conflict("number", &card.number));
        }
        if !tables.principals.contains_key(&card.owner_id) {
            return Err(StorageError::foreign_key_violation(format!(
                "card owner {} does not exist",
                card.owner_id
            )));
        }

        let stored = Card {
            id: self.next_card_id(),
            number: card.number.clone(),
            holder: card.holder.clone(),
            expiration_date: card.expiration_date,
            owner_id: card.owner_id,
        };
        tables.cards.insert(stored.id, stored.clone());
        debug!(card_id = %stored.id, owner_id = %stored.owner_id, "Inserted card");
        Ok(stored)
    }

    async fn update_card(&self, card: &Card) -> Result<Card, StorageError> {
        let mut tables = self.tables.write().await;

        let owner_id = tables
            .cards
            .get(&card.id)
            .map(|existing| existing.owner_id)
            .ok_or_else(|| StorageError::not_found("Card", card.id.to_string()))?;
        if tables.number_taken(&card.number, Some(card.id)) {
            return Err(StorageError::conflict("number", &card.number));
        }

        let stored = Card {
            owner_id,
            ..card.clone()
        };
        tables.cards.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn delete_card(&self, id: CardId) -> Result<Card, StorageError> {
        self.tables
            .write()
            .await
            .cards
            .remove(&id)
            .ok_or_else(|| StorageError::not_found("Card", id.to_string()))
    }

    async fn find_card(&self, id: CardId) -> Result<Option<Card>, StorageError> {
        Ok(self.tables.read().await.cards.get(&id).cloned())
    }

    async fn find_cards(&self, ids: &[CardId]) -> Result<Vec<Card>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables
            .cards
            .values()
            .filter(|c| ids.contains(&c.id))
            .cloned()
            .collect())
    }

    async fn find_cards_by_owner(&self, owner: PrincipalId) -> Result<Vec<Card>, StorageError> {
        Ok(self.tables.read().await.cards_of(owner))
    }

    async fn card_number_exists(&self, number: &str) -> Result<bool, StorageError> {
        Ok(self.tables.read().await.number_taken(number, None))
    }

    async fn ping(&self) -> Result<(), StorageError> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
