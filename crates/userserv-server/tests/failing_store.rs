//! When the authoritative write fails, the cache must not be touched.

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use common::Harness;
use userserv_core::{Card, CardId, CardPatch, NewCard, Principal, PrincipalId, PrincipalPatch};
use userserv_db_memory::InMemoryStore;
use userserv_server::{CacheBackend, CacheKey, ServiceError};
use userserv_storage::{DeletedPrincipal, RecordStore, StorageError};

/// Delegates to an in-memory store; writes fail while `fail_writes` is set.
#[derive(Default)]
struct FlakyStore {
    inner: InMemoryStore,
    fail_writes: AtomicBool,
}

impl FlakyStore {
    fn check(&self) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::connection_error("injected write failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for FlakyStore {
    async fn insert_principal(&self, principal: &Principal) -> Result<Principal, StorageError> {
        self.check()?;
        self.inner.insert_principal(principal).await
    }

    async fn update_principal(&self, principal: &Principal) -> Result<Principal, StorageError> {
        self.check()?;
        self.inner.update_principal(principal).await
    }

    async fn delete_principal(&self, id: PrincipalId) -> Result<DeletedPrincipal, StorageError> {
        self.check()?;
        self.inner.delete_principal(id).await
    }

    async fn find_principal(&self, id: PrincipalId) -> Result<Option<Principal>, StorageError> {
        self.inner.find_principal(id).await
    }

    async fn find_principal_by_email(
        &self,
        email: &str,
    ) -> Result<Option<Principal>, StorageError> {
        self.inner.find_principal_by_email(email).await
    }

    async fn find_principals(&self, ids: &[PrincipalId]) -> Result<Vec<Principal>, StorageError> {
        self.inner.find_principals(ids).await
    }

    async fn principal_email_exists(&self, email: &str) -> Result<bool, StorageError> {
        self.inner.principal_email_exists(email).await
    }

    async fn insert_card(&self, card: &NewCard) -> Result<Card, StorageError> {
        self.check()?;
        self.inner.insert_card(card).await
    }

    async fn update_card(&self, card: &Card) -> Result<Card, StorageError> {
        self.check()?;
        self.inner.update_card(card).await
    }

    async fn delete_card(&self, id: CardId) -> Result<Card, StorageError> {
        self.check()?;
        self.inner.delete_card(id).await
    }

    async fn find_card(&self, id: CardId) -> Result<Option<Card>, StorageError> {
        self.inner.find_card(id).await
    }

    async fn find_cards(&self, ids: &[CardId]) -> Result<Vec<Card>, StorageError> {
        self.inner.find_cards(ids).await
    }

    async fn find_cards_by_owner(&self, owner: PrincipalId) -> Result<Vec<Card>, StorageError> {
        self.inner.find_cards_by_owner(owner).await
    }

    async fn card_number_exists(&self, number: &str) -> Result<bool, StorageError> {
        self.inner.card_number_exists(number).await
    }

    async fn ping(&self) -> Result<(), StorageError> {
        self.check()
    }

    fn backend_name(&self) -> &'static str {
        "flaky"
    }
}

#[tokio::test]
async fn test_failed_writes_leave_cache_untouched() {
    let store = Arc::new(FlakyStore::default());
    let h = Harness::with(store.clone(), CacheBackend::new_local());
    let (caller, user) = h.signup("a@x.com").await;
    let card = h.add_card(&caller, "1111").await;

    let by_id = h.principals.find_by_id(&caller, user.id).await.unwrap();
    let by_email = h.principals.find_by_email(&caller, "a@x.com").await.unwrap();
    let cached_card = h.cards.find_by_id(&caller, card.id).await.unwrap();
    let entries = h.cache.backend().stats().l1_entries;
    assert_eq!(entries, 3);

    store.fail_writes.store(true, Ordering::SeqCst);

    let patch = PrincipalPatch {
        email: Some("b@x.com".to_string()),
        ..Default::default()
    };
    let err = h.principals.update(&caller, user.id, patch).await.unwrap_err();
    assert!(matches!(err, ServiceError::BackendUnavailable { .. }));

    let patch = CardPatch {
        number: Some("2222".to_string()),
        ..Default::default()
    };
    let err = h.cards.update(&caller, card.id, patch).await.unwrap_err();
    assert!(matches!(err, ServiceError::BackendUnavailable { .. }));

    assert!(h.cards.delete(&caller, card.id).await.is_err());
    assert!(h.principals.delete(&caller, user.id).await.is_err());
    assert!(
        h.cards
            .create(&caller, common::new_card(user.id, "3333"))
            .await
            .is_err()
    );

    // Every entry is exactly what it was before the failed writes
    assert_eq!(h.cache.backend().stats().l1_entries, entries);
    assert_eq!(h.cached_view(&CacheKey::principal_id(user.id)).await, Some(by_id));
    assert_eq!(
        h.cached_view(&CacheKey::principal_email("a@x.com")).await,
        Some(by_email)
    );
    assert_eq!(h.cached_card(&CacheKey::card(card.id)).await, Some(cached_card));
}
