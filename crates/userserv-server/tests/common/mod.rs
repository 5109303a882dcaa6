//! Shared fixtures for the server integration tests.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use time::macros::date;
use userserv_auth::Caller;
use userserv_core::{Card, NewCard, NewPrincipal, PrincipalId, PrincipalView};
use userserv_db_memory::InMemoryStore;
use userserv_server::{CacheBackend, CacheCoordinator, CacheKey, CardService, PrincipalService};
use userserv_storage::DynRecordStore;

pub const TTL: Duration = Duration::from_secs(3600);

/// Services wired to one store and one cache, with handles to both for
/// inspection.
pub struct Harness {
    pub store: DynRecordStore,
    pub cache: Arc<CacheCoordinator>,
    pub principals: PrincipalService,
    pub cards: CardService,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(Arc::new(InMemoryStore::new()), CacheBackend::new_local())
    }

    pub fn with(store: DynRecordStore, backend: CacheBackend) -> Self {
        let cache = Arc::new(CacheCoordinator::new(backend, TTL));
        Self {
            principals: PrincipalService::new(store.clone(), cache.clone()),
            cards: CardService::new(store.clone(), cache.clone()),
            store,
            cache,
        }
    }

    /// Creates a principal owned by a fresh identity and returns its caller.
    pub async fn signup(&self, email: &str) -> (Caller, PrincipalView) {
        let caller = Caller::Authenticated(PrincipalId::generate());
        let view = self
            .principals
            .create(&caller, new_principal(email))
            .await
            .unwrap();
        (caller, view)
    }

    pub async fn add_card(&self, caller: &Caller, number: &str) -> Card {
        let owner = caller.principal_id().unwrap();
        self.cards
            .create(caller, new_card(owner, number))
            .await
            .unwrap()
    }

    pub async fn cached_view(&self, key: &CacheKey) -> Option<PrincipalView> {
        self.cache.get::<PrincipalView>(key).await
    }

    pub async fn cached_card(&self, key: &CacheKey) -> Option<Card> {
        self.cache.get::<Card>(key).await
    }
}

pub fn new_principal(email: &str) -> NewPrincipal {
    NewPrincipal {
        name: "Ann".to_string(),
        surname: "Lee".to_string(),
        birth_date: date!(1990 - 05 - 17),
        email: email.to_string(),
    }
}

pub fn new_card(owner: PrincipalId, number: &str) -> NewCard {
    NewCard {
        number: number.to_string(),
        holder: "ANN LEE".to_string(),
        expiration_date: date!(2099 - 12 - 31),
        owner_id: owner,
    }
}
