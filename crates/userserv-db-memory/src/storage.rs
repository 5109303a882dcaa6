use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI64, Ordering};

use tokio::sync::RwLock;
use userserv_core::{Card, CardId, Principal, PrincipalId};

/// Both tables behind one lock. Holding the write guard makes a check and the
/// write that depends on it a single atomic step.
#[derive(Debug, Default)]
pub(crate) struct Tables {
    pub(crate) principals: HashMap<PrincipalId, Principal>,
    /// Ordered so owner scans come back sorted by card id.
    pub(crate) cards: BTreeMap<CardId, Card>,
}

impl Tables {
    pub(crate) fn email_taken(&self, email: &str, except: Option<PrincipalId>) -> bool {
        self.principals
            .values()
            .any(|p| p.email == email && Some(p.id) != except)
    }

    pub(crate) fn number_taken(&self, number: &str, except: Option<CardId>) -> bool {
        self.cards
            .values()
            .any(|c| c.number == number && Some(c.id) != except)
    }

    pub(crate) fn cards_of(&self, owner: PrincipalId) -> Vec<Card> {
        self.cards
            .values()
            .filter(|c| c.owner_id == owner)
            .cloned()
            .collect()
    }
}

/// In-memory record store.
///
/// Principals and cards live in plain maps guarded by a single
/// `tokio::sync::RwLock`; card ids come from a monotonic counter starting at 1.
#[derive(Debug)]
pub struct InMemoryStore {
    pub(crate) tables: RwLock<Tables>,
    card_sequence: AtomicI64,
}

impl InMemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            card_sequence: AtomicI64::new(1),
        }
    }

    /// Allocates the next card id. Ids are never reused, even after a failed insert.
    pub(crate) fn next_card_id(&self) -> CardId {
        CardId::new(self.card_sequence.fetch_add(1, Ordering::SeqCst))
    }

    /// Number of stored principals.
    pub async fn principal_count(&self) -> usize {
        self.tables.read().await.principals.len()
    }

    /// Number of stored cards.
    pub async fn card_count(&self) -> usize {
        self.tables.read().await.cards.len()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}
