//! Uniqueness must hold when writers race on the same email or card number.

use std::sync::Arc;

use futures_util::future::join_all;
use time::macros::date;
use userserv_core::{NewCard, Principal, PrincipalId};
use userserv_db_memory::{InMemoryStore, RecordStore};

fn principal(email: &str) -> Principal {
    Principal {
        id: PrincipalId::generate(),
        name: "Ann".to_string(),
        surname: "Lee".to_string(),
        birth_date: date!(1990 - 05 - 17),
        email: email.to_string(),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_inserts_with_same_email_admit_one() {
    let store = Arc::new(InMemoryStore::new());

    let attempts = (0..16).map(|_| {
        let store = Arc::clone(&store);
        tokio::spawn(async move { store.insert_principal(&principal("same@x.com")).await })
    });
    let results = join_all(attempts).await;

    let ok = results
        .into_iter()
        .map(|joined| joined.unwrap())
        .filter(Result::is_ok)
        .count();
    assert_eq!(ok, 1);
    assert_eq!(store.principal_count().await, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_card_inserts_with_same_number_admit_one() {
    let store = Arc::new(InMemoryStore::new());
    let owner = principal("owner@x.com");
    store.insert_principal(&owner).await.unwrap();

    let attempts = (0..16).map(|_| {
        let store = Arc::clone(&store);
        let card = NewCard {
            number: "4242".to_string(),
            holder: "ANN LEE".to_string(),
            expiration_date: date!(2031 - 01 - 01),
            owner_id: owner.id,
        };
        tokio::spawn(async move { store.insert_card(&card).await })
    });
    let results = join_all(attempts).await;

    let conflicts = results
        .into_iter()
        .map(|joined| joined.unwrap())
        .filter(|r| matches!(r, Err(e) if e.is_conflict()))
        .count();
    assert_eq!(conflicts, 15);
    assert_eq!(store.card_count().await, 1);
}
