//! PostgreSQL implementation of the RecordStore trait.

use async_trait::async_trait;
use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use sqlx_postgres::PgPool;
use time::Date;
use tracing::debug;
use userserv_core::{Card, CardId, NewCard, Principal, PrincipalId};
use userserv_storage::{DeletedPrincipal, RecordStore, StorageError};
use uuid::Uuid;

use crate::config::PostgresConfig;
use crate::error::map_query_error;
use crate::migrations;
use crate::pool;

type PrincipalRow = (Uuid, String, String, Date, String);
type CardRow = (i64, String, String, Date, Uuid);

fn principal_from_row(row: PrincipalRow) -> Principal {
    Principal {
        id: PrincipalId::new(row.0),
        name: row.1,
        surname: row.2,
        birth_date: row.3,
        email: row.4,
    }
}

fn card_from_row(row: CardRow) -> Card {
    Card {
        id: CardId::new(row.0),
        number: row.1,
        holder: row.2,
        expiration_date: row.3,
        owner_id: PrincipalId::new(row.4),
    }
}

const PRINCIPAL_COLUMNS: &str = "id, name, surname, birth_date, email";
const CARD_COLUMNS: &str = "id, number, holder, expiration_date, owner_id";

/// PostgreSQL record store.
///
/// Email and card number uniqueness and the card owner reference are enforced
/// by table constraints, so concurrent writers cannot slip past each other.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Connects and, if configured, applies pending migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection pool cannot be created
    /// or if migrations fail.
    pub async fn new(config: PostgresConfig) -> Result<Self, StorageError> {
        let pool = pool::create_pool(&config).await?;

        if config.run_migrations {
            migrations::run(&pool).await?;
        }

        Ok(Self { pool })
    }
}

#[async_trait]
impl RecordStore for PostgresStore {
    async fn insert_principal(&self, principal: &Principal) -> Result<Principal, StorageError> {
        let sql = format!(
            "INSERT INTO principals ({PRINCIPAL_COLUMNS}) VALUES ($1, $2, $3, $4, $5) \
             RETURNING {PRINCIPAL_COLUMNS}"
        );
        let conflict_value = principal.id.to_string();
        let row: PrincipalRow = query_as(&sql)
            .bind(principal.id.as_uuid())
            .bind(&principal.name)
            .bind(&principal.surname)
            .bind(principal.birth_date)
            .bind(&principal.email)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                let err = map_query_error(e, &conflict_value);
                match err {
                    StorageError::Conflict { field, .. } if field == "email" => {
                        StorageError::conflict("email", &principal.email)
                    }
                    other => other,
                }
            })?;

        debug!(principal_id = %principal.id, "Inserted principal");
        Ok(principal_from_row(row))
    }

    async fn update_principal(&self, principal: &Principal) -> Result<Principal, StorageError> {
        let sql = format!(
            "UPDATE principals SET name = $2, surname = $3, birth_date = $4, email = $5 \
             WHERE id = $1 RETURNING {PRINCIPAL_COLUMNS}"
        );
        let row: Option<PrincipalRow> = query_as(&sql)
            .bind(principal.id.as_uuid())
            .bind(&principal.name)
            .bind(&principal.surname)
            .bind(principal.birth_date)
            .bind(&principal.email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_query_error(e, &principal.email))?;

        row.map(principal_from_row)
            .ok_or_else(|| StorageError::not_found("Principal", principal.id.to_string()))
    }

    async fn delete_principal(&self, id: PrincipalId) -> Result<DeletedPrincipal, StorageError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_query_error(e, ""))?;

        // Locking the principal row blocks card inserts that reference it
        // until this transaction ends.
        let sql = format!("SELECT {PRINCIPAL_COLUMNS} FROM principals WHERE id = $1 FOR UPDATE");
        let row: Option<PrincipalRow> = query_as(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_query_error(e, ""))?;
        let principal = row
            .map(principal_from_row)
            .ok_or_else(|| StorageError::not_found("Principal", id.to_string()))?;

        let card_rows: Vec<(i64,)> =
            query_as("DELETE FROM cards WHERE owner_id = $1 RETURNING id")
                .bind(id.as_uuid())
                .fetch_all(&mut *tx)
                .await
                .map_err(|e| map_query_error(e, ""))?;

        query("DELETE FROM principals WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_query_error(e, ""))?;

        tx.commit().await.map_err(|e| map_query_error(e, ""))?;

        let mut cards: Vec<CardId> = card_rows.into_iter().map(|(id,)| CardId::new(id)).collect();
        cards.sort();
        debug!(principal_id = %id, cards = cards.len(), "Deleted principal with cards");
        Ok(DeletedPrincipal { principal, cards })
    }

    async fn find_principal(&self, id: PrincipalId) -> Result<Option<Principal>, StorageError> {
        let sql = format!("SELECT {PRINCIPAL_COLUMNS} FROM principals WHERE id = $1");
        let row: Option<PrincipalRow> = query_as(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_query_error(e, ""))?;
        Ok(row.map(principal_from_row))
    }

    async fn find_principal_by_email(
        &self,
        email: &str,
    ) -> Result<Option<Principal>, StorageError> {
        let sql = format!("SELECT {PRINCIPAL_COLUMNS} FROM principals WHERE email = $1");
        let row: Option<PrincipalRow> = query_as(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_query_error(e, ""))?;
        Ok(row.map(principal_from_row))
    }

    async fn find_principals(&self, ids: &[PrincipalId]) -> Result<Vec<Principal>, StorageError> {
        let uuids: Vec<Uuid> = ids.iter().map(PrincipalId::as_uuid).collect();
        let sql = format!("SELECT {PRINCIPAL_COLUMNS} FROM principals WHERE id = ANY($1) ORDER BY id");
        let rows: Vec<PrincipalRow> = query_as(&sql)
            .bind(uuids)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_query_error(e, ""))?;
        Ok(rows.into_iter().map(principal_from_row).collect())
    }

    async fn principal_email_exists(&self, email: &str) -> Result<bool, StorageError> {
        let row: (bool,) = query_as("SELECT EXISTS (SELECT 1 FROM principals WHERE email = $1)")
            .bind(email)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_query_error(e, ""))?;
        Ok(row.0)
    }

    async fn insert_card(&self, card: &NewCard) -> Result<Card, StorageError> {
        let sql = format!(
            "INSERT INTO cards (number, holder, expiration_date, owner_id) \
             VALUES ($1, $2, $3, $4) RETURNING {CARD_COLUMNS}"
        );
        let row: CardRow = query_as(&sql)
            .bind(&card.number)
            .bind(&card.holder)
            .bind(card.expiration_date)
            .bind(card.owner_id.as_uuid())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_query_error(e, &card.number))?;

        let stored = card_from_row(row);
        debug!(card_id = %stored.id, owner_id = %stored.owner_id, "Inserted card");
        Ok(stored)
    }

    async fn update_card(&self, card: &Card) -> Result<Card, StorageError> {
        let sql = format!(
            "UPDATE cards SET number = $2, holder = $3, expiration_date = $4 \
             WHERE id = $1 RETURNING {CARD_COLUMNS}"
        );
        let row: Option<CardRow> = query_as(&sql)
            .bind(card.id.get())
            .bind(&card.number)
            .bind(&card.holder)
            .bind(card.expiration_date)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_query_error(e, &card.number))?;

        row.map(card_from_row)
            .ok_or_else(|| StorageError::not_found("Card", card.id.to_string()))
    }

    async fn delete_card(&self, id: CardId) -> Result<Card, StorageError> {
        let sql = format!("DELETE FROM cards WHERE id = $1 RETURNING {CARD_COLUMNS}");
        let row: Option<CardRow> = query_as(&sql)
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_query_error(e, ""))?;

        row.map(card_from_row)
            .ok_or_else(|| StorageError::not_found("Card", id.to_string()))
    }

    async fn find_card(&self, id: CardId) -> Result<Option<Card>, StorageError> {
        let sql = format!("SELECT {CARD_COLUMNS} FROM cards WHERE id = $1");
        let row: Option<CardRow> = query_as(&sql)
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_query_error(e, ""))?;
        Ok(row.map(card_from_row))
    }

    async fn find_cards(&self, ids: &[CardId]) -> Result<Vec<Card>, StorageError> {
        let raw: Vec<i64> = ids.iter().map(CardId::get).collect();
        let sql = format!("SELECT {CARD_COLUMNS} FROM cards WHERE id = ANY($1) ORDER BY id");
        let rows: Vec<CardRow> = query_as(&sql)
            .bind(raw)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_query_error(e, ""))?;
        Ok(rows.into_iter().map(card_from_row).collect())
    }

    async fn find_cards_by_owner(&self, owner: PrincipalId) -> Result<Vec<Card>, StorageError> {
        let sql = format!("SELECT {CARD_COLUMNS} FROM cards WHERE owner_id = $1 ORDER BY id");
        let rows: Vec<CardRow> = query_as(&sql)
            .bind(owner.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_query_error(e, ""))?;
        Ok(rows.into_iter().map(card_from_row).collect())
    }

    async fn card_number_exists(&self, number: &str) -> Result<bool, StorageError> {
        let row: (bool,) = query_as("SELECT EXISTS (SELECT 1 FROM cards WHERE number = $1)")
            .bind(number)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_query_error(e, ""))?;
        Ok(row.0)
    }

    async fn ping(&self) -> Result<(), StorageError> {
        query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| map_query_error(e, ""))?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_map_to_records() {
        let owner = Uuid::new_v4();
        let card = card_from_row((
            7,
            "4242".to_string(),
            "ANN LEE".to_string(),
            time::macros::date!(2031 - 01 - 01),
            owner,
        ));
        assert_eq!(card.id, CardId::new(7));
        assert_eq!(card.owner_id, PrincipalId::new(owner));

        let principal = principal_from_row((
            owner,
            "Ann".to_string(),
            "Lee".to_string(),
            time::macros::date!(1990 - 05 - 17),
            "a@x.com".to_string(),
        ));
        assert_eq!(principal.id.as_uuid(), owner);
        assert_eq!(principal.email, "a@x.com");
    }
}
