//! Principal and card records.
//!
//! Records serialize with camelCase field names (`birthDate`, `expirationDate`,
//! `userId`) so the same types can be returned as response bodies and stored
//! in the cache.

use serde::{Deserialize, Serialize};
use time::Date;

use crate::id::{CardId, PrincipalId};

// ============================================================================
// Principal
// ============================================================================

/// An account record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub id: PrincipalId,
    pub name: String,
    pub surname: String,
    pub birth_date: Date,
    /// Unique across all principals.
    pub email: String,
}

impl Principal {
    /// Builds the record for a principal created under `id`.
    pub fn from_new(id: PrincipalId, new: NewPrincipal) -> Self {
        Self {
            id,
            name: new.name,
            surname: new.surname,
            birth_date: new.birth_date,
            email: new.email,
        }
    }

    /// Returns a copy with every present patch field applied.
    #[must_use]
    pub fn patched(&self, patch: &PrincipalPatch) -> Self {
        Self {
            id: self.id,
            name: patch.name.clone().unwrap_or_else(|| self.name.clone()),
            surname: patch.surname.clone().unwrap_or_else(|| self.surname.clone()),
            birth_date: patch.birth_date.unwrap_or(self.birth_date),
            email: patch.email.clone().unwrap_or_else(|| self.email.clone()),
        }
    }

    /// The new email requested by `patch`, if it differs from the current one.
    pub fn email_change<'a>(&self, patch: &'a PrincipalPatch) -> Option<&'a str> {
        patch
            .email
            .as_deref()
            .filter(|email| *email != self.email)
    }
}

/// Payload for creating a principal. The identifier comes from the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPrincipal {
    pub name: String,
    pub surname: String,
    pub birth_date: Date,
    pub email: String,
}

/// Partial update of a principal. Absent fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrincipalPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<Date>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

// ============================================================================
// Card
// ============================================================================

/// A payment card. The owner never changes after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: CardId,
    /// Unique across all cards.
    pub number: String,
    pub holder: String,
    pub expiration_date: Date,
    #[serde(rename = "userId")]
    pub owner_id: PrincipalId,
}

impl Card {
    /// Returns a copy with every present patch field applied.
    #[must_use]
    pub fn patched(&self, patch: &CardPatch) -> Self {
        Self {
            id: self.id,
            number: patch.number.clone().unwrap_or_else(|| self.number.clone()),
            holder: patch.holder.clone().unwrap_or_else(|| self.holder.clone()),
            expiration_date: patch.expiration_date.unwrap_or(self.expiration_date),
            owner_id: self.owner_id,
        }
    }

    /// The new number requested by `patch`, if it differs from the current one.
    pub fn number_change<'a>(&self, patch: &'a CardPatch) -> Option<&'a str> {
        patch
            .number
            .as_deref()
            .filter(|number| *number != self.number)
    }
}

/// Payload for creating a card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCard {
    pub number: String,
    pub holder: String,
    pub expiration_date: Date,
    #[serde(rename = "userId")]
    pub owner_id: PrincipalId,
}

/// Partial update of a card. There is no owner field: cards cannot be reassigned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub holder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<Date>,
}

// ============================================================================
// Principal view
// ============================================================================

/// A principal with the cards it owns, ordered by card id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrincipalView {
    pub id: PrincipalId,
    pub name: String,
    pub surname: String,
    pub birth_date: Date,
    pub email: String,
    pub cards: Vec<Card>,
}

impl PrincipalView {
    pub fn new(principal: Principal, mut cards: Vec<Card>) -> Self {
        cards.sort_by_key(|card| card.id);
        Self {
            id: principal.id,
            name: principal.name,
            surname: principal.surname,
            birth_date: principal.birth_date,
            email: principal.email,
            cards,
        }
    }

    /// The principal record without its cards.
    pub fn principal(&self) -> Principal {
        Principal {
            id: self.id,
            name: self.name.clone(),
            surname: self.surname.clone(),
            birth_date: self.birth_date,
            email: self.email.clone(),
        }
    }
}
