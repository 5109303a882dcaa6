//! Identifier newtypes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;

/// Identifier of a principal.
///
/// Assigned by the identity provider (the `userId` claim of a verified bearer
/// token), never generated by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrincipalId(Uuid);

impl PrincipalId {
    pub fn new(id: Uuid) -> Self {
        Self(id)
    }

    /// Random identifier, used by tests and seed data.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl From<Uuid> for PrincipalId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PrincipalId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| CoreError::invalid_principal_id(s))
    }
}

/// Store-assigned identifier of a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardId(i64);

impl CardId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn get(&self) -> i64 {
        self.0
    }
}

impl From<i64> for CardId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CardId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.parse::<i64>() {
            Ok(id) if id > 0 => Ok(Self(id)),
            _ => Err(CoreError::invalid_card_id(s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_principal_id_round_trips_through_string() {
        let id = PrincipalId::generate();
        let parsed: PrincipalId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_principal_id_rejects_garbage() {
        let err = "not-a-uuid".parse::<PrincipalId>().unwrap_err();
        assert_eq!(err.to_string(), "Invalid principal id: not-a-uuid");
    }

    #[test]
    fn test_card_id_must_be_positive() {
        assert_eq!("42".parse::<CardId>().unwrap(), CardId::new(42));
        assert!("0".parse::<CardId>().is_err());
        assert!("-3".parse::<CardId>().is_err());
        assert!("abc".parse::<CardId>().is_err());
    }

    #[test]
    fn test_ids_serialize_transparently() {
        let card = CardId::new(7);
        assert_eq!(serde_json::to_string(&card).unwrap(), "7");

        let uuid = Uuid::new_v4();
        let principal = PrincipalId::new(uuid);
        assert_eq!(
            serde_json::to_string(&principal).unwrap(),
            format!("\"{uuid}\"")
        );
    }
}
