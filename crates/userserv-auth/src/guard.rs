//! Ownership authorization.

use userserv_core::PrincipalId;

use crate::caller::Caller;

/// Why access was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// The call carries no verified identity.
    Unauthenticated,
    /// The caller is verified but does not own the record.
    NotOwner,
}

/// Outcome of an authorization check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Allow,
    Deny(DenyReason),
}

impl AccessDecision {
    #[must_use]
    pub fn is_allowed(self) -> bool {
        matches!(self, Self::Allow)
    }
}

/// Strict self-ownership: a caller may act on a record only if it owns it.
///
/// For cards the owner passed in is the card's owning principal, never the
/// card's own identifier.
pub struct AccessGuard;

impl AccessGuard {
    pub fn authorize(caller: &Caller, owner: PrincipalId) -> AccessDecision {
        match caller.principal_id() {
            None => AccessDecision::Deny(DenyReason::Unauthenticated),
            Some(id) if id == owner => AccessDecision::Allow,
            Some(id) => {
                tracing::debug!(caller = %id, owner = %owner, "Access denied: caller does not own the record");
                AccessDecision::Deny(DenyReason::NotOwner)
            }
        }
    }

    /// Keeps only the items owned by `caller`. An anonymous caller gets nothing.
    pub fn retain_owned<T>(
        caller: &Caller,
        items: Vec<T>,
        owner_of: impl Fn(&T) -> PrincipalId,
    ) -> Vec<T> {
        items
            .into_iter()
            .filter(|item| Self::authorize(caller, owner_of(item)).is_allowed())
            .collect()
    }
}
