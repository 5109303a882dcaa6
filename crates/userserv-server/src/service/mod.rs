//! Principal and card operations.
//!
//! Every operation takes the verified [`Caller`] as an explicit argument and
//! runs the same pipeline:
//!
//! 1. ownership check through [`AccessGuard`](userserv_auth::AccessGuard)
//! 2. reads: cache first, store on a miss, then populate the cache
//! 3. writes: store first; the cache is touched only after the store write
//!    succeeded
//!
//! A card embeds nothing, but a principal view embeds its cards, so every card
//! mutation evicts the owner's principal entries as well.

mod card;
mod principal;

pub use card::CardService;
pub use principal::PrincipalService;

use userserv_auth::Caller;
use userserv_core::{Principal, PrincipalId};

use crate::cache::CacheKey;
use crate::error::{ServiceError, ServiceResult};

/// The caller's identifier, or `Unauthorized`.
fn require_identity(caller: &Caller) -> ServiceResult<PrincipalId> {
    caller.principal_id().ok_or(ServiceError::Unauthorized)
}

/// Both cache keys a principal view may live under.
fn principal_keys(principal: &Principal) -> [CacheKey; 2] {
    [
        CacheKey::principal_id(principal.id),
        CacheKey::principal_email(&principal.email),
    ]
}
