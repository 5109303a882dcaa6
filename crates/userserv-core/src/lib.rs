//! # userserv-core
//!
//! Domain types shared by every userserv crate.
//!
//! - [`Principal`] - an account record keyed by an externally assigned [`PrincipalId`]
//! - [`Card`] - a payment card owned by exactly one principal, keyed by a
//!   store-assigned [`CardId`]
//! - [`PrincipalView`] - a principal together with the cards it owns; this is the
//!   shape returned by principal reads and the value held in the principal cache
//!
//! Create payloads ([`NewPrincipal`], [`NewCard`]) and partial updates
//! ([`PrincipalPatch`], [`CardPatch`]) live next to the records they build.

pub mod error;
pub mod id;
pub mod model;

pub use error::CoreError;
pub use id::{CardId, PrincipalId};
pub use model::{Card, CardPatch, NewCard, NewPrincipal, Principal, PrincipalPatch, PrincipalView};

/// Type alias for core results.
pub type Result<T> = std::result::Result<T, CoreError>;
