//! Identity verification and ownership authorization for userserv.
//!
//! - [`TokenVerifier`] checks an RS256 bearer token against the configured public
//!   key and extracts the caller's [`PrincipalId`](userserv_core::PrincipalId).
//! - [`AccessGuard`] decides whether a caller may touch a record owned by a
//!   given principal. Callers may only act on records they own.
//! - [`Caller`] is the verified identity (or its absence) that the HTTP layer
//!   passes explicitly into every service call. It doubles as an axum extractor.
//!
//! # Example
//!
//! ```ignore
//! use userserv_auth::{AccessGuard, Caller, TokenVerifier};
//!
//! let verifier = TokenVerifier::from_key_material(&config.auth.public_key, "userId")?;
//! let caller = Caller::from_verification(verifier.verify(token));
//! if AccessGuard::authorize(&caller, record.owner_id).is_allowed() {
//!     // ...
//! }
//! ```

pub mod caller;
pub mod error;
pub mod guard;
pub mod verifier;

pub use caller::{AuthState, Caller};
pub use error::{JwtError, KeyError};
pub use guard::{AccessDecision, AccessGuard, DenyReason};
pub use verifier::TokenVerifier;
