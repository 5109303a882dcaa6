//! The verified caller identity and its axum extractor.
//!
//! ```ignore
//! #[derive(Clone)]
//! struct AppState {
//!     auth: AuthState,
//!     // ... other state
//! }
//!
//! impl FromRef<AppState> for AuthState {
//!     fn from_ref(state: &AppState) -> Self {
//!         state.auth.clone()
//!     }
//! }
//!
//! async fn handler(caller: Caller) -> impl IntoResponse { /* ... */ }
//! ```

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{FromRef, FromRequestParts};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use userserv_core::PrincipalId;

use crate::error::JwtError;
use crate::verifier::TokenVerifier;

/// Who is making a call.
///
/// Passed explicitly into every service operation; there is no ambient
/// per-request identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Caller {
    Authenticated(PrincipalId),
    /// No bearer token, or one that failed verification.
    Anonymous,
}

impl Caller {
    pub fn principal_id(&self) -> Option<PrincipalId> {
        match self {
            Self::Authenticated(id) => Some(*id),
            Self::Anonymous => None,
        }
    }

    /// Collapses a verification result. Every failure becomes `Anonymous`.
    pub fn from_verification(result: Result<PrincipalId, JwtError>) -> Self {
        match result {
            Ok(id) => Self::Authenticated(id),
            Err(e) => {
                tracing::debug!(error = %e, "Bearer token rejected");
                Self::Anonymous
            }
        }
    }

    /// Resolves the caller from an `Authorization` header value.
    pub fn from_authorization(header: Option<&str>, verifier: &TokenVerifier) -> Self {
        match header
            .and_then(|h| h.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
        {
            Some(token) => Self::from_verification(verifier.verify(token)),
            None => Self::Anonymous,
        }
    }
}

/// State required by the [`Caller`] extractor.
#[derive(Clone, Debug)]
pub struct AuthState {
    pub verifier: Arc<TokenVerifier>,
}

impl AuthState {
    pub fn new(verifier: Arc<TokenVerifier>) -> Self {
        Self { verifier }
    }
}

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
    AuthState: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_state = AuthState::from_ref(state);
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok());

        Ok(Self::from_authorization(header, &auth_state.verifier))
    }
}
