use thiserror::Error;

/// Errors raised while building core domain values.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid principal id: {0}")]
    InvalidPrincipalId(String),

    #[error("Invalid card id: {0}")]
    InvalidCardId(String),
}

impl CoreError {
    /// Create a new InvalidPrincipalId error
    pub fn invalid_principal_id(id: impl Into<String>) -> Self {
        Self::InvalidPrincipalId(id.into())
    }

    /// Create a new InvalidCardId error
    pub fn invalid_card_id(id: impl Into<String>) -> Self {
        Self::InvalidCardId(id.into())
    }
}
