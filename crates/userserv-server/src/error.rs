//! Errors surfaced by the principal and card services.

use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use userserv_auth::{AccessDecision, DenyReason};
use userserv_storage::{ErrorCategory, StorageError};

/// Errors returned by service operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{entity} not found")]
    NotFound { entity: &'static str },

    #[error("Field '{field}' with value '{value}' already exists")]
    Conflict { field: String, value: String },

    #[error("Authentication required")]
    Unauthorized,

    #[error("Access denied")]
    Forbidden,

    #[error("{message}")]
    Validation { message: String },

    #[error("Backend unavailable: {message}")]
    BackendUnavailable { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl ServiceError {
    pub fn user_not_found() -> Self {
        Self::NotFound { entity: "User" }
    }

    pub fn card_not_found() -> Self {
        Self::NotFound { entity: "Card" }
    }

    pub fn conflict(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Conflict {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Turns a denied access decision into the matching error.
    pub fn check(decision: AccessDecision) -> Result<(), Self> {
        match decision {
            AccessDecision::Allow => Ok(()),
            AccessDecision::Deny(DenyReason::Unauthenticated) => Err(Self::Unauthorized),
            AccessDecision::Deny(DenyReason::NotOwner) => Err(Self::Forbidden),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::BackendUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        let category = err.category();
        match category {
            ErrorCategory::NotFound | ErrorCategory::Conflict => {}
            ErrorCategory::Integrity => {
                tracing::warn!(category = %category, error = %err, "Store rejected write")
            }
            ErrorCategory::Infrastructure | ErrorCategory::Internal => {
                tracing::error!(category = %category, error = %err, "Store operation failed")
            }
        }

        match err {
            StorageError::NotFound { entity, .. } if entity == "Card" => Self::card_not_found(),
            StorageError::NotFound { .. } => Self::user_not_found(),
            StorageError::Conflict { field, value } => Self::Conflict { field, value },
            // The owning principal vanished between the existence check and the insert
            StorageError::ForeignKeyViolation { .. } => Self::user_not_found(),
            StorageError::ConnectionError { message } => Self::BackendUnavailable { message },
            other => Self::internal(other.to_string()),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match &self {
            Self::BackendUnavailable { .. } | Self::Internal { .. } => {
                tracing::error!(error = %self, "Service operation failed");
            }
            _ => tracing::debug!(error = %self, status = status.as_u16(), "Request rejected"),
        }

        // Do not leak backend details to clients
        let message = match &self {
            Self::BackendUnavailable { .. } => "Service temporarily unavailable".to_string(),
            Self::Internal { .. } => "Internal server error".to_string(),
            other => other.to_string(),
        };
        let timestamp = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_default();

        let body = json!({
            "status": status.as_u16(),
            "error": status.canonical_reason().unwrap_or("Error"),
            "message": message,
            "timestamp": timestamp,
        });

        let mut response = (status, Json(body)).into_response();
        if matches!(self, Self::Unauthorized) {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

/// Type alias for service results.
pub type ServiceResult<T> = Result<T, ServiceError>;
