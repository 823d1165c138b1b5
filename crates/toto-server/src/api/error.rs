//! HTTP error type. Every handler returns `Result<_, ApiError>`.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use toto_core::locale;
use tracing::{error, warn};

use crate::storage::DatabaseError;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Rejected input. The message is localized and shown to the user.
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthenticated(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{}", locale::NOT_ADMIN)]
    NotAdmin,

    #[error("{}", locale::PREMIUM_REQUIRED)]
    PremiumRequired,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// Destructive action sent without `confirm=true`.
    #[error("{}", locale::CONFIRM_REQUIRED)]
    ConfirmationRequired,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) | Self::NotAdmin | Self::PremiumRequired => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::ConfirmationRequired => StatusCode::PRECONDITION_REQUIRED,
            Self::Storage(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Unauthenticated(_) => "unauthenticated",
            Self::Forbidden(_) => "forbidden",
            Self::NotAdmin => "not_admin",
            Self::PremiumRequired => "premium_required",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::ConfirmationRequired => "confirmation_required",
            Self::Storage(_) => "storage",
            Self::Internal(_) => "internal",
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn internal(e: impl std::fmt::Display) -> Self {
        Self::Internal(e.to_string())
    }
}

impl From<DatabaseError> for ApiError {
    fn from(e: DatabaseError) -> Self {
        match e {
            DatabaseError::NotFound(what) => Self::NotFound(what),
            DatabaseError::Conflict(what) => Self::Conflict(what),
            other => Self::Storage(other.to_string()),
        }
    }
}

impl From<toto_core::Error> for ApiError {
    fn from(e: toto_core::Error) -> Self {
        match e {
            toto_core::Error::Validation(message) => Self::Validation(message),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            Self::Storage(_) | Self::Internal(_) => error!(error = %self, "Request failed"),
            Self::Conflict(_) => warn!(error = %self, "Request conflicted"),
            _ => {}
        }

        let body = Json(json!({
            "error": self.kind(),
            "message": self.to_string(),
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn statuses() {
        assert_eq!(ApiError::validation("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::NotAdmin.status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::PremiumRequired.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            ApiError::ConfirmationRequired.status(),
            StatusCode::PRECONDITION_REQUIRED
        );
    }

    #[test]
    fn database_errors_map_by_kind() {
        let e: ApiError = DatabaseError::NotFound("User u".into()).into();
        assert_eq!(e.status(), StatusCode::NOT_FOUND);
        let e: ApiError = DatabaseError::Conflict("matches.watching".into()).into();
        assert_eq!(e.status(), StatusCode::CONFLICT);
        let e: ApiError = DatabaseError::Query("disk I/O error".into()).into();
        assert_eq!(e.kind(), "storage");
        assert!(e.to_string().contains("disk I/O error"));
    }

    #[test]
    fn core_validation_keeps_message() {
        let e: ApiError = toto_core::Error::validation(locale::INVALID_URL).into();
        assert_eq!(e.to_string(), locale::INVALID_URL);
        assert_eq!(e.kind(), "validation");
    }

    #[test]
    fn not_admin_message_is_localized() {
        assert_eq!(ApiError::NotAdmin.to_string(), locale::NOT_ADMIN);
    }
}
