use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::error;

use crate::response::{ErrorEnvelope, ErrorInfo};

pub type AppResult<T> = Result<T, AppError>;

/// Every failure the service can surface to a caller.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("missing authentication token")]
    MissingCredentials,

    #[error("invalid or expired token")]
    InvalidToken(String),

    #[error("user role not found")]
    MissingRole,

    #[error("access denied: insufficient permissions")]
    Forbidden,

    #[error("invalid {field}: {message}")]
    Validation { field: &'static str, message: String },

    #[error("access denied: {0}")]
    AccessDenied(&'static str),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("email already in use")]
    EmailTaken,

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("database error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::MissingCredentials
            | AppError::InvalidToken(_)
            | AppError::MissingRole
            | AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::Forbidden | AppError::AccessDenied(_) => StatusCode::FORBIDDEN,
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::EmailTaken => StatusCode::CONFLICT,
            AppError::Config(_) | AppError::Storage(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::MissingCredentials => "MISSING_TOKEN",
            AppError::InvalidToken(_) => "INVALID_TOKEN",
            AppError::MissingRole => "ROLE_MISSING",
            AppError::Forbidden => "FORBIDDEN_ROLE",
            AppError::Validation { .. } => "VALIDATION_ERROR",
            AppError::AccessDenied(_) => "ACCESS_DENIED",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::EmailTaken => "EMAIL_EXISTS",
            AppError::InvalidCredentials => "AUTH_FAILED",
            AppError::Storage(_) => "DB_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Client-visible detail. Server-side failures only expose a generic message.
    fn public_message(&self) -> String {
        match self {
            AppError::Config(_) | AppError::Internal(_) => "Internal server error".into(),
            AppError::Storage(_) => "Database error".into(),
            other => other.to_string(),
        }
    }

    fn details(&self) -> Option<String> {
        match self {
            AppError::InvalidToken(reason) => Some(reason.clone()),
            AppError::Validation { field, .. } => Some((*field).to_string()),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = ?self, code = self.code(), "request failed");
        }

        let body = ErrorEnvelope {
            success: false,
            message: self.public_message(),
            error: ErrorInfo {
                code: self.code(),
                details: self.details(),
            },
        };
        (status, Json(body)).into_response()
    }
}
