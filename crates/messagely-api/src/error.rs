use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use messagely_db::DbError;
use messagely_types::api::{ErrorBody, ErrorResponse};

/// Every handler error. Rendered as `{"error": {"message", "status"}}`.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Missing or malformed input
    #[error("{0}")]
    Validation(String),

    /// No or invalid credentials
    #[error("{0}")]
    Unauthorized(String),

    /// Authenticated, but not allowed to touch this resource
    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    MethodNotAllowed(String),

    /// The request ran past the configured timeout
    #[error("{0}")]
    Timeout(String),

    /// Store failure or other unexpected error, with full context chain
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Timeout(_) => StatusCode::REQUEST_TIMEOUT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show the client. Internal details stay in the logs.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Validation(message) => ApiError::Validation(message),
            DbError::NotFound { entity, key } => ApiError::NotFound(format!("{entity} '{key}' not found")),
            DbError::Conflict(message) => ApiError::Conflict(message),
            DbError::Other(e) => ApiError::Internal(e),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Internal(_) => tracing::error!("Internal service error: {:#}", self),
            ApiError::Unauthorized(_) | ApiError::Forbidden(_) => {
                tracing::info!("Authorization error: {}", self)
            }
            ApiError::Conflict(_) => tracing::warn!("Conflict error: {}", self),
            ApiError::Timeout(_) => tracing::warn!("Request timed out"),
            ApiError::Validation(_) | ApiError::NotFound(_) | ApiError::MethodNotAllowed(_) => {
                tracing::debug!("Client error: {}", self)
            }
        }

        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                message: self.user_message(),
                status: status.as_u16(),
            },
        };

        (status, Json(body)).into_response()
    }
}
