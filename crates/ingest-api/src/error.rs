//! API error types.
//!
//! Every failure becomes a plain-text response. Client-facing errors carry
//! their short message; server-side errors always read
//! `internal server error` and are logged instead.

use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use ingest_queue::QueueError;
use ingest_storage::StorageError;
use thiserror::Error;
use tracing::error;

use crate::auth::AuthError;

pub type ApiResult<T> = Result<T, ApiError>;

/// Body of every 5xx response.
pub const INTERNAL_ERROR_MESSAGE: &str = "internal server error";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Unauthenticated(String),

    #[error("{message}")]
    InvalidToken { status: StatusCode, message: String },

    #[error("not authorized")]
    Forbidden,

    #[error("{0}")]
    BadRequest(String),

    #[error("Multipart error: {0}")]
    Multipart(#[from] MultipartError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Publish error: {0}")]
    Publish(#[from] QueueError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated(_) | ApiError::Forbidden => StatusCode::UNAUTHORIZED,
            ApiError::InvalidToken { status, .. } => *status,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Multipart(e) => e.status(),
            ApiError::Storage(_) | ApiError::Publish(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Unauthenticated(msg) => ApiError::Unauthenticated(msg),
            AuthError::InvalidToken { status, message } => ApiError::InvalidToken { status, message },
            AuthError::Unavailable(msg) => ApiError::Internal(format!("token validation: {}", msg)),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = match &self {
            ApiError::Multipart(e) => e.body_text(),
            _ if status.is_server_error() => {
                error!(status = %status, error = %self, "Request failed");
                INTERNAL_ERROR_MESSAGE.to_string()
            }
            _ => self.to_string(),
        };

        (status, body).into_response()
    }
}
