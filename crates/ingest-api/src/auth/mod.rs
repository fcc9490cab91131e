//! Credential validation.
//!
//! Handlers never inspect tokens themselves. They receive an [`AdminUser`]
//! extractor, which runs the configured [`TokenValidator`] and then checks
//! the admin flag.

mod jwt;
mod remote;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use ingest_models::AccessClaims;
use thiserror::Error;
use tracing::debug;

use crate::error::ApiError;
use crate::state::AppState;

pub use jwt::JwtTokenValidator;
pub use remote::RemoteTokenValidator;

/// Validation failures.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No usable credential was presented.
    #[error("{0}")]
    Unauthenticated(String),

    /// The credential was rejected; status and message are relayed as-is.
    #[error("{message}")]
    InvalidToken { status: StatusCode, message: String },

    /// The validation backend could not be consulted.
    #[error("validator unavailable: {0}")]
    Unavailable(String),
}

impl AuthError {
    pub fn missing_credentials() -> Self {
        Self::Unauthenticated("missing credentials".to_string())
    }
}

/// The credential, or `missing credentials` when absent or blank.
fn require_credential(authorization: Option<&str>) -> Result<&str, AuthError> {
    authorization
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(AuthError::missing_credentials)
}

/// Turns a raw `Authorization` header value into access claims.
#[async_trait]
pub trait TokenValidator: Send + Sync {
    async fn validate(&self, authorization: Option<&str>) -> Result<AccessClaims, AuthError>;
}

/// Caller whose credential validated and carries the admin flag.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AccessClaims);

#[axum::async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let authorization = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.trim().is_empty());

        let claims = state.validator.validate(authorization).await?;

        if !claims.is_admin {
            debug!(username = %claims.username, "Rejected non-admin caller");
            return Err(ApiError::Forbidden);
        }

        Ok(AdminUser(claims))
    }
}
