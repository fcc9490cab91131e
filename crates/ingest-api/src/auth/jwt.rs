//! Local HS256 token verification.

use async_trait::async_trait;
use axum::http::StatusCode;
use ingest_models::AccessClaims;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use tracing::debug;

use super::{require_credential, AuthError, TokenValidator};

/// Verifies bearer JWTs signed with a shared secret.
#[derive(Clone)]
pub struct JwtTokenValidator {
    key: DecodingKey,
    validation: Validation,
}

impl JwtTokenValidator {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;

        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    fn rejected() -> AuthError {
        AuthError::InvalidToken {
            status: StatusCode::FORBIDDEN,
            message: "not authorized".to_string(),
        }
    }
}

#[async_trait]
impl TokenValidator for JwtTokenValidator {
    async fn validate(&self, authorization: Option<&str>) -> Result<AccessClaims, AuthError> {
        let authorization = require_credential(authorization)?;

        let token = authorization
            .strip_prefix("Bearer ")
            .ok_or_else(Self::rejected)?;

        let data = decode::<AccessClaims>(token, &self.key, &self.validation).map_err(|e| {
            debug!(error = %e, "Token verification failed");
            Self::rejected()
        })?;

        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;

    const SECRET: &str = "test-secret";

    fn token(secret: &str, admin: bool, exp_offset: Duration) -> String {
        let claims = json!({
            "username": "bob@example.com",
            "admin": admin,
            "iat": Utc::now().timestamp(),
            "exp": (Utc::now() + exp_offset).timestamp(),
        });
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_valid_token() {
        let validator = JwtTokenValidator::new(SECRET);
        let header = format!("Bearer {}", token(SECRET, true, Duration::hours(1)));

        let claims = validator.validate(Some(&header)).await.unwrap();
        assert_eq!(claims.username, "bob@example.com");
        assert!(claims.is_admin);
        assert!(claims.extra.contains_key("exp"));
    }

    #[tokio::test]
    async fn test_expired_token() {
        let validator = JwtTokenValidator::new(SECRET);
        let header = format!("Bearer {}", token(SECRET, true, Duration::hours(-1)));

        match validator.validate(Some(&header)).await {
            Err(AuthError::InvalidToken { status, message }) => {
                assert_eq!(status, StatusCode::FORBIDDEN);
                assert_eq!(message, "not authorized");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_wrong_secret() {
        let validator = JwtTokenValidator::new(SECRET);
        let header = format!("Bearer {}", token("other", true, Duration::hours(1)));

        assert!(matches!(
            validator.validate(Some(&header)).await,
            Err(AuthError::InvalidToken { .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_and_malformed_header() {
        let validator = JwtTokenValidator::new(SECRET);

        assert!(matches!(
            validator.validate(None).await,
            Err(AuthError::Unauthenticated(_))
        ));
        assert!(matches!(
            validator.validate(Some("")).await,
            Err(AuthError::Unauthenticated(_))
        ));
        assert!(matches!(
            validator.validate(Some("Basic dXNlcjpwYXNz")).await,
            Err(AuthError::InvalidToken { .. })
        ));
    }
}
