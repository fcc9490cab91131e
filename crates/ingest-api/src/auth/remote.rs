//! Validation against the external auth service.

use std::time::Duration;

use async_trait::async_trait;
use axum::http::{header, StatusCode};
use ingest_models::AccessClaims;
use reqwest::Client;
use tracing::{debug, warn};

use super::{require_credential, AuthError, TokenValidator};

/// Request timeout for the auth service.
const VALIDATE_TIMEOUT: Duration = Duration::from_secs(10);

/// Forwards the caller's `Authorization` header to `POST {base}/validate`.
#[derive(Debug, Clone)]
pub struct RemoteTokenValidator {
    http: Client,
    validate_url: String,
}

impl RemoteTokenValidator {
    pub fn new(base_url: &str) -> Result<Self, AuthError> {
        let http = Client::builder()
            .timeout(VALIDATE_TIMEOUT)
            .build()
            .map_err(|e| AuthError::Unavailable(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            validate_url: format!("{}/validate", base_url.trim_end_matches('/')),
        })
    }
}

#[async_trait]
impl TokenValidator for RemoteTokenValidator {
    async fn validate(&self, authorization: Option<&str>) -> Result<AccessClaims, AuthError> {
        let authorization = require_credential(authorization)?;

        let response = self
            .http
            .post(&self.validate_url)
            .header(header::AUTHORIZATION.as_str(), authorization)
            .send()
            .await
            .map_err(|e| {
                warn!(url = %self.validate_url, error = %e, "Auth service unreachable");
                AuthError::Unavailable(e.to_string())
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AuthError::Unavailable(format!("failed to read auth response: {}", e)))?;

        if !status.is_success() {
            debug!(status = %status, "Auth service rejected credential");
            let status = StatusCode::from_u16(status.as_u16())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            return Err(AuthError::InvalidToken {
                status,
                message: body,
            });
        }

        serde_json::from_str(&body)
            .map_err(|e| AuthError::Unavailable(format!("undecodable claims: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header as header_eq, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_forwards_header_and_decodes_claims() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/validate"))
            .and(header_eq("authorization", "Bearer good"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "username": "alice@example.com",
                "admin": true,
                "exp": 1_700_000_000
            })))
            .expect(1)
            .mount(&server)
            .await;

        let validator = RemoteTokenValidator::new(&server.uri()).unwrap();
        let claims = validator.validate(Some("Bearer good")).await.unwrap();

        assert_eq!(claims.username, "alice@example.com");
        assert!(claims.is_admin);
    }

    #[tokio::test]
    async fn test_relays_rejection_verbatim() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/validate"))
            .respond_with(ResponseTemplate::new(403).set_body_string("not authorized"))
            .mount(&server)
            .await;

        let validator = RemoteTokenValidator::new(&server.uri()).unwrap();
        match validator.validate(Some("Bearer bad")).await {
            Err(AuthError::InvalidToken { status, message }) => {
                assert_eq!(status, StatusCode::FORBIDDEN);
                assert_eq!(message, "not authorized");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_header_skips_network() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let validator = RemoteTokenValidator::new(&server.uri()).unwrap();
        for authorization in [None, Some(""), Some("  ")] {
            match validator.validate(authorization).await {
                Err(AuthError::Unauthenticated(msg)) => assert_eq!(msg, "missing credentials"),
                other => panic!("unexpected result for {:?}: {:?}", authorization, other),
            }
        }
    }

    #[tokio::test]
    async fn test_garbage_claims_are_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/validate"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let validator = RemoteTokenValidator::new(&format!("{}/", server.uri())).unwrap();
        assert!(matches!(
            validator.validate(Some("Bearer x")).await,
            Err(AuthError::Unavailable(_))
        ));
    }
}
