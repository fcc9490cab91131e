//! Application state.

use std::sync::Arc;

use anyhow::Context;
use ingest_queue::{JobPublisher, RedisJobQueue};
use ingest_storage::{BlobStore, MemoryBlobStore, S3BlobStore, S3Config};
use tracing::{info, warn};

use crate::auth::{JwtTokenValidator, RemoteTokenValidator, TokenValidator};
use crate::config::{ApiConfig, AuthMode, StorageBackend};
use crate::services::IngestService;

/// Shared application state.
///
/// Built once at start-up; every request works against clones of the same
/// store and publisher handles.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub validator: Arc<dyn TokenValidator>,
    pub videos: Arc<dyn BlobStore>,
    pub mp3s: Arc<dyn BlobStore>,
    pub publisher: Arc<dyn JobPublisher>,
}

impl AppState {
    /// Create new application state, connecting every backend.
    pub async fn new(config: ApiConfig) -> anyhow::Result<Self> {
        let validator: Arc<dyn TokenValidator> = match config.auth_mode {
            AuthMode::Remote => Arc::new(
                RemoteTokenValidator::new(&config.auth_service_url)
                    .context("failed to build auth service client")?,
            ),
            AuthMode::Jwt => {
                let secret = config
                    .jwt_secret
                    .as_deref()
                    .context("JWT_SECRET must be set when AUTH_MODE=jwt")?;
                Arc::new(JwtTokenValidator::new(secret))
            }
        };

        let (videos, mp3s): (Arc<dyn BlobStore>, Arc<dyn BlobStore>) = match config.storage_backend
        {
            StorageBackend::S3 => {
                let s3_config = S3Config::from_env()?;
                let client = ingest_storage::s3::connect(&s3_config).await?;
                info!(bucket = %s3_config.bucket_name, "Using S3 blob store");
                (
                    Arc::new(S3BlobStore::videos(client.clone(), &s3_config)),
                    Arc::new(S3BlobStore::mp3s(client, &s3_config)),
                )
            }
            StorageBackend::Memory => {
                warn!("Using in-memory blob store; uploads are lost on restart");
                (
                    Arc::new(MemoryBlobStore::new("videos")),
                    Arc::new(MemoryBlobStore::new("mp3s")),
                )
            }
        };

        let publisher = RedisJobQueue::from_env()
            .await
            .context("failed to connect job queue")?;

        Ok(Self::from_parts(
            config,
            validator,
            videos,
            mp3s,
            Arc::new(publisher),
        ))
    }

    /// Assemble state from already-built components.
    pub fn from_parts(
        config: ApiConfig,
        validator: Arc<dyn TokenValidator>,
        videos: Arc<dyn BlobStore>,
        mp3s: Arc<dyn BlobStore>,
        publisher: Arc<dyn JobPublisher>,
    ) -> Self {
        Self {
            config,
            validator,
            videos,
            mp3s,
            publisher,
        }
    }

    /// Upload/download workflow over this state's backends.
    pub fn ingest(&self) -> IngestService {
        IngestService::new(
            Arc::clone(&self.videos),
            Arc::clone(&self.mp3s),
            Arc::clone(&self.publisher),
        )
    }

    /// Close the publisher and release backend connections once the server
    /// has stopped.
    pub async fn shutdown(self) {
        let Self {
            videos,
            mp3s,
            publisher,
            ..
        } = self;

        publisher.close().await;

        let outstanding = [
            Arc::strong_count(&videos),
            Arc::strong_count(&mp3s),
            Arc::strong_count(&publisher),
        ];
        if outstanding.iter().any(|&n| n > 1) {
            warn!(?outstanding, "Backend handles still shared at shutdown");
        }

        drop((videos, mp3s, publisher));
        info!("Backend connections released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ingest_models::{AccessClaims, ConversionJob};
    use ingest_queue::QueueResult;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::auth::AuthError;

    struct DenyAll;

    #[async_trait]
    impl TokenValidator for DenyAll {
        async fn validate(&self, _: Option<&str>) -> Result<AccessClaims, AuthError> {
            Err(AuthError::missing_credentials())
        }
    }

    #[derive(Default)]
    struct ClosingPublisher {
        closes: AtomicUsize,
    }

    #[async_trait]
    impl JobPublisher for ClosingPublisher {
        async fn publish(&self, _: &ConversionJob) -> QueueResult<String> {
            Ok("1-0".to_string())
        }

        async fn check_connectivity(&self) -> QueueResult<()> {
            Ok(())
        }

        async fn close(&self) {
            self.closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_shutdown_closes_publisher() {
        let publisher = Arc::new(ClosingPublisher::default());
        let state = AppState::from_parts(
            ApiConfig::default(),
            Arc::new(DenyAll),
            Arc::new(MemoryBlobStore::new("videos")),
            Arc::new(MemoryBlobStore::new("mp3s")),
            publisher.clone(),
        );

        state.shutdown().await;

        assert_eq!(publisher.closes.load(Ordering::SeqCst), 1);
        assert_eq!(Arc::strong_count(&publisher), 1);
    }
}
