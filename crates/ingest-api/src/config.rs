//! API configuration.

/// How bearer credentials are validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// Forward to the external auth service
    Remote,
    /// Verify HS256 tokens locally with a shared secret
    Jwt,
}

/// Which blob store backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    S3,
    Memory,
}

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Max request body size
    pub max_body_size: usize,
    /// Expose Prometheus metrics at /metrics
    pub metrics_enabled: bool,
    /// Environment (development/production)
    pub environment: String,
    /// Credential validation mode
    pub auth_mode: AuthMode,
    /// Base URL of the auth service (remote mode)
    pub auth_service_url: String,
    /// Shared HS256 secret (jwt mode)
    pub jwt_secret: Option<String>,
    /// Blob store backend
    pub storage_backend: StorageBackend,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            max_body_size: 512 * 1024 * 1024, // 512MB
            metrics_enabled: true,
            environment: "development".to_string(),
            auth_mode: AuthMode::Remote,
            auth_service_url: "http://auth:5000".to_string(),
            jwt_secret: None,
            storage_backend: StorageBackend::S3,
        }
    }
}

impl ApiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            host: std::env::var("API_HOST").unwrap_or(defaults.host),
            port: std::env::var("API_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.port),
            max_body_size: std::env::var("MAX_BODY_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_body_size),
            metrics_enabled: std::env::var("METRICS_ENABLED")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(defaults.metrics_enabled),
            environment: std::env::var("ENVIRONMENT").unwrap_or(defaults.environment),
            auth_mode: match std::env::var("AUTH_MODE").as_deref() {
                Ok("jwt") => AuthMode::Jwt,
                _ => AuthMode::Remote,
            },
            auth_service_url: std::env::var("AUTH_SERVICE_URL")
                .unwrap_or(defaults.auth_service_url),
            jwt_secret: std::env::var("JWT_SECRET").ok(),
            storage_backend: match std::env::var("STORAGE_BACKEND").as_deref() {
                Ok("memory") => StorageBackend::Memory,
                _ => StorageBackend::S3,
            },
        }
    }
}
