//! Authenticated upload/download gateway.
//!
//! This crate provides:
//! - `POST /upload`: store one source video and queue its conversion
//! - `GET /download`: stream a converted mp3 by file ID
//! - Remote or local token validation
//! - Health, readiness, and Prometheus metrics endpoints

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;

pub use auth::{AdminUser, AuthError, TokenValidator};
pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use services::IngestService;
pub use state::AppState;
