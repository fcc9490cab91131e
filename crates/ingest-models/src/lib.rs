//! Shared data models for the media ingest gateway.
//!
//! This crate provides Serde-serializable types for:
//! - Stored object identifiers
//! - Access claims produced by token validation
//! - Conversion jobs handed to the downstream pipeline

pub mod claims;
pub mod file_id;
pub mod job;

// Re-export common types
pub use claims::AccessClaims;
pub use file_id::{FileId, FileIdError};
pub use job::ConversionJob;
