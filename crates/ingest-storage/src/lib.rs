//! Blob store client.
//!
//! This crate provides:
//! - The `BlobStore` put/get/delete abstraction
//! - An S3-compatible backend with chunked (multipart) uploads
//! - An in-memory backend for development and tests

pub mod error;
pub mod memory;
pub mod s3;
pub mod store;

pub use error::{StorageError, StorageResult};
pub use memory::MemoryBlobStore;
pub use s3::{S3BlobStore, S3Config};
pub use store::{BlobMeta, BlobStore, BlobStream};
