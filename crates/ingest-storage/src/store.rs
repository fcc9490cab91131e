//! Blob store abstraction.
//!
//! Every backend stores opaque blobs under identifiers it generates itself.
//! A backend instance is bound to a single namespace (source videos or
//! converted mp3s); the gateway holds one instance per namespace.

use std::pin::Pin;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures_util::{Stream, TryStreamExt};
use ingest_models::FileId;

use crate::error::StorageResult;

/// Stream of blob chunks, as returned by [`BlobStore::open`].
pub type BlobStream = Pin<Box<dyn Stream<Item = StorageResult<Bytes>> + Send>>;

/// Descriptive metadata recorded alongside a blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobMeta {
    /// Original client-side file name, if any
    pub filename: Option<String>,
    /// MIME type
    pub content_type: String,
}

impl BlobMeta {
    pub fn new(filename: Option<String>, content_type: Option<String>) -> Self {
        Self {
            filename,
            content_type: content_type
                .unwrap_or_else(|| "application/octet-stream".to_string()),
        }
    }
}

impl Default for BlobMeta {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// Put/get/delete access to one namespace of the object store.
///
/// Implementations must be safe for concurrent use by many request tasks.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `data` and return the identifier generated for it.
    async fn put(&self, data: Bytes, meta: &BlobMeta) -> StorageResult<FileId>;

    /// Open a blob for streaming.
    ///
    /// Fails before yielding anything if the blob does not exist.
    async fn open(&self, id: &FileId) -> StorageResult<BlobStream>;

    /// Fetch a whole blob into memory.
    async fn get(&self, id: &FileId) -> StorageResult<Bytes> {
        let stream = self.open(id).await?;
        let buf = stream
            .try_fold(BytesMut::new(), |mut buf, chunk| async move {
                buf.extend_from_slice(&chunk);
                Ok(buf)
            })
            .await?;
        Ok(buf.freeze())
    }

    /// Delete a blob.
    async fn delete(&self, id: &FileId) -> StorageResult<()>;

    /// Check that the backend is reachable.
    async fn check_connectivity(&self) -> StorageResult<()>;

    /// Namespace this store is bound to.
    fn namespace(&self) -> &str;
}
