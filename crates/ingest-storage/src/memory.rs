//! In-process blob store.
//!
//! Backs local development (`STORAGE_BACKEND=memory`) and tests. Contents are
//! lost on restart.

use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream;
use ingest_models::FileId;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{StorageError, StorageResult};
use crate::store::{BlobMeta, BlobStore, BlobStream};

#[derive(Debug, Clone)]
struct StoredBlob {
    data: Bytes,
    meta: BlobMeta,
}

/// Blob store holding everything in a map.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    namespace: String,
    objects: RwLock<HashMap<FileId, StoredBlob>>,
}

impl MemoryBlobStore {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            objects: RwLock::new(HashMap::new()),
        }
    }

    /// Insert a blob under a caller-chosen ID, as a downstream stage would.
    pub async fn insert(&self, id: FileId, data: impl Into<Bytes>, meta: BlobMeta) {
        self.objects.write().await.insert(
            id,
            StoredBlob {
                data: data.into(),
                meta,
            },
        );
    }

    pub async fn contains(&self, id: &FileId) -> bool {
        self.objects.read().await.contains_key(id)
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Metadata recorded for a blob.
    pub async fn meta(&self, id: &FileId) -> Option<BlobMeta> {
        self.objects.read().await.get(id).map(|b| b.meta.clone())
    }

    fn missing(&self, id: &FileId) -> StorageError {
        StorageError::not_found(format!("{}/{}", self.namespace, id))
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, data: Bytes, meta: &BlobMeta) -> StorageResult<FileId> {
        let id = FileId::new();
        debug!(namespace = %self.namespace, id = %id, size_bytes = data.len(), "Stored blob");
        self.insert(id, data, meta.clone()).await;
        Ok(id)
    }

    async fn open(&self, id: &FileId) -> StorageResult<BlobStream> {
        let data = self.get(id).await?;
        Ok(Box::pin(stream::once(async move { Ok(data) })))
    }

    async fn get(&self, id: &FileId) -> StorageResult<Bytes> {
        self.objects
            .read()
            .await
            .get(id)
            .map(|b| b.data.clone())
            .ok_or_else(|| self.missing(id))
    }

    async fn delete(&self, id: &FileId) -> StorageResult<()> {
        self.objects.write().await.remove(id);
        Ok(())
    }

    async fn check_connectivity(&self) -> StorageResult<()> {
        Ok(())
    }

    fn namespace(&self) -> &str {
        &self.namespace
    }
}

#[cfg(test)]
mod tests {
    use futures_util::TryStreamExt;

    use super::*;

    #[tokio::test]
    async fn test_put_then_get_returns_same_bytes() {
        let store = MemoryBlobStore::new("videos");
        let payload = Bytes::from_static(b"\x00\x01 not really an mp4 \xff");

        let id = store.put(payload.clone(), &BlobMeta::default()).await.unwrap();

        assert_eq!(store.get(&id).await.unwrap(), payload);
    }

    #[tokio::test]
    async fn test_each_put_gets_a_fresh_id() {
        let store = MemoryBlobStore::new("videos");
        let a = store.put(Bytes::from_static(b"a"), &BlobMeta::default()).await.unwrap();
        let b = store.put(Bytes::from_static(b"a"), &BlobMeta::default()).await.unwrap();

        assert_ne!(a, b);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_open_streams_contents() {
        let store = MemoryBlobStore::new("mp3s");
        let id = FileId::new();
        store.insert(id, &b"ID3 audio"[..], BlobMeta::default()).await;

        let chunks: Vec<Bytes> = store.open(&id).await.unwrap().try_collect().await.unwrap();
        assert_eq!(chunks.concat(), b"ID3 audio".to_vec());
    }

    #[tokio::test]
    async fn test_missing_blob_is_not_found() {
        let store = MemoryBlobStore::new("mp3s");
        let id = FileId::new();

        assert!(store.get(&id).await.unwrap_err().is_not_found());
        assert!(store.open(&id).await.is_err());
    }

    #[tokio::test]
    async fn test_delete_removes_blob() {
        let store = MemoryBlobStore::new("videos");
        let meta = BlobMeta::new(Some("talk.mp4".to_string()), Some("video/mp4".to_string()));
        let id = store.put(Bytes::from_static(b"data"), &meta).await.unwrap();
        assert_eq!(store.meta(&id).await, Some(meta));

        store.delete(&id).await.unwrap();

        assert!(!store.contains(&id).await);
        assert!(store.is_empty().await);
    }
}
