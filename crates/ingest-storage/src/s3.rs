//! S3-compatible blob store.
//!
//! Blobs live under `{prefix}/{file_id}` in a single bucket. Payloads larger
//! than the configured chunk size are written as multipart uploads.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::{Builder, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use aws_sdk_s3::Client;
use bytes::Bytes;
use futures_util::stream;
use ingest_models::FileId;
use tracing::{debug, error, info, warn};

use crate::error::{StorageError, StorageResult};
use crate::store::{BlobMeta, BlobStore, BlobStream};

/// Smallest part size S3 accepts for all but the last part.
pub const MIN_CHUNK_SIZE: usize = 5 * 1024 * 1024;

/// Default multipart chunk size.
pub const DEFAULT_CHUNK_SIZE: usize = 8 * 1024 * 1024;

/// Configuration for the S3 client.
#[derive(Debug, Clone)]
pub struct S3Config {
    /// Custom endpoint (MinIO, R2, ...); `None` uses AWS
    pub endpoint_url: Option<String>,
    /// Static access key ID; falls back to the default credential chain
    pub access_key_id: Option<String>,
    /// Static secret access key
    pub secret_access_key: Option<String>,
    /// Region
    pub region: String,
    /// Bucket name
    pub bucket_name: String,
    /// Key prefix for uploaded source media
    pub video_prefix: String,
    /// Key prefix for converted audio
    pub mp3_prefix: String,
    /// Multipart chunk size in bytes
    pub chunk_size: usize,
}

impl S3Config {
    /// Create config from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        let chunk_size = std::env::var("S3_CHUNK_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_CHUNK_SIZE);

        Ok(Self {
            endpoint_url: std::env::var("S3_ENDPOINT_URL").ok(),
            access_key_id: std::env::var("S3_ACCESS_KEY_ID").ok(),
            secret_access_key: std::env::var("S3_SECRET_ACCESS_KEY").ok(),
            region: std::env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
            bucket_name: std::env::var("S3_BUCKET")
                .map_err(|_| StorageError::config_error("S3_BUCKET not set"))?,
            video_prefix: std::env::var("VIDEO_PREFIX").unwrap_or_else(|_| "videos".to_string()),
            mp3_prefix: std::env::var("MP3_PREFIX").unwrap_or_else(|_| "mp3s".to_string()),
            chunk_size: chunk_size.max(MIN_CHUNK_SIZE),
        })
    }
}

/// Build an S3 client from configuration.
///
/// The client is cheap to clone and is shared by both namespaces.
pub async fn connect(config: &S3Config) -> StorageResult<Client> {
    let mut loader =
        aws_config::defaults(BehaviorVersion::latest()).region(Region::new(config.region.clone()));

    match (&config.access_key_id, &config.secret_access_key) {
        (Some(id), Some(secret)) => {
            loader = loader.credentials_provider(Credentials::new(id, secret, None, None, "ingest"));
        }
        (None, None) => {}
        _ => {
            return Err(StorageError::config_error(
                "S3_ACCESS_KEY_ID and S3_SECRET_ACCESS_KEY must be set together",
            ))
        }
    }

    let sdk_config = loader.load().await;
    let mut builder = Builder::from(&sdk_config);
    if let Some(endpoint) = &config.endpoint_url {
        builder = builder.endpoint_url(endpoint).force_path_style(true);
    }

    Ok(Client::from_conf(builder.build()))
}

/// One namespace of an S3 bucket.
#[derive(Clone)]
pub struct S3BlobStore {
    client: Client,
    bucket: String,
    prefix: String,
    chunk_size: usize,
}

impl S3BlobStore {
    pub fn new(
        client: Client,
        bucket: impl Into<String>,
        prefix: impl Into<String>,
        chunk_size: usize,
    ) -> Self {
        let prefix: String = prefix.into();
        Self {
            client,
            bucket: bucket.into(),
            prefix: prefix.trim_matches('/').to_string(),
            chunk_size: chunk_size.max(MIN_CHUNK_SIZE),
        }
    }

    /// Store for uploaded source media.
    pub fn videos(client: Client, config: &S3Config) -> Self {
        Self::new(client, &config.bucket_name, &config.video_prefix, config.chunk_size)
    }

    /// Store for converted audio.
    pub fn mp3s(client: Client, config: &S3Config) -> Self {
        Self::new(client, &config.bucket_name, &config.mp3_prefix, config.chunk_size)
    }

    /// Object key for a file ID.
    pub fn key_for(&self, id: &FileId) -> String {
        object_key(&self.prefix, id)
    }

    async fn put_single(&self, key: &str, data: Bytes, meta: &BlobMeta) -> StorageResult<()> {
        let mut request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(data))
            .content_type(&meta.content_type);

        if let Some(name) = meta.filename.as_deref().and_then(metadata_safe) {
            request = request.metadata("filename", name);
        }

        request
            .send()
            .await
            .map_err(|e| StorageError::upload_failed(DisplayErrorContext(&e).to_string()))?;
        Ok(())
    }

    async fn put_chunked(&self, key: &str, data: Bytes, meta: &BlobMeta) -> StorageResult<()> {
        let mut request = self
            .client
            .create_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .content_type(&meta.content_type);

        if let Some(name) = meta.filename.as_deref().and_then(metadata_safe) {
            request = request.metadata("filename", name);
        }

        let created = request
            .send()
            .await
            .map_err(|e| StorageError::upload_failed(DisplayErrorContext(&e).to_string()))?;

        let upload_id = created
            .upload_id()
            .ok_or_else(|| StorageError::upload_failed("No upload ID returned from S3"))?
            .to_string();

        match self.upload_parts(key, &upload_id, data).await {
            Ok(()) => Ok(()),
            Err(e) => {
                self.abort_chunked(key, &upload_id).await;
                Err(e)
            }
        }
    }

    async fn upload_parts(&self, key: &str, upload_id: &str, data: Bytes) -> StorageResult<()> {
        let mut parts = Vec::new();

        for (index, chunk) in chunks(&data, self.chunk_size).into_iter().enumerate() {
            let part_number = (index + 1) as i32;

            let uploaded = self
                .client
                .upload_part()
                .bucket(&self.bucket)
                .key(key)
                .upload_id(upload_id)
                .part_number(part_number)
                .body(ByteStream::from(chunk))
                .send()
                .await
                .map_err(|e| {
                    error!(key = %key, part_number, "Failed to upload part");
                    StorageError::upload_failed(DisplayErrorContext(&e).to_string())
                })?;

            let etag = uploaded.e_tag().ok_or_else(|| {
                StorageError::upload_failed(format!("No ETag returned for part {}", part_number))
            })?;

            parts.push(
                CompletedPart::builder()
                    .part_number(part_number)
                    .e_tag(etag)
                    .build(),
            );
        }

        let part_count = parts.len();
        self.client
            .complete_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .multipart_upload(
                CompletedMultipartUpload::builder()
                    .set_parts(Some(parts))
                    .build(),
            )
            .send()
            .await
            .map_err(|e| StorageError::upload_failed(DisplayErrorContext(&e).to_string()))?;

        debug!(key = %key, parts = part_count, "Completed multipart upload");
        Ok(())
    }

    async fn abort_chunked(&self, key: &str, upload_id: &str) {
        if let Err(e) = self
            .client
            .abort_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .send()
            .await
        {
            warn!(
                key = %key,
                upload_id = %upload_id,
                error = %DisplayErrorContext(&e),
                "Failed to abort multipart upload"
            );
        }
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn put(&self, data: Bytes, meta: &BlobMeta) -> StorageResult<FileId> {
        let id = FileId::new();
        let key = self.key_for(&id);
        let size = data.len();

        if size > self.chunk_size {
            self.put_chunked(&key, data, meta).await?;
        } else {
            self.put_single(&key, data, meta).await?;
        }

        info!(key = %key, size_bytes = size, "Stored blob");
        Ok(id)
    }

    async fn open(&self, id: &FileId) -> StorageResult<BlobStream> {
        let key = self.key_for(id);
        debug!("Opening {}", key);

        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await
            .map_err(|e| {
                let missing = e
                    .as_service_error()
                    .map(|se| se.is_no_such_key())
                    .unwrap_or(false);
                if missing {
                    StorageError::not_found(&key)
                } else {
                    StorageError::download_failed(DisplayErrorContext(&e).to_string())
                }
            })?;

        let chunks = stream::try_unfold(response.body, |mut body| async move {
            let chunk = body
                .try_next()
                .await
                .map_err(|e| StorageError::download_failed(e.to_string()))?;
            Ok(chunk.map(|bytes| (bytes, body)))
        });

        Ok(Box::pin(chunks))
    }

    async fn delete(&self, id: &FileId) -> StorageResult<()> {
        let key = self.key_for(id);
        debug!("Deleting {}", key);

        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await
            .map_err(|e| StorageError::delete_failed(DisplayErrorContext(&e).to_string()))?;

        Ok(())
    }

    async fn check_connectivity(&self) -> StorageResult<()> {
        self.client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(|e| StorageError::Unreachable(DisplayErrorContext(&e).to_string()))?;
        Ok(())
    }

    fn namespace(&self) -> &str {
        &self.prefix
    }
}

fn object_key(prefix: &str, id: &FileId) -> String {
    if prefix.is_empty() {
        id.to_string()
    } else {
        format!("{}/{}", prefix, id)
    }
}

/// Split a payload into zero-copy parts of at most `size` bytes.
fn chunks(data: &Bytes, size: usize) -> Vec<Bytes> {
    (0..data.len())
        .step_by(size)
        .map(|start| data.slice(start..(start + size).min(data.len())))
        .collect()
}

/// S3 user metadata must be printable ASCII.
fn metadata_safe(name: &str) -> Option<&str> {
    let ok = !name.is_empty() && name.chars().all(|c| c.is_ascii_graphic() || c == ' ');
    ok.then_some(name)
}
