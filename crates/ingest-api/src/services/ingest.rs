//! Store-then-publish workflow for uploads, and output lookup for downloads.

use std::sync::Arc;

use bytes::Bytes;
use ingest_models::{AccessClaims, ConversionJob, FileId};
use ingest_queue::JobPublisher;
use ingest_storage::{BlobMeta, BlobStore, BlobStream};
use tracing::{error, info, warn};

use crate::error::{ApiError, ApiResult};
use crate::metrics;

/// A single file part taken from an upload request.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl UploadedFile {
    fn meta(&self) -> BlobMeta {
        BlobMeta::new(self.filename.clone(), self.content_type.clone())
    }
}

/// Couples the blob stores with the job publisher.
#[derive(Clone)]
pub struct IngestService {
    videos: Arc<dyn BlobStore>,
    mp3s: Arc<dyn BlobStore>,
    publisher: Arc<dyn JobPublisher>,
}

impl IngestService {
    pub fn new(
        videos: Arc<dyn BlobStore>,
        mp3s: Arc<dyn BlobStore>,
        publisher: Arc<dyn JobPublisher>,
    ) -> Self {
        Self {
            videos,
            mp3s,
            publisher,
        }
    }

    /// Store a source video and publish its conversion job.
    ///
    /// When the publish fails the stored blob is deleted, so every accepted
    /// upload has exactly one job and every rejected upload leaves nothing
    /// behind (unless the delete fails too, which is logged).
    ///
    /// The sequence runs on its own task and completes even if the caller
    /// drops this future, e.g. when the client disconnects mid-request.
    pub async fn submit(&self, claims: &AccessClaims, file: UploadedFile) -> ApiResult<FileId> {
        let service = self.clone();
        let claims = claims.clone();

        tokio::spawn(async move { service.store_and_publish(&claims, file).await })
            .await
            .map_err(|e| ApiError::internal(format!("upload task failed: {}", e)))?
    }

    async fn store_and_publish(
        &self,
        claims: &AccessClaims,
        file: UploadedFile,
    ) -> ApiResult<FileId> {
        let size = file.data.len();
        let meta = file.meta();

        let fid = self.videos.put(file.data, &meta).await?;
        metrics::record_upload_accepted(size);
        info!(
            video_fid = %fid,
            username = %claims.username,
            size_bytes = size,
            "Stored source video"
        );

        let job = ConversionJob::for_claims(fid, claims);
        if let Err(e) = self.publisher.publish(&job).await {
            metrics::record_publish_failure();
            error!(video_fid = %fid, error = %e, "Failed to publish conversion job");
            self.compensate(&fid).await;
            return Err(ApiError::Publish(e));
        }

        metrics::record_job_published();
        Ok(fid)
    }

    /// Best-effort removal of a blob whose job was never published.
    async fn compensate(&self, fid: &FileId) {
        match self.videos.delete(fid).await {
            Ok(()) => {
                metrics::record_compensation("deleted");
                info!(
                    namespace = self.videos.namespace(),
                    video_fid = %fid,
                    "Deleted source video after failed publish"
                );
            }
            Err(e) => {
                metrics::record_compensation("orphaned");
                warn!(
                    namespace = self.videos.namespace(),
                    video_fid = %fid,
                    error = %e,
                    "Failed to delete source video after failed publish; blob is orphaned"
                );
            }
        }
    }

    /// Open a converted output for streaming.
    ///
    /// Malformed identifiers and every store failure, including a missing
    /// blob, surface as internal errors.
    pub async fn open_output(&self, fid: &str) -> ApiResult<BlobStream> {
        let fid = FileId::parse(fid).map_err(|e| ApiError::internal(e.to_string()))?;
        Ok(self.mp3s.open(&fid).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ingest_models::ConversionJob;
    use ingest_queue::{QueueError, QueueResult};
    use ingest_storage::MemoryBlobStore;
    use std::sync::Mutex;

    /// Records jobs, optionally failing every publish.
    struct RecordingPublisher {
        fail: bool,
        jobs: Mutex<Vec<ConversionJob>>,
    }

    impl RecordingPublisher {
        fn new(fail: bool) -> Self {
            Self {
                fail,
                jobs: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl JobPublisher for RecordingPublisher {
        async fn publish(&self, job: &ConversionJob) -> QueueResult<String> {
            if self.fail {
                return Err(QueueError::publish_failed("unavailable"));
            }
            self.jobs.lock().unwrap().push(job.clone());
            Ok("1-0".to_string())
        }

        async fn check_connectivity(&self) -> QueueResult<()> {
            Ok(())
        }
    }

    fn upload(data: &'static [u8]) -> UploadedFile {
        UploadedFile {
            filename: Some("clip.mp4".to_string()),
            content_type: Some("video/mp4".to_string()),
            data: Bytes::from_static(data),
        }
    }

    #[tokio::test]
    async fn test_submit_stores_and_publishes() {
        let videos = Arc::new(MemoryBlobStore::new("videos"));
        let publisher = Arc::new(RecordingPublisher::new(false));
        let service = IngestService::new(
            videos.clone(),
            Arc::new(MemoryBlobStore::new("mp3s")),
            publisher.clone(),
        );

        let claims = AccessClaims::new("alice", true);
        let fid = service.submit(&claims, upload(b"video")).await.unwrap();

        assert!(videos.contains(&fid).await);
        let jobs = publisher.jobs.lock().unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].source_fid, fid);
        assert_eq!(jobs[0].result_fid, None);
        assert_eq!(jobs[0].username, "alice");
    }

    #[tokio::test]
    async fn test_failed_publish_removes_blob() {
        let videos = Arc::new(MemoryBlobStore::new("videos"));
        let service = IngestService::new(
            videos.clone(),
            Arc::new(MemoryBlobStore::new("mp3s")),
            Arc::new(RecordingPublisher::new(true)),
        );

        let claims = AccessClaims::new("alice", true);
        let err = service.submit(&claims, upload(b"video")).await.unwrap_err();

        assert!(matches!(err, ApiError::Publish(_)));
        assert!(videos.is_empty().await);
    }

    #[tokio::test]
    async fn test_open_output() {
        let mp3s = Arc::new(MemoryBlobStore::new("mp3s"));
        let fid = FileId::new();
        mp3s.insert(fid, &b"ID3"[..], BlobMeta::default()).await;

        let service = IngestService::new(
            Arc::new(MemoryBlobStore::new("videos")),
            mp3s,
            Arc::new(RecordingPublisher::new(false)),
        );

        assert!(service.open_output(&fid.to_string()).await.is_ok());

        assert!(matches!(
            service.open_output("not-an-id").await,
            Err(ApiError::Internal(_))
        ));
        assert!(matches!(
            service.open_output(&FileId::new().to_string()).await,
            Err(ApiError::Storage(_))
        ));
    }
}
