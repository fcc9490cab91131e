//! Job publisher abstraction.

use async_trait::async_trait;
use ingest_models::ConversionJob;

use crate::error::QueueResult;

/// Durable, at-least-once publish of conversion jobs.
///
/// `publish` returns only after the broker has acknowledged the message as
/// persisted; any error means the job must be treated as not enqueued.
/// Implementations must tolerate concurrent calls from many request tasks.
#[async_trait]
pub trait JobPublisher: Send + Sync {
    /// Publish a job, returning the broker-assigned message ID.
    async fn publish(&self, job: &ConversionJob) -> QueueResult<String>;

    /// Check that the broker is reachable.
    async fn check_connectivity(&self) -> QueueResult<()>;

    /// Stop accepting jobs. Later `publish` calls fail; repeated calls are no-ops.
    async fn close(&self) {}
}

/// Serialize a job into its queue payload.
pub fn encode_job(job: &ConversionJob) -> QueueResult<String> {
    Ok(serde_json::to_string(job)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ingest_models::FileId;

    #[test]
    fn test_encode_job_payload() {
        let fid: FileId = "3d7a9c52-5f0e-4b8a-b1c2-9e8f7a6b5c4d".parse().unwrap();
        let payload = encode_job(&ConversionJob::new(fid, "carol")).unwrap();

        assert_eq!(
            payload,
            r#"{"video_fid":"3d7a9c52-5f0e-4b8a-b1c2-9e8f7a6b5c4d","mp3_fid":null,"username":"carol"}"#
        );
    }
}
