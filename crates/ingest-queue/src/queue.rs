//! Job queue using Redis Streams.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use ingest_models::ConversionJob;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use tracing::{info, warn};

use crate::error::{QueueError, QueueResult};
use crate::publisher::{encode_job, JobPublisher};

/// Queue configuration.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Redis URL
    pub redis_url: String,
    /// Stream the conversion consumers read from
    pub queue_name: String,
    /// Wait for the append-only file to be fsynced before acknowledging
    pub require_fsync: bool,
    /// Upper bound on the fsync wait
    pub fsync_timeout: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://localhost:6379".to_string(),
            queue_name: "video".to_string(),
            require_fsync: true,
            fsync_timeout: Duration::from_millis(5000),
        }
    }
}

impl QueueConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            redis_url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            queue_name: std::env::var("QUEUE_NAME").unwrap_or_else(|_| "video".to_string()),
            require_fsync: std::env::var("QUEUE_REQUIRE_FSYNC")
                .map(|v| v != "false" && v != "0")
                .unwrap_or(true),
            fsync_timeout: Duration::from_millis(
                std::env::var("QUEUE_FSYNC_TIMEOUT_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(5000),
            ),
        }
    }
}

/// Redis Streams job publisher.
///
/// Holds a single multiplexed connection opened at start-up. Clones of the
/// connection share one socket whose commands are pipelined in order by the
/// client's driver task, so concurrent publishes need no extra locking.
pub struct RedisJobQueue {
    conn: MultiplexedConnection,
    config: QueueConfig,
    closed: AtomicBool,
}

impl RedisJobQueue {
    /// Open the shared connection.
    pub async fn connect(config: QueueConfig) -> QueueResult<Self> {
        let client = redis::Client::open(config.redis_url.as_str())?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| QueueError::connection_failed(e.to_string()))?;

        info!(
            queue = %config.queue_name,
            require_fsync = config.require_fsync,
            "Connected job queue"
        );
        Ok(Self {
            conn,
            config,
            closed: AtomicBool::new(false),
        })
    }

    /// Connect using environment configuration.
    pub async fn from_env() -> QueueResult<Self> {
        Self::connect(QueueConfig::from_env()).await
    }

    /// Get queue length.
    pub async fn len(&self) -> QueueResult<u64> {
        let mut conn = self.conn.clone();
        let len: u64 = conn.xlen(&self.config.queue_name).await?;
        Ok(len)
    }

    /// Block until the entry is fsynced locally.
    async fn await_fsync(&self, conn: &mut MultiplexedConnection, entry_id: &str) -> QueueResult<()> {
        let (local, _replicas): (i64, i64) = redis::cmd("WAITAOF")
            .arg(1)
            .arg(0)
            .arg(self.config.fsync_timeout.as_millis() as u64)
            .query_async(conn)
            .await?;

        if local < 1 {
            return Err(QueueError::NotDurable(entry_id.to_string()));
        }
        Ok(())
    }

    /// Remove an entry whose durability could not be confirmed.
    async fn retract(&self, conn: &mut MultiplexedConnection, entry_id: &str) {
        let result: Result<u64, _> = conn.xdel(&self.config.queue_name, &[entry_id]).await;
        if let Err(e) = result {
            warn!(entry_id = %entry_id, error = %e, "Failed to retract unconfirmed entry");
        }
    }
}

#[async_trait]
impl JobPublisher for RedisJobQueue {
    async fn publish(&self, job: &ConversionJob) -> QueueResult<String> {
        if self.closed.load(Ordering::Acquire) {
            return Err(QueueError::Closed);
        }

        let payload = encode_job(job)?;
        let mut conn = self.conn.clone();

        let entry_id: String = redis::cmd("XADD")
            .arg(&self.config.queue_name)
            .arg("*")
            .arg("job")
            .arg(&payload)
            .query_async(&mut conn)
            .await?;

        if self.config.require_fsync {
            if let Err(e) = self.await_fsync(&mut conn, &entry_id).await {
                // A job must never outlive a publish failure: the caller is
                // about to delete the source blob.
                self.retract(&mut conn, &entry_id).await;
                return Err(e);
            }
        }

        info!(
            queue = %self.config.queue_name,
            entry_id = %entry_id,
            video_fid = %job.source_fid,
            username = %job.username,
            "Published conversion job"
        );

        Ok(entry_id)
    }

    async fn check_connectivity(&self) -> QueueResult<()> {
        let mut conn = self.conn.clone();
        redis::cmd("PING").query_async::<()>(&mut conn).await?;
        Ok(())
    }

    async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        // The socket itself goes when the last connection clone drops.
        info!(queue = %self.config.queue_name, "Closed job queue");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = QueueConfig::default();
        assert_eq!(config.queue_name, "video");
        assert!(config.require_fsync);
        assert_eq!(config.fsync_timeout, Duration::from_secs(5));
    }
}
