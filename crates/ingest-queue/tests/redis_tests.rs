//! Redis publisher integration tests.

use ingest_models::{ConversionJob, FileId};
use ingest_queue::{JobPublisher, QueueConfig, QueueError, RedisJobQueue};

fn test_config() -> QueueConfig {
    let mut config = QueueConfig::from_env();
    config.queue_name = format!("video-test-{}", FileId::new());
    // CI Redis runs without appendonly
    config.require_fsync = std::env::var("QUEUE_REQUIRE_FSYNC").is_ok_and(|v| v == "true");
    config
}

/// Test Redis connection.
#[tokio::test]
#[ignore = "requires Redis"]
async fn test_redis_connection() {
    dotenvy::dotenv().ok();

    let queue = RedisJobQueue::connect(test_config())
        .await
        .expect("Failed to connect queue");
    queue
        .check_connectivity()
        .await
        .expect("Redis did not answer PING");
}

/// Test that a published job lands on the stream as JSON.
#[tokio::test]
#[ignore = "requires Redis"]
async fn test_publish_appends_entry() {
    dotenvy::dotenv().ok();

    let config = test_config();
    let queue = RedisJobQueue::connect(config.clone())
        .await
        .expect("Failed to connect queue");

    let job = ConversionJob::new(FileId::new(), "integration");
    let entry_id = queue.publish(&job).await.expect("Failed to publish");
    assert!(!entry_id.is_empty());
    assert_eq!(queue.len().await.expect("Failed to get length"), 1);

    let client = redis::Client::open(config.redis_url.as_str()).unwrap();
    let mut conn = client.get_multiplexed_async_connection().await.unwrap();
    let reply: redis::streams::StreamRangeReply = redis::cmd("XRANGE")
        .arg(&config.queue_name)
        .arg("-")
        .arg("+")
        .query_async(&mut conn)
        .await
        .unwrap();

    let entry = &reply.ids[0];
    let payload: String = entry.get("job").expect("missing job field");
    let decoded: ConversionJob = serde_json::from_str(&payload).unwrap();
    assert_eq!(decoded, job);

    redis::cmd("DEL")
        .arg(&config.queue_name)
        .query_async::<()>(&mut conn)
        .await
        .unwrap();
}

/// Test that a closed queue refuses further jobs.
#[tokio::test]
#[ignore = "requires Redis"]
async fn test_publish_after_close_fails() {
    dotenvy::dotenv().ok();

    let queue = RedisJobQueue::connect(test_config())
        .await
        .expect("Failed to connect queue");
    queue.close().await;
    queue.close().await;

    let job = ConversionJob::new(FileId::new(), "integration");
    assert!(matches!(
        queue.publish(&job).await,
        Err(QueueError::Closed)
    ));
    assert_eq!(queue.len().await.expect("Failed to get length"), 0);
}
