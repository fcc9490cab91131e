//! Conversion job publisher.
//!
//! This crate provides:
//! - The `JobPublisher` abstraction used by the upload path
//! - A Redis Streams publisher that waits for an fsync acknowledgment

pub mod error;
pub mod publisher;
pub mod queue;

pub use error::{QueueError, QueueResult};
pub use publisher::{encode_job, JobPublisher};
pub use queue::{QueueConfig, RedisJobQueue};
