// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job queue: FIFO handoff from admission to workers.

mod redis;

pub use self::redis::RedisJobQueue;

use async_trait::async_trait;
use eb_core::QueueMessage;
use std::time::Duration;
use thiserror::Error;

/// Name of the shared work queue key.
pub const QUEUE_KEY: &str = "jobs";

/// Errors from queue operations.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("queue backend error: {0}")]
    Backend(String),
    #[error("malformed queue message: {0}")]
    Malformed(String),
}

/// FIFO queue of [`QueueMessage`]s across producers and workers.
///
/// Handoff is not exactly-once: a worker crash after dequeue loses the
/// message, surfacing as a stale record that eventually expires.
#[async_trait]
pub trait JobQueue: Clone + Send + Sync + 'static {
    /// Publish a message; non-blocking.
    async fn enqueue(&self, msg: &QueueMessage) -> Result<(), QueueError>;

    /// Block up to `timeout` for the next message, `None` on timeout.
    async fn dequeue(&self, timeout: Duration) -> Result<Option<QueueMessage>, QueueError>;
}
