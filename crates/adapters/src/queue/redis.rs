// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Redis list queue: `LPUSH` to publish, `BRPOP` to consume.

use super::{JobQueue, QueueError, QUEUE_KEY};
use async_trait::async_trait;
use eb_core::QueueMessage;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::time::Duration;

/// Job queue over a shared Redis connection.
#[derive(Clone)]
pub struct RedisJobQueue {
    conn: ConnectionManager,
}

fn backend(e: redis::RedisError) -> QueueError {
    QueueError::Backend(e.to_string())
}

impl RedisJobQueue {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl JobQueue for RedisJobQueue {
    async fn enqueue(&self, msg: &QueueMessage) -> Result<(), QueueError> {
        let payload = serde_json::to_string(msg).map_err(|e| QueueError::Malformed(e.to_string()))?;
        let mut conn = self.conn.clone();
        let _: i64 = conn.lpush(QUEUE_KEY, payload).await.map_err(backend)?;
        Ok(())
    }

    async fn dequeue(&self, timeout: Duration) -> Result<Option<QueueMessage>, QueueError> {
        let mut conn = self.conn.clone();
        let popped: Option<(String, String)> = conn
            .brpop(QUEUE_KEY, timeout.as_secs_f64())
            .await
            .map_err(backend)?;
        match popped {
            Some((_key, payload)) => serde_json::from_str(&payload)
                .map(Some)
                .map_err(|e| QueueError::Malformed(e.to_string())),
            None => Ok(None),
        }
    }
}
