// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Redis admission gate.
//!
//! The two-counter check runs as a server-side Lua script so the read of
//! the running counter and the increment of the hourly counter are a
//! single atomic round, even with multiple control-plane replicas
//! admitting concurrently.

use super::{rate_key, AdmissionGate, GateError, RATE_TTL_SECS};
use crate::state::running_key;
use async_trait::async_trait;
use eb_core::UserId;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::sync::Arc;

// KEYS[1] = running:<uid>, KEYS[2] = rate:<uid>
// ARGV[1] = max_concurrency, ARGV[2] = max_rate, ARGV[3] = rate TTL secs
const TRY_ADMIT_SCRIPT: &str = r"
local running = tonumber(redis.call('GET', KEYS[1]) or '0')
if running >= tonumber(ARGV[1]) then
  return 0
end
local hourly = tonumber(redis.call('GET', KEYS[2]) or '0')
if hourly >= tonumber(ARGV[2]) then
  return 0
end
redis.call('INCR', KEYS[2])
redis.call('EXPIRE', KEYS[2], ARGV[3])
return 1
";

/// Admission gate over a shared Redis connection.
#[derive(Clone)]
pub struct RedisAdmissionGate {
    conn: ConnectionManager,
    script: Arc<redis::Script>,
}

fn backend(e: redis::RedisError) -> GateError {
    GateError::Backend(e.to_string())
}

impl RedisAdmissionGate {
    pub fn new(conn: ConnectionManager) -> Self {
        Self {
            conn,
            script: Arc::new(redis::Script::new(TRY_ADMIT_SCRIPT)),
        }
    }
}

#[async_trait]
impl AdmissionGate for RedisAdmissionGate {
    async fn try_admit(
        &self,
        user_id: &UserId,
        max_concurrency: u32,
        max_rate: u32,
    ) -> Result<bool, GateError> {
        let mut conn = self.conn.clone();
        let admitted: i32 = self
            .script
            .key(running_key(user_id))
            .key(rate_key(user_id))
            .arg(max_concurrency)
            .arg(max_rate)
            .arg(RATE_TTL_SECS)
            .invoke_async(&mut conn)
            .await
            .map_err(backend)?;
        Ok(admitted == 1)
    }

    async fn decr_hourly(&self, user_id: &UserId) -> Result<(), GateError> {
        let mut conn = self.conn.clone();
        let key = rate_key(user_id);
        let _: i64 = conn.decr(&key, 1).await.map_err(backend)?;
        // Keep the TTL so a rolled-back slot still ages out with the window.
        let _: () = conn.expire(&key, RATE_TTL_SECS).await.map_err(backend)?;
        Ok(())
    }

    async fn submission_count(&self, user_id: &UserId) -> Result<i64, GateError> {
        let mut conn = self.conn.clone();
        let value: Option<i64> = conn.get(rate_key(user_id)).await.map_err(backend)?;
        Ok(value.unwrap_or(0))
    }
}
