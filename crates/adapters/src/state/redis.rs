// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Redis-backed job state store.
//!
//! Records live in hashes under `job:<jid>` with a 90-day TTL refreshed on
//! every write. The `running:<uid>` counter is maintained on status
//! transitions and rebuilt by a key scan when it has expired.

use super::{job_key, running_key, JobStateStore, StateError, JOB_TTL_SECS, RUNNING_TTL_SECS};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use eb_core::{Clock, JobId, JobRecord, JobStatus, SubmissionId, SystemClock, UpdateFields, UserId};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::collections::HashMap;

/// Job state store over a shared Redis connection.
#[derive(Clone)]
pub struct RedisJobStateStore<C: Clock = SystemClock> {
    conn: ConnectionManager,
    clock: C,
}

fn backend(e: redis::RedisError) -> StateError {
    StateError::Backend(e.to_string())
}

fn parse_timestamp(jid: &JobId, field: &str, value: &str) -> Result<DateTime<Utc>, StateError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StateError::CorruptRecord {
            jid: jid.to_string(),
            reason: format!("{field}: {e}"),
        })
}

fn record_from_hash(jid: &JobId, hash: HashMap<String, String>) -> Result<JobRecord, StateError> {
    let field = |name: &str| -> Result<&String, StateError> {
        hash.get(name).ok_or_else(|| StateError::CorruptRecord {
            jid: jid.to_string(),
            reason: format!("missing field {name}"),
        })
    };
    let status: JobStatus =
        field("status")?
            .parse()
            .map_err(|e: eb_core::job::UnknownStatus| StateError::CorruptRecord {
                jid: jid.to_string(),
                reason: e.to_string(),
            })?;
    Ok(JobRecord {
        job_id: jid.clone(),
        submission_id: SubmissionId::new(field("submission_id")?.clone()),
        user_id: UserId::new(field("user_id")?.clone()),
        status,
        created_at: parse_timestamp(jid, "created_at", field("created_at")?)?,
        updated_at: parse_timestamp(jid, "updated_at", field("updated_at")?)?,
        run_id: hash.get("run_id").cloned(),
        error: hash.get("error").cloned(),
    })
}

impl<C: Clock> RedisJobStateStore<C> {
    pub fn new(conn: ConnectionManager, clock: C) -> Self {
        Self { conn, clock }
    }

    async fn adjust_running(
        &self,
        user_id: &UserId,
        prev: JobStatus,
        next: JobStatus,
    ) -> Result<(), StateError> {
        let mut conn = self.conn.clone();
        let key = running_key(user_id);
        if prev != JobStatus::Running && next == JobStatus::Running {
            let _: i64 = conn.incr(&key, 1).await.map_err(backend)?;
            let _: () = conn.expire(&key, RUNNING_TTL_SECS).await.map_err(backend)?;
        } else if prev == JobStatus::Running && next != JobStatus::Running {
            let _: i64 = conn.decr(&key, 1).await.map_err(backend)?;
            let _: () = conn.expire(&key, RUNNING_TTL_SECS).await.map_err(backend)?;
        }
        Ok(())
    }

    /// Scan `job:*` and count records owned by `user_id` in `running`.
    async fn rebuild_running(&self, user_id: &UserId) -> Result<i64, StateError> {
        let mut conn = self.conn.clone();
        let mut keys = Vec::new();
        let mut cursor: u64 = 0;
        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg("job:*")
                .arg("COUNT")
                .arg(100)
                .query_async(&mut conn)
                .await
                .map_err(backend)?;
            keys.extend(batch);
            cursor = next;
            if cursor == 0 {
                break;
            }
        }

        let mut running = 0i64;
        for key in keys {
            let (owner, status): (Option<String>, Option<String>) = redis::cmd("HMGET")
                .arg(&key)
                .arg("user_id")
                .arg("status")
                .query_async(&mut conn)
                .await
                .map_err(backend)?;
            if owner.as_deref() == Some(user_id.as_str())
                && status.as_deref() == Some(JobStatus::Running.as_str())
            {
                running += 1;
            }
        }
        Ok(running)
    }
}

#[async_trait]
impl<C: Clock> JobStateStore for RedisJobStateStore<C> {
    async fn create(
        &self,
        job_id: &JobId,
        submission_id: &SubmissionId,
        user_id: &UserId,
    ) -> Result<(), StateError> {
        let mut conn = self.conn.clone();
        let key = job_key(job_id);
        let now = self.clock.now().to_rfc3339();
        let pairs = [
            ("job_id", job_id.to_string()),
            ("submission_id", submission_id.to_string()),
            ("user_id", user_id.to_string()),
            ("status", JobStatus::Pending.as_str().to_string()),
            ("created_at", now.clone()),
            ("updated_at", now),
        ];
        let _: () = conn.hset_multiple(&key, &pairs).await.map_err(backend)?;
        let _: () = conn.expire(&key, JOB_TTL_SECS).await.map_err(backend)?;
        Ok(())
    }

    async fn update(
        &self,
        job_id: &JobId,
        status: JobStatus,
        fields: UpdateFields,
    ) -> Result<(), StateError> {
        let mut conn = self.conn.clone();
        let key = job_key(job_id);
        let existing: HashMap<String, String> = conn.hgetall(&key).await.map_err(backend)?;
        if existing.is_empty() {
            return Err(StateError::NotFound(job_id.to_string()));
        }
        let record = record_from_hash(job_id, existing)?;

        let mut pairs = vec![
            ("status", status.as_str().to_string()),
            ("updated_at", self.clock.now().to_rfc3339()),
        ];
        if let Some(run_id) = fields.run_id {
            pairs.push(("run_id", run_id));
        }
        if let Some(error) = fields.error {
            pairs.push(("error", error));
        }
        let _: () = conn.hset_multiple(&key, &pairs).await.map_err(backend)?;
        let _: () = conn.expire(&key, JOB_TTL_SECS).await.map_err(backend)?;

        self.adjust_running(&record.user_id, record.status, status)
            .await
    }

    async fn get(&self, job_id: &JobId) -> Result<Option<JobRecord>, StateError> {
        let mut conn = self.conn.clone();
        let hash: HashMap<String, String> =
            conn.hgetall(job_key(job_id)).await.map_err(backend)?;
        if hash.is_empty() {
            return Ok(None);
        }
        record_from_hash(job_id, hash).map(Some)
    }

    async fn count_running(&self, user_id: &UserId) -> Result<i64, StateError> {
        let mut conn = self.conn.clone();
        let key = running_key(user_id);
        let cached: Option<i64> = conn.get(&key).await.map_err(backend)?;
        if let Some(value) = cached {
            return Ok(value.max(0));
        }

        let rebuilt = self.rebuild_running(user_id).await?;
        let _: () = conn
            .set_ex(&key, rebuilt, RUNNING_TTL_SECS as u64)
            .await
            .map_err(backend)?;
        tracing::debug!(user_id = %user_id, running = rebuilt, "running counter rebuilt");
        Ok(rebuilt)
    }
}
