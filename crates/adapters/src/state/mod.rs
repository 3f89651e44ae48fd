// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job state store: per-job records and the per-user running counter.

mod redis;

pub use self::redis::RedisJobStateStore;

use async_trait::async_trait;
use eb_core::{JobId, JobRecord, JobStatus, SubmissionId, UpdateFields, UserId};
use thiserror::Error;

/// Retention for job records (90 days).
pub const JOB_TTL_SECS: i64 = 90 * 24 * 60 * 60;

/// Retention for the per-user running counter (24 hours, refreshed on
/// writes).
pub const RUNNING_TTL_SECS: i64 = 24 * 60 * 60;

/// Errors from state store operations.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("job {0} not found")]
    NotFound(String),
    #[error("corrupt job record for {jid}: {reason}")]
    CorruptRecord { jid: String, reason: String },
    #[error("state backend error: {0}")]
    Backend(String),
}

/// Keyed store of job records with running-counter maintenance.
///
/// The running counter is an optimization; its authoritative form is the
/// count of records in `running` for the user. `update` keeps the counter
/// in step with status transitions, and `count_running` rebuilds it by
/// scanning when the cached value has expired.
#[async_trait]
pub trait JobStateStore: Clone + Send + Sync + 'static {
    /// Create a fresh `pending` record.
    async fn create(
        &self,
        job_id: &JobId,
        submission_id: &SubmissionId,
        user_id: &UserId,
    ) -> Result<(), StateError>;

    /// Set `status`, refresh `updated_at`, merge `fields`, and maintain
    /// the running counter across RUNNING transitions.
    async fn update(
        &self,
        job_id: &JobId,
        status: JobStatus,
        fields: UpdateFields,
    ) -> Result<(), StateError>;

    /// Fetch a record, `None` when absent or expired.
    async fn get(&self, job_id: &JobId) -> Result<Option<JobRecord>, StateError>;

    /// Number of `running` jobs owned by the user, rebuilding the cached
    /// counter when it is missing.
    async fn count_running(&self, user_id: &UserId) -> Result<i64, StateError>;
}

pub(crate) fn job_key(job_id: &JobId) -> String {
    format!("job:{job_id}")
}

pub(crate) fn running_key(user_id: &UserId) -> String {
    format!("running:{user_id}")
}
