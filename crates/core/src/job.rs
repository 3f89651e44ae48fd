// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job identifier, status state machine, and persisted record.

use crate::owner::UserId;
use crate::submission::SubmissionId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

crate::define_id! {
    /// Unique identifier for a job (one execution attempt of a submission).
    ///
    /// 128-bit hex, allocated at admission time. Used to key the state
    /// record, the queue message, the log file, and the artifact directory.
    #[derive(Default)]
    pub struct JobId;
}

/// Lifecycle status of a job.
///
/// Created as `Pending` by admission, moved to `Running` exactly once by a
/// worker on dequeue, then to exactly one of the terminal states. Terminal
/// states are sticky.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    /// Check if this status is terminal (completed or failed).
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for JobStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "running" => Ok(JobStatus::Running),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// Error for unrecognized status strings read back from the state store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown job status: {0}")]
pub struct UnknownStatus(pub String);

/// Persisted state of a single job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub job_id: JobId,
    pub submission_id: SubmissionId,
    pub user_id: UserId,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Tracker run id, set when the job completes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    /// Failure message, set when the job fails.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobRecord {
    /// Create a fresh pending record with both timestamps at `now`.
    pub fn pending(
        job_id: JobId,
        submission_id: SubmissionId,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            job_id,
            submission_id,
            user_id,
            status: JobStatus::Pending,
            created_at: now,
            updated_at: now,
            run_id: None,
            error: None,
        }
    }
}

/// Extra fields merged into a record by a status update.
///
/// `updated_at` is deliberately absent: the store always stamps it itself
/// and callers cannot override it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateFields {
    pub run_id: Option<String>,
    pub error: Option<String>,
}

impl UpdateFields {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn run_id(id: impl Into<String>) -> Self {
        Self {
            run_id: Some(id.into()),
            ..Self::default()
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
