// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bundle store: submission content and metadata.

mod fs;

pub use fs::FsBundleStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use eb_core::{JobId, NameError, SubmissionId, SubmissionMeta, UserId};
use std::path::PathBuf;
use thiserror::Error;

/// Errors from bundle store operations.
#[derive(Debug, Error)]
pub enum BundleError {
    #[error("submission {0} not found")]
    NotFound(String),
    #[error("log for job {0} not found")]
    LogNotFound(String),
    #[error("not the owner of submission {0}")]
    NotOwner(String),
    #[error("file {0} already exists in submission")]
    Duplicate(String),
    #[error(transparent)]
    InvalidName(#[from] NameError),
    #[error("corrupt metadata for submission {sid}: {reason}")]
    CorruptMetadata { sid: String, reason: String },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// A file entry as reported by `list_files`.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct StoredFile {
    pub filename: String,
    pub size: u64,
    pub uploaded_at: DateTime<Utc>,
}

/// Store for submission bundles and job logs.
///
/// A bundle is a directory of uploaded files plus `metadata.json`. Writers
/// hold an exclusive advisory lock on the metadata file, readers a shared
/// one; payloads land via temp-file-then-rename so a crash mid-append
/// leaves the bundle either fully extended or unchanged.
#[async_trait]
pub trait BundleStore: Clone + Send + Sync + 'static {
    /// Store a fresh bundle: all payload files first, `metadata.json` last.
    async fn save(
        &self,
        sid: &SubmissionId,
        files: &[(String, Vec<u8>)],
        meta: &SubmissionMeta,
    ) -> Result<(), BundleError>;

    /// Append one file to an existing bundle.
    async fn add_file(
        &self,
        sid: &SubmissionId,
        filename: &str,
        payload: &[u8],
        user_id: &UserId,
    ) -> Result<StoredFile, BundleError>;

    /// List the bundle's files that exist on disk, enforcing ownership.
    async fn list_files(
        &self,
        sid: &SubmissionId,
        user_id: &UserId,
    ) -> Result<Vec<StoredFile>, BundleError>;

    /// Read the bundle's metadata.
    async fn metadata(&self, sid: &SubmissionId) -> Result<SubmissionMeta, BundleError>;

    /// Whether a bundle directory exists for `sid`.
    async fn exists(&self, sid: &SubmissionId) -> bool;

    /// Resolve the bundle's directory.
    async fn submission_dir(&self, sid: &SubmissionId) -> Result<PathBuf, BundleError>;

    /// True iff `entrypoint` is a safe relative `.py` path that exists in
    /// the bundle.
    async fn validate_entrypoint(&self, sid: &SubmissionId, entrypoint: &str) -> bool;

    /// True iff `name` resolves to a regular file inside the bundle.
    async fn contains_file(&self, sid: &SubmissionId, name: &str) -> bool;

    /// Read a job's log, optionally only the last `tail` lines.
    async fn read_logs(&self, jid: &JobId, tail: Option<usize>) -> Result<String, BundleError>;
}

/// Return the last `n` newline-counted lines of `text`.
pub(crate) fn tail_lines(text: &str, n: usize) -> String {
    if n == 0 {
        return String::new();
    }
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].join("\n")
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
