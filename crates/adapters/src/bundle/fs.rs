// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Filesystem bundle store.
//!
//! Layout:
//!
//! ```text
//! SUBMISSIONS_ROOT/<sid>/metadata.json
//! SUBMISSIONS_ROOT/<sid>/<file>...
//! LOGS_ROOT/<jid>.log
//! ```
//!
//! Crash safety for incremental uploads comes from advisory locks on
//! `metadata.json` plus temp-file-then-rename for payloads: after a crash
//! mid-append, the new file is either present and listed, or neither.
//!
//! `fs2` locks block with no deadline, so every lock-holding section runs
//! on the blocking pool via `spawn_blocking` rather than inline on an
//! async worker.

use super::{tail_lines, BundleError, BundleStore, StoredFile};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use eb_core::validate::validate_basename;
use eb_core::{JobId, SubmissionId, SubmissionMeta, UserId};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

const METADATA_FILE: &str = "metadata.json";

/// Bundle store rooted at a submissions directory with a sibling logs
/// directory.
#[derive(Debug, Clone)]
pub struct FsBundleStore {
    submissions_root: PathBuf,
    logs_root: PathBuf,
}

/// Releases the advisory lock when the scope ends. The lock would also be
/// released on close; the guard keeps the unlock point explicit.
struct LockGuard<'a> {
    file: &'a File,
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        let _ = FileExt::unlock(self.file);
    }
}

impl FsBundleStore {
    pub fn new(
        submissions_root: impl Into<PathBuf>,
        logs_root: impl Into<PathBuf>,
    ) -> std::io::Result<Self> {
        let submissions_root = submissions_root.into();
        let logs_root = logs_root.into();
        std::fs::create_dir_all(&submissions_root)?;
        std::fs::create_dir_all(&logs_root)?;
        Ok(Self {
            submissions_root,
            logs_root,
        })
    }

    fn dir(&self, sid: &SubmissionId) -> PathBuf {
        self.submissions_root.join(sid.as_str())
    }

    /// Path of a job's log file.
    pub fn log_path(&self, jid: &JobId) -> PathBuf {
        self.logs_root.join(format!("{jid}.log"))
    }

    fn corrupt(sid: &SubmissionId, err: impl std::fmt::Display) -> BundleError {
        BundleError::CorruptMetadata {
            sid: sid.to_string(),
            reason: err.to_string(),
        }
    }

    fn read_meta_locked(mut file: &File, sid: &SubmissionId) -> Result<SubmissionMeta, BundleError> {
        let mut text = String::new();
        file.read_to_string(&mut text)?;
        serde_json::from_str(&text).map_err(|e| Self::corrupt(sid, e))
    }

    /// Rewrite the metadata file in place through the locked handle and
    /// fsync. Writing through the same inode keeps the held lock valid for
    /// the whole update.
    fn rewrite_meta_locked(mut file: &File, bytes: &[u8]) -> std::io::Result<()> {
        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        file.write_all(bytes)?;
        file.sync_all()
    }

    /// Write `bytes` to a temp file in `dir`, fsync, then atomically
    /// rename onto `target`.
    fn write_via_rename(dir: &Path, target: &Path, bytes: &[u8]) -> std::io::Result<()> {
        let tmp = dir.join(format!(".tmp-{}", uuid::Uuid::new_v4().simple()));
        let result = (|| {
            let mut f = File::create(&tmp)?;
            f.write_all(bytes)?;
            f.sync_all()?;
            std::fs::rename(&tmp, target)
        })();
        if result.is_err() {
            let _ = std::fs::remove_file(&tmp);
        }
        result
    }

    fn modified_at(path: &Path) -> Result<DateTime<Utc>, BundleError> {
        let mtime = std::fs::metadata(path)?.modified()?;
        Ok(DateTime::<Utc>::from(mtime))
    }

    fn add_file_blocking(
        &self,
        sid: &SubmissionId,
        filename: &str,
        payload: &[u8],
        user_id: &UserId,
    ) -> Result<StoredFile, BundleError> {
        let dir = self.dir(sid);
        let meta_path = dir.join(METADATA_FILE);
        if !meta_path.is_file() {
            return Err(BundleError::NotFound(sid.to_string()));
        }

        let meta_file = OpenOptions::new().read(true).write(true).open(&meta_path)?;
        meta_file.lock_exclusive()?;
        let _guard = LockGuard { file: &meta_file };

        let mut meta = Self::read_meta_locked(&meta_file, sid)?;
        if meta.user_id != *user_id {
            return Err(BundleError::NotOwner(sid.to_string()));
        }
        if meta.contains(filename) {
            return Err(BundleError::Duplicate(filename.to_string()));
        }

        let target = dir.join(filename);
        Self::write_via_rename(&dir, &target, payload)?;

        meta.files.push(filename.to_string());
        let bytes = serde_json::to_vec(&meta).map_err(|e| Self::corrupt(sid, e))?;
        if let Err(e) = Self::rewrite_meta_locked(&meta_file, &bytes) {
            // Metadata update failed: the payload must not stay behind
            // unlisted.
            let _ = std::fs::remove_file(&target);
            return Err(e.into());
        }

        let uploaded_at = Self::modified_at(&target)?;
        tracing::debug!(sid = %sid, filename, size = payload.len(), "file appended");
        Ok(StoredFile {
            filename: filename.to_string(),
            size: payload.len() as u64,
            uploaded_at,
        })
    }

    fn list_files_blocking(
        &self,
        sid: &SubmissionId,
        user_id: &UserId,
    ) -> Result<Vec<StoredFile>, BundleError> {
        let dir = self.dir(sid);
        let meta_path = dir.join(METADATA_FILE);
        if !meta_path.is_file() {
            return Err(BundleError::NotFound(sid.to_string()));
        }

        let meta_file = File::open(&meta_path)?;
        meta_file.lock_shared()?;
        let _guard = LockGuard { file: &meta_file };
        let meta = Self::read_meta_locked(&meta_file, sid)?;

        if meta.user_id != *user_id {
            return Err(BundleError::NotOwner(sid.to_string()));
        }

        let mut entries = Vec::with_capacity(meta.files.len());
        for name in &meta.files {
            let path = dir.join(name);
            let Ok(stat) = std::fs::metadata(&path) else {
                // Listed but absent on disk: skip rather than fail the
                // whole listing.
                continue;
            };
            entries.push(StoredFile {
                filename: name.clone(),
                size: stat.len(),
                uploaded_at: DateTime::<Utc>::from(stat.modified()?),
            });
        }
        Ok(entries)
    }

    fn metadata_blocking(&self, sid: &SubmissionId) -> Result<SubmissionMeta, BundleError> {
        let meta_path = self.dir(sid).join(METADATA_FILE);
        if !meta_path.is_file() {
            return Err(BundleError::NotFound(sid.to_string()));
        }
        let meta_file = File::open(&meta_path)?;
        meta_file.lock_shared()?;
        let _guard = LockGuard { file: &meta_file };
        Self::read_meta_locked(&meta_file, sid)
    }
}

/// Run a lock-holding filesystem section on the blocking pool; the lock
/// wait has no deadline of its own and must not stall an async worker.
async fn run_blocking<T, F>(f: F) -> Result<T, BundleError>
where
    F: FnOnce() -> Result<T, BundleError> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(result) => result,
        Err(e) => Err(BundleError::Io(std::io::Error::other(e))),
    }
}

#[async_trait]
impl BundleStore for FsBundleStore {
    async fn save(
        &self,
        sid: &SubmissionId,
        files: &[(String, Vec<u8>)],
        meta: &SubmissionMeta,
    ) -> Result<(), BundleError> {
        let dir = self.dir(sid);
        std::fs::create_dir_all(&dir)?;

        for (name, payload) in files {
            validate_basename(name)?;
            std::fs::write(dir.join(name), payload)?;
        }

        // Metadata last: a bundle without metadata.json is not yet visible.
        let bytes = serde_json::to_vec(meta).map_err(|e| Self::corrupt(sid, e))?;
        Self::write_via_rename(&dir, &dir.join(METADATA_FILE), &bytes)?;
        tracing::debug!(sid = %sid, files = files.len(), "bundle stored");
        Ok(())
    }

    async fn add_file(
        &self,
        sid: &SubmissionId,
        filename: &str,
        payload: &[u8],
        user_id: &UserId,
    ) -> Result<StoredFile, BundleError> {
        validate_basename(filename)?;
        let store = self.clone();
        let sid = sid.clone();
        let filename = filename.to_string();
        let payload = payload.to_vec();
        let user_id = user_id.clone();
        run_blocking(move || store.add_file_blocking(&sid, &filename, &payload, &user_id)).await
    }

    async fn list_files(
        &self,
        sid: &SubmissionId,
        user_id: &UserId,
    ) -> Result<Vec<StoredFile>, BundleError> {
        let store = self.clone();
        let sid = sid.clone();
        let user_id = user_id.clone();
        run_blocking(move || store.list_files_blocking(&sid, &user_id)).await
    }

    async fn metadata(&self, sid: &SubmissionId) -> Result<SubmissionMeta, BundleError> {
        let store = self.clone();
        let sid = sid.clone();
        run_blocking(move || store.metadata_blocking(&sid)).await
    }

    async fn exists(&self, sid: &SubmissionId) -> bool {
        self.dir(sid).is_dir()
    }

    async fn submission_dir(&self, sid: &SubmissionId) -> Result<PathBuf, BundleError> {
        let dir = self.dir(sid);
        if !dir.is_dir() {
            return Err(BundleError::NotFound(sid.to_string()));
        }
        Ok(dir)
    }

    async fn validate_entrypoint(&self, sid: &SubmissionId, entrypoint: &str) -> bool {
        validate_basename(entrypoint).is_ok()
            && entrypoint.ends_with(".py")
            && self.dir(sid).join(entrypoint).is_file()
    }

    async fn contains_file(&self, sid: &SubmissionId, name: &str) -> bool {
        validate_basename(name).is_ok() && self.dir(sid).join(name).is_file()
    }

    async fn read_logs(&self, jid: &JobId, tail: Option<usize>) -> Result<String, BundleError> {
        let path = self.log_path(jid);
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(BundleError::LogNotFound(jid.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        Ok(match tail {
            Some(n) => tail_lines(&text, n),
            None => text,
        })
    }
}

#[cfg(test)]
#[path = "fs_tests.rs"]
mod tests;
