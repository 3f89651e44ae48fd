// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Filename and payload validation shared by the submission service and
//! the bundle store.
//!
//! Every filename is sanitized before any path join: it must be a plain
//! basename (no separator, no `..` component), carry an accepted suffix,
//! and the payload must fit the size cap.

use std::path::{Component, Path};
use thiserror::Error;

/// Maximum accepted payload size per file (100 MiB).
pub const MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Accepted filename suffixes for uploads.
pub const ALLOWED_SUFFIXES: [&str; 4] = [".py", ".yaml", ".zip", ".tar.gz"];

/// Errors from filename/payload validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameError {
    #[error("invalid filename: {0}")]
    Unsafe(String),
    #[error("file extension not allowed: {0}")]
    Suffix(String),
    #[error("file size {size} exceeds maximum {max}")]
    TooLarge { size: u64, max: u64 },
}

/// Check that a relative path is safe to join under a bundle directory:
/// not absolute and free of `..` components.
pub fn is_safe_relative(path: &str) -> bool {
    if path.is_empty() || path.starts_with('/') {
        return false;
    }
    Path::new(path)
        .components()
        .all(|c| !matches!(c, Component::ParentDir | Component::RootDir))
}

/// Check that a filename carries one of the accepted suffixes.
pub fn has_allowed_suffix(name: &str) -> bool {
    ALLOWED_SUFFIXES.iter().any(|suffix| name.ends_with(suffix))
}

/// Validate that `name` is a plain basename: non-empty, no separator
/// anywhere, no `..`.
pub fn validate_basename(name: &str) -> Result<(), NameError> {
    if name.is_empty() || name.contains('/') || name.contains("..") {
        return Err(NameError::Unsafe(name.to_string()));
    }
    Ok(())
}

/// Full validation for an uploaded file: basename, suffix, and size.
pub fn validate_upload(name: &str, size: u64) -> Result<(), NameError> {
    validate_basename(name)?;
    if !has_allowed_suffix(name) {
        return Err(NameError::Suffix(name.to_string()));
    }
    if size > MAX_FILE_SIZE {
        return Err(NameError::TooLarge {
            size,
            max: MAX_FILE_SIZE,
        });
    }
    Ok(())
}

#[cfg(test)]
#[path = "validate_tests.rs"]
mod tests;
