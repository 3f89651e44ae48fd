// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Submission identifier and bundle metadata.

use crate::owner::UserId;
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for a submission bundle.
    ///
    /// 128-bit hex. Names the directory holding the bundle's files and
    /// `metadata.json` under the submissions root.
    #[derive(Default)]
    pub struct SubmissionId;
}

fn default_entrypoint() -> String {
    "main.py".to_string()
}

fn default_config_file() -> String {
    "config.yaml".to_string()
}

/// Contents of a bundle's `metadata.json`.
///
/// `files` is the authoritative list of stored filenames (basenames only).
/// Caller-supplied metadata keys ride along in `extra` and round-trip
/// through serialization untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionMeta {
    pub files: Vec<String>,
    pub user_id: UserId,
    #[serde(default = "default_entrypoint")]
    pub entrypoint: String,
    #[serde(default = "default_config_file")]
    pub config_file: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl SubmissionMeta {
    pub fn new(
        files: Vec<String>,
        user_id: UserId,
        entrypoint: impl Into<String>,
        config_file: impl Into<String>,
    ) -> Self {
        Self {
            files,
            user_id,
            entrypoint: entrypoint.into(),
            config_file: config_file.into(),
            extra: serde_json::Map::new(),
        }
    }

    pub fn with_extra(mut self, extra: serde_json::Map<String, serde_json::Value>) -> Self {
        self.extra = extra;
        self
    }

    /// Check whether `name` is listed in the bundle.
    pub fn contains(&self, name: &str) -> bool {
        self.files.iter().any(|f| f == name)
    }
}

#[cfg(test)]
#[path = "submission_tests.rs"]
mod tests;
