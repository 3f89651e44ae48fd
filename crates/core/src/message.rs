// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Queue message published at admission and consumed by workers.

use crate::job::JobId;
use crate::submission::SubmissionId;
use serde::{Deserialize, Serialize};

/// Payload carried through the job queue.
///
/// `config` is the caller's free-form map, passed through untouched. The
/// worker interprets only `resource_class`; everything else is opaque.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueMessage {
    pub job_id: JobId,
    pub submission_id: SubmissionId,
    pub entrypoint: String,
    pub config_file: String,
    #[serde(default)]
    pub config: serde_json::Map<String, serde_json::Value>,
}

impl QueueMessage {
    /// The `resource_class` entry of `config`, when present and a string.
    pub fn resource_class(&self) -> Option<&str> {
        self.config.get("resource_class")?.as_str()
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
