// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Submission service: create bundles, append files, list files.

use crate::error::ServiceError;
use eb_adapters::{BundleStore, StoredFile};
use eb_core::validate::validate_upload;
use eb_core::{IdGen, SubmissionId, SubmissionMeta, UserId};

/// Default entrypoint when the caller supplies none.
pub const DEFAULT_ENTRYPOINT: &str = "main.py";

/// Default config file when the caller supplies none.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";

/// Accept a new bundle: validate every filename, allocate a fresh
/// submission id, and store files plus metadata.
#[derive(Clone)]
pub struct CreateSubmission<B, I> {
    store: B,
    ids: I,
}

impl<B: BundleStore, I: IdGen> CreateSubmission<B, I> {
    pub fn new(store: B, ids: I) -> Self {
        Self { store, ids }
    }

    pub async fn execute(
        &self,
        user_id: &UserId,
        files: Vec<(String, Vec<u8>)>,
        entrypoint: Option<&str>,
        config_file: Option<&str>,
        metadata: serde_json::Map<String, serde_json::Value>,
    ) -> Result<SubmissionId, ServiceError> {
        let entrypoint = entrypoint.unwrap_or(DEFAULT_ENTRYPOINT);
        let config_file = config_file.unwrap_or(DEFAULT_CONFIG_FILE);

        validate_upload(entrypoint, 0)?;
        validate_upload(config_file, 0)?;
        for (name, payload) in &files {
            validate_upload(name, payload.len() as u64)?;
        }

        let sid = SubmissionId::new(self.ids.next());
        let names = files.iter().map(|(name, _)| name.clone()).collect();
        let meta = SubmissionMeta::new(names, user_id.clone(), entrypoint, config_file)
            .with_extra(metadata);

        self.store.save(&sid, &files, &meta).await?;
        tracing::info!(sid = %sid, user_id = %user_id, files = files.len(), "submission created");
        Ok(sid)
    }
}

/// Append one file to an existing bundle.
#[derive(Clone)]
pub struct AddSubmissionFile<B> {
    store: B,
}

impl<B: BundleStore> AddSubmissionFile<B> {
    pub fn new(store: B) -> Self {
        Self { store }
    }

    pub async fn execute(
        &self,
        sid: &SubmissionId,
        filename: &str,
        payload: &[u8],
        user_id: &UserId,
    ) -> Result<StoredFile, ServiceError> {
        validate_upload(filename, payload.len() as u64)?;
        if !self.store.exists(sid).await {
            return Err(ServiceError::SubmissionNotFound(sid.to_string()));
        }
        let stored = self.store.add_file(sid, filename, payload, user_id).await?;
        tracing::info!(sid = %sid, filename, size = stored.size, "file added to submission");
        Ok(stored)
    }
}

/// List a bundle's files, enforcing ownership.
#[derive(Clone)]
pub struct ListSubmissionFiles<B> {
    store: B,
}

impl<B: BundleStore> ListSubmissionFiles<B> {
    pub fn new(store: B) -> Self {
        Self { store }
    }

    pub async fn execute(
        &self,
        sid: &SubmissionId,
        user_id: &UserId,
    ) -> Result<Vec<StoredFile>, ServiceError> {
        Ok(self.store.list_files(sid, user_id).await?)
    }
}

#[cfg(test)]
#[path = "submissions_tests.rs"]
mod tests;
