// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Read-side use-cases: job status, logs, and tracker result links.

use crate::error::ServiceError;
use eb_adapters::{BundleError, BundleStore, JobStateStore};
use eb_core::{JobId, JobRecord};
use serde::Serialize;

/// Fetch a job's state record.
#[derive(Clone)]
pub struct GetJobStatus<S> {
    state: S,
}

impl<S: JobStateStore> GetJobStatus<S> {
    pub fn new(state: S) -> Self {
        Self { state }
    }

    pub async fn execute(&self, jid: &JobId) -> Result<Option<JobRecord>, ServiceError> {
        Ok(self.state.get(jid).await?)
    }
}

/// Log text response for a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobLogs {
    pub job_id: JobId,
    pub logs: String,
}

/// Fetch a job's log, optionally only the last `tail_lines` lines.
///
/// A missing log file yields empty text rather than an error: the job may
/// simply not have started yet.
#[derive(Clone)]
pub struct GetJobLogs<B> {
    store: B,
}

impl<B: BundleStore> GetJobLogs<B> {
    pub fn new(store: B) -> Self {
        Self { store }
    }

    pub async fn execute(
        &self,
        jid: &JobId,
        tail_lines: Option<usize>,
    ) -> Result<JobLogs, ServiceError> {
        let logs = match self.store.read_logs(jid, tail_lines).await {
            Ok(text) => text,
            Err(BundleError::LogNotFound(_)) => String::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(JobLogs {
            job_id: jid.clone(),
            logs,
        })
    }
}

/// Tracker links for a finished job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobResults {
    pub job_id: JobId,
    pub run_id: Option<String>,
    pub mlflow_ui_link: String,
    pub mlflow_rest_link: String,
}

/// Build tracker links for a job from its recorded run id.
#[derive(Clone)]
pub struct GetJobResults<S> {
    state: S,
    tracking_uri: String,
    experiment_id: String,
}

impl<S: JobStateStore> GetJobResults<S> {
    pub fn new(state: S, tracking_uri: &str, experiment_id: impl Into<String>) -> Self {
        Self {
            state,
            tracking_uri: tracking_uri.trim_end_matches('/').to_string(),
            experiment_id: experiment_id.into(),
        }
    }

    pub async fn execute(&self, jid: &JobId) -> Result<JobResults, ServiceError> {
        let run_id = self
            .state
            .get(jid)
            .await?
            .and_then(|record| record.run_id);
        let run = run_id.as_deref().unwrap_or_default();
        Ok(JobResults {
            job_id: jid.clone(),
            mlflow_ui_link: format!(
                "{}/#/experiments/{}/runs/{run}",
                self.tracking_uri, self.experiment_id
            ),
            mlflow_rest_link: format!(
                "{}/api/2.0/mlflow/runs/get?run_id={run}",
                self.tracking_uri
            ),
            run_id,
        })
    }
}

#[cfg(test)]
#[path = "queries_tests.rs"]
mod tests;
