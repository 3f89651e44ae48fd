// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Experiment tracker: records run lifecycle, params, metrics, artifacts.

mod mlflow;

pub use mlflow::MlflowTracker;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeTracker, TrackerCall};

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

/// Errors from tracker operations.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("request failed: {0}")]
    Http(String),
    #[error("unexpected response: {0}")]
    Protocol(String),
    #[error("no active run")]
    NoActiveRun,
}

/// Recorder for experiment runs.
///
/// The only ordering contract callers rely on is
/// `start_run → (log_params | log_metrics | log_artifact)* → end_run`,
/// with `end_run` returning the run id. A single current run exists per
/// adapter; callers must serialize.
#[async_trait]
pub trait Tracker: Clone + Send + Sync + 'static {
    /// Begin a run and make it current. Returns the run id.
    async fn start_run(&self, run_name: &str) -> Result<String, TrackerError>;

    /// Record hyperparameters on the current run.
    async fn log_params(
        &self,
        params: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<(), TrackerError>;

    /// Record metrics on the current run.
    async fn log_metrics(&self, metrics: &BTreeMap<String, f64>) -> Result<(), TrackerError>;

    /// Upload a local directory as the current run's artifacts.
    async fn log_artifact(&self, local_path: &Path) -> Result<(), TrackerError>;

    /// Finish the current run, returning its run id.
    async fn end_run(&self) -> Result<String, TrackerError>;
}
