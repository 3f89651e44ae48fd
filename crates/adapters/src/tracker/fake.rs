// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recording fake tracker with scripted failures.

use super::{Tracker, TrackerError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// One recorded tracker invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackerCall {
    StartRun(String),
    LogParams(Vec<(String, String)>),
    LogMetrics(BTreeMap<String, f64>),
    LogArtifact(PathBuf),
    EndRun,
}

#[derive(Default)]
struct Inner {
    calls: Vec<TrackerCall>,
    current_run: Option<String>,
    run_counter: u64,
    fail_op: Option<(&'static str, String)>,
}

/// In-memory tracker that records calls and can fail a chosen operation.
#[derive(Clone, Default)]
pub struct FakeTracker {
    inner: Arc<Mutex<Inner>>,
}

impl FakeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the named operation (`start_run`, `log_params`, `log_metrics`,
    /// `log_artifact`, `end_run`) fail with `message`.
    pub fn fail_on(&self, op: &'static str, message: impl Into<String>) {
        self.inner.lock().fail_op = Some((op, message.into()));
    }

    /// All recorded calls so far.
    pub fn calls(&self) -> Vec<TrackerCall> {
        self.inner.lock().calls.clone()
    }

    fn check_failure(&self, op: &str) -> Result<(), TrackerError> {
        let inner = self.inner.lock();
        if let Some((fail_op, message)) = &inner.fail_op {
            if *fail_op == op {
                return Err(TrackerError::Http(message.clone()));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Tracker for FakeTracker {
    async fn start_run(&self, run_name: &str) -> Result<String, TrackerError> {
        self.check_failure("start_run")?;
        let mut inner = self.inner.lock();
        inner.run_counter += 1;
        let run_id = format!("run-{}", inner.run_counter);
        inner.current_run = Some(run_id.clone());
        inner.calls.push(TrackerCall::StartRun(run_name.to_string()));
        Ok(run_id)
    }

    async fn log_params(
        &self,
        params: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<(), TrackerError> {
        self.check_failure("log_params")?;
        let mut inner = self.inner.lock();
        if inner.current_run.is_none() {
            return Err(TrackerError::NoActiveRun);
        }
        let rendered = params
            .iter()
            .map(|(k, v)| (k.clone(), v.to_string()))
            .collect();
        inner.calls.push(TrackerCall::LogParams(rendered));
        Ok(())
    }

    async fn log_metrics(&self, metrics: &BTreeMap<String, f64>) -> Result<(), TrackerError> {
        self.check_failure("log_metrics")?;
        let mut inner = self.inner.lock();
        if inner.current_run.is_none() {
            return Err(TrackerError::NoActiveRun);
        }
        inner.calls.push(TrackerCall::LogMetrics(metrics.clone()));
        Ok(())
    }

    async fn log_artifact(&self, local_path: &Path) -> Result<(), TrackerError> {
        self.check_failure("log_artifact")?;
        let mut inner = self.inner.lock();
        if inner.current_run.is_none() {
            return Err(TrackerError::NoActiveRun);
        }
        inner
            .calls
            .push(TrackerCall::LogArtifact(local_path.to_path_buf()));
        Ok(())
    }

    async fn end_run(&self) -> Result<String, TrackerError> {
        self.check_failure("end_run")?;
        let mut inner = self.inner.lock();
        let run_id = inner.current_run.take().ok_or(TrackerError::NoActiveRun)?;
        inner.calls.push(TrackerCall::EndRun);
        Ok(run_id)
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
