// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced adapter wrappers for consistent observability

use crate::tracker::{Tracker, TrackerError};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::Instrument;

/// Wrapper that adds tracing to any Tracker
#[derive(Clone)]
pub struct TracedTracker<T> {
    inner: T,
}

impl<T> TracedTracker<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<T: Tracker> Tracker for TracedTracker<T> {
    async fn start_run(&self, run_name: &str) -> Result<String, TrackerError> {
        async {
            let start = std::time::Instant::now();
            let result = self.inner.start_run(run_name).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;
            match &result {
                Ok(run_id) => tracing::info!(run_id, elapsed_ms, "run started"),
                Err(e) => tracing::error!(elapsed_ms, error = %e, "start_run failed"),
            }
            result
        }
        .instrument(tracing::info_span!("tracker.start_run", run_name))
        .await
    }

    async fn log_params(
        &self,
        params: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<(), TrackerError> {
        let result = self
            .inner
            .log_params(params)
            .instrument(tracing::info_span!("tracker.log_params", count = params.len()))
            .await;
        if let Err(ref e) = result {
            tracing::error!(error = %e, "log_params failed");
        }
        result
    }

    async fn log_metrics(&self, metrics: &BTreeMap<String, f64>) -> Result<(), TrackerError> {
        let result = self
            .inner
            .log_metrics(metrics)
            .instrument(tracing::info_span!("tracker.log_metrics", count = metrics.len()))
            .await;
        if let Err(ref e) = result {
            tracing::error!(error = %e, "log_metrics failed");
        }
        result
    }

    async fn log_artifact(&self, local_path: &Path) -> Result<(), TrackerError> {
        let result = self
            .inner
            .log_artifact(local_path)
            .instrument(tracing::info_span!(
                "tracker.log_artifact",
                path = %local_path.display()
            ))
            .await;
        if let Err(ref e) = result {
            tracing::error!(error = %e, "log_artifact failed");
        }
        result
    }

    async fn end_run(&self) -> Result<String, TrackerError> {
        async {
            let result = self.inner.end_run().await;
            match &result {
                Ok(run_id) => tracing::info!(run_id, "run finished"),
                Err(e) => tracing::error!(error = %e, "end_run failed"),
            }
            result
        }
        .instrument(tracing::info_span!("tracker.end_run"))
        .await
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
