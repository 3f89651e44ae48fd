// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! MLflow tracking server backend, over its REST API.
//!
//! Endpoints used: `runs/create`, `runs/log-batch`, `runs/update`, and the
//! `mlflow-artifacts` upload route. The run id returned by `runs/create`
//! is latched as the current run until `end_run`.

use super::{Tracker, TrackerError};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

/// Tracker backed by an MLflow server.
#[derive(Clone)]
pub struct MlflowTracker {
    http: reqwest::Client,
    base: String,
    experiment_id: String,
    current_run: Arc<Mutex<Option<String>>>,
}

fn http_err(e: reqwest::Error) -> TrackerError {
    TrackerError::Http(e.to_string())
}

/// Render a scalar param value the way the tracker expects: strings bare,
/// everything else in its JSON form.
fn param_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl MlflowTracker {
    pub fn new(tracking_uri: &str, experiment_id: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base: tracking_uri.trim_end_matches('/').to_string(),
            experiment_id: experiment_id.into(),
            current_run: Arc::new(Mutex::new(None)),
        }
    }

    fn current(&self) -> Result<String, TrackerError> {
        self.current_run
            .lock()
            .clone()
            .ok_or(TrackerError::NoActiveRun)
    }

    async fn post(
        &self,
        endpoint: &str,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, TrackerError> {
        let url = format!("{}/api/2.0/mlflow/{endpoint}", self.base);
        let resp = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(http_err)?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(TrackerError::Protocol(format!("{endpoint}: {status}: {text}")));
        }
        resp.json().await.map_err(http_err)
    }

    async fn upload_file(&self, run_id: &str, rel: &str, path: &Path) -> Result<(), TrackerError> {
        let bytes = std::fs::read(path).map_err(|e| TrackerError::Http(e.to_string()))?;
        let url = format!(
            "{}/api/2.0/mlflow-artifacts/artifacts/{}/{}/artifacts/{}",
            self.base, self.experiment_id, run_id, rel
        );
        let resp = self
            .http
            .put(&url)
            .body(bytes)
            .send()
            .await
            .map_err(http_err)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(TrackerError::Protocol(format!("artifact {rel}: {status}")));
        }
        Ok(())
    }

    /// Recursively upload every regular file under `dir`.
    async fn upload_dir(
        &self,
        run_id: &str,
        prefix: &str,
        dir: &Path,
    ) -> Result<(), TrackerError> {
        let entries = std::fs::read_dir(dir).map_err(|e| TrackerError::Http(e.to_string()))?;
        for entry in entries {
            let entry = entry.map_err(|e| TrackerError::Http(e.to_string()))?;
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().into_owned();
            let rel = if prefix.is_empty() {
                name
            } else {
                format!("{prefix}/{name}")
            };
            if path.is_dir() {
                Box::pin(self.upload_dir(run_id, &rel, &path)).await?;
            } else {
                self.upload_file(run_id, &rel, &path).await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Tracker for MlflowTracker {
    async fn start_run(&self, run_name: &str) -> Result<String, TrackerError> {
        let body = serde_json::json!({
            "experiment_id": self.experiment_id,
            "run_name": run_name,
            "start_time": Utc::now().timestamp_millis(),
        });
        let resp = self.post("runs/create", &body).await?;
        let run_id = resp
            .pointer("/run/info/run_id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| TrackerError::Protocol("runs/create: missing run_id".to_string()))?
            .to_string();
        *self.current_run.lock() = Some(run_id.clone());
        tracing::debug!(run_id, run_name, "tracker run started");
        Ok(run_id)
    }

    async fn log_params(
        &self,
        params: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<(), TrackerError> {
        let run_id = self.current()?;
        let entries: Vec<serde_json::Value> = params
            .iter()
            .map(|(k, v)| serde_json::json!({"key": k, "value": param_value(v)}))
            .collect();
        let body = serde_json::json!({"run_id": run_id, "params": entries});
        self.post("runs/log-batch", &body).await?;
        Ok(())
    }

    async fn log_metrics(&self, metrics: &BTreeMap<String, f64>) -> Result<(), TrackerError> {
        let run_id = self.current()?;
        let timestamp = Utc::now().timestamp_millis();
        let entries: Vec<serde_json::Value> = metrics
            .iter()
            .map(|(k, v)| {
                serde_json::json!({"key": k, "value": v, "timestamp": timestamp, "step": 0})
            })
            .collect();
        let body = serde_json::json!({"run_id": run_id, "metrics": entries});
        self.post("runs/log-batch", &body).await?;
        Ok(())
    }

    async fn log_artifact(&self, local_path: &Path) -> Result<(), TrackerError> {
        let run_id = self.current()?;
        self.upload_dir(&run_id, "", local_path).await
    }

    async fn end_run(&self) -> Result<String, TrackerError> {
        let run_id = self.current()?;
        let body = serde_json::json!({
            "run_id": run_id,
            "status": "FINISHED",
            "end_time": Utc::now().timestamp_millis(),
        });
        self.post("runs/update", &body).await?;
        *self.current_run.lock() = None;
        tracing::debug!(run_id, "tracker run finished");
        Ok(run_id)
    }
}

#[cfg(test)]
#[path = "mlflow_tests.rs"]
mod tests;
