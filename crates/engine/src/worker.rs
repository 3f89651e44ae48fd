// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job worker: consumes the queue and executes jobs as child processes.
//!
//! Per job: mark running, spawn the bundle's entrypoint under the
//! configured interpreter with stdout/stderr merged into the job's log
//! file, enforce the resource-class timeout, ingest `metrics.json`, and
//! record the run with the tracker. Every failure mode lands in a single
//! recording site, so a job's terminal status is written exactly once.

use eb_adapters::{BundleStore, JobQueue, JobStateStore, Tracker, TrackerError};
use eb_core::validate::is_safe_relative;
use eb_core::{JobId, JobStatus, MetricsDocument, QueueMessage, UpdateFields};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tokio::sync::Notify;

/// Default blocking-pop timeout for the dequeue loop.
pub const DEFAULT_DEQUEUE_TIMEOUT: Duration = Duration::from_secs(30);

/// Resource class assumed when the job's config names none (or an unknown
/// one).
pub const DEFAULT_RESOURCE_CLASS: &str = "small";

const SMALL_TIMEOUT: Duration = Duration::from_secs(30 * 60);
const MEDIUM_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// Lines of log tail used for child failure messages.
const ERROR_TAIL_LINES: usize = 10;

/// Failure taxonomy of a single job execution.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("invalid file path: {0}")]
    BadPath(String),
    #[error("timeout after {} seconds", .0.as_secs_f64())]
    Timeout(Duration),
    #[error("out of memory")]
    OutOfMemory,
    #[error("exit {0}")]
    Exit(i32),
    #[error("terminated by signal")]
    Killed,
    #[error("{0}")]
    ChildOutput(String),
    #[error("metrics.json missing from job output")]
    MetricsMissing,
    #[error("invalid metrics document: {0}")]
    MetricsInvalid(String),
    #[error("MLflow recording failed: {0}")]
    Tracker(String),
    #[error("state store error: {0}")]
    State(String),
    #[error("submission unavailable: {0}")]
    Bundle(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Cooperative stop flag shared by a worker pool.
///
/// Raising it interrupts each worker's dequeue wait at its next blocking
/// boundary; an in-flight job always runs to completion.
#[derive(Default)]
pub struct StopSignal {
    stopped: AtomicBool,
    notify: Notify,
}

impl StopSignal {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn raise(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_raised(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Resolve when the signal is raised. A raise that races with waiter
    /// registration is caught by the flag check on the next loop turn,
    /// within one dequeue timeout.
    pub async fn notified(&self) {
        if self.is_raised() {
            return;
        }
        self.notify.notified().await;
    }
}

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub artifacts_root: PathBuf,
    pub logs_root: PathBuf,
    /// Interpreter program for bundle entrypoints.
    pub interpreter: String,
    pub dequeue_timeout: Duration,
    /// Wall-clock limit per resource class; `None` means unlimited.
    pub resource_timeouts: HashMap<String, Option<Duration>>,
}

impl WorkerConfig {
    pub fn new(artifacts_root: impl Into<PathBuf>, logs_root: impl Into<PathBuf>) -> Self {
        Self {
            artifacts_root: artifacts_root.into(),
            logs_root: logs_root.into(),
            interpreter: "python3".to_string(),
            dequeue_timeout: DEFAULT_DEQUEUE_TIMEOUT,
            resource_timeouts: Self::default_resource_timeouts(),
        }
    }

    pub fn default_resource_timeouts() -> HashMap<String, Option<Duration>> {
        HashMap::from([
            ("small".to_string(), Some(SMALL_TIMEOUT)),
            ("medium".to_string(), Some(MEDIUM_TIMEOUT)),
            ("unlimited".to_string(), None),
        ])
    }

    /// Wall-clock limit for a job, falling back to the default class for
    /// unknown or absent resource classes.
    pub fn timeout_for(&self, resource_class: Option<&str>) -> Option<Duration> {
        let class = resource_class.unwrap_or(DEFAULT_RESOURCE_CLASS);
        match self.resource_timeouts.get(class) {
            Some(limit) => *limit,
            None => self
                .resource_timeouts
                .get(DEFAULT_RESOURCE_CLASS)
                .copied()
                .unwrap_or(Some(SMALL_TIMEOUT)),
        }
    }
}

/// Long-lived queue consumer executing jobs one at a time.
pub struct JobWorker<Q, S, B, T> {
    queue: Q,
    state: S,
    store: B,
    tracker: T,
    config: WorkerConfig,
    stop: Arc<StopSignal>,
}

impl<Q, S, B, T> JobWorker<Q, S, B, T>
where
    Q: JobQueue,
    S: JobStateStore,
    B: BundleStore,
    T: Tracker,
{
    pub fn new(
        queue: Q,
        state: S,
        store: B,
        tracker: T,
        config: WorkerConfig,
        stop: Arc<StopSignal>,
    ) -> Self {
        Self {
            queue,
            state,
            store,
            tracker,
            config,
            stop,
        }
    }

    /// Consume the queue until the stop signal is raised.
    pub async fn run(&self) {
        if let Err(e) = std::fs::create_dir_all(&self.config.artifacts_root) {
            tracing::error!(error = %e, "failed to create artifacts root");
        }
        if let Err(e) = std::fs::create_dir_all(&self.config.logs_root) {
            tracing::error!(error = %e, "failed to create logs root");
        }
        tracing::info!("job worker started");

        while !self.stop.is_raised() {
            let msg = tokio::select! {
                _ = self.stop.notified() => break,
                popped = self.queue.dequeue(self.config.dequeue_timeout) => match popped {
                    Ok(Some(msg)) => msg,
                    Ok(None) => continue,
                    Err(e) => {
                        tracing::error!(error = %e, "dequeue failed");
                        tokio::time::sleep(Duration::from_secs(1)).await;
                        continue;
                    }
                },
            };
            self.process(msg).await;
        }
        tracing::info!("job worker stopped");
    }

    /// Execute one job and record its terminal status exactly once.
    async fn process(&self, msg: QueueMessage) {
        let jid = msg.job_id.clone();
        tracing::info!(jid = %jid, sid = %msg.submission_id, "job dequeued");
        match self.execute(&msg).await {
            Ok(run_id) => {
                match self
                    .state
                    .update(
                        &jid,
                        JobStatus::Completed,
                        UpdateFields::run_id(run_id.clone()),
                    )
                    .await
                {
                    Ok(()) => tracing::info!(jid = %jid, run_id, "job completed"),
                    Err(e) => tracing::error!(jid = %jid, error = %e, "failed to record completion"),
                }
            }
            Err(err) => {
                let message = err.to_string();
                if let Err(e) = self
                    .state
                    .update(&jid, JobStatus::Failed, UpdateFields::error(message.clone()))
                    .await
                {
                    tracing::error!(jid = %jid, error = %e, "failed to record failure");
                }
                tracing::warn!(jid = %jid, error = message, "job failed");
            }
        }
    }

    async fn execute(&self, msg: &QueueMessage) -> Result<String, WorkerError> {
        let jid = &msg.job_id;
        self.state
            .update(jid, JobStatus::Running, UpdateFields::none())
            .await
            .map_err(|e| WorkerError::State(e.to_string()))?;

        let bundle_dir = self
            .store
            .submission_dir(&msg.submission_id)
            .await
            .map_err(|e| WorkerError::Bundle(e.to_string()))?;

        if !is_safe_relative(&msg.entrypoint) {
            return Err(WorkerError::BadPath(msg.entrypoint.clone()));
        }
        if !is_safe_relative(&msg.config_file) {
            return Err(WorkerError::BadPath(msg.config_file.clone()));
        }

        let output_dir = self.config.artifacts_root.join(jid.as_str());
        std::fs::create_dir_all(&output_dir)?;

        let timeout = self.config.timeout_for(msg.resource_class());
        let log_path = self.config.logs_root.join(format!("{jid}.log"));

        let status = self
            .run_child(&bundle_dir, msg, &output_dir, &log_path, timeout)
            .await?;
        if !status.success() {
            return Err(child_failure(&log_path, status));
        }

        let metrics = load_metrics(&output_dir)?;
        self.record(jid, &metrics, &output_dir).await
    }

    /// Spawn the child with stdout/stderr merged into the log file and
    /// wait for it under the timeout. On expiry the child is killed and
    /// reaped.
    async fn run_child(
        &self,
        bundle_dir: &Path,
        msg: &QueueMessage,
        output_dir: &Path,
        log_path: &Path,
        timeout: Option<Duration>,
    ) -> Result<ExitStatus, WorkerError> {
        let log = std::fs::File::create(log_path)?;
        let log_err = log.try_clone()?;

        let mut command = Command::new(&self.config.interpreter);
        command
            .arg(bundle_dir.join(&msg.entrypoint))
            .arg("--config")
            .arg(bundle_dir.join(&msg.config_file))
            .arg("--output")
            .arg(output_dir)
            .env("PYTHONUNBUFFERED", "1")
            .stdin(Stdio::null())
            .stdout(Stdio::from(log))
            .stderr(Stdio::from(log_err));

        tracing::info!(
            jid = %msg.job_id,
            entrypoint = msg.entrypoint,
            timeout_secs = timeout.map(|t| t.as_secs_f64()),
            "spawning child"
        );
        let mut child = command.spawn()?;
        match timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
                Ok(status) => Ok(status?),
                Err(_elapsed) => {
                    child.kill().await?;
                    Err(WorkerError::Timeout(limit))
                }
            },
            None => Ok(child.wait().await?),
        }
    }

    /// Record the run with the tracker, returning the run id.
    async fn record(
        &self,
        jid: &JobId,
        doc: &MetricsDocument,
        output_dir: &Path,
    ) -> Result<String, WorkerError> {
        let tracker_err = |e: TrackerError| WorkerError::Tracker(e.to_string());
        self.tracker
            .start_run(jid.as_str())
            .await
            .map_err(tracker_err)?;
        self.tracker
            .log_params(&doc.params)
            .await
            .map_err(tracker_err)?;
        self.tracker
            .log_metrics(&doc.metrics)
            .await
            .map_err(tracker_err)?;
        let performance = doc.prefixed_performance();
        if !performance.is_empty() {
            self.tracker
                .log_metrics(&performance)
                .await
                .map_err(tracker_err)?;
        }
        self.tracker
            .log_artifact(output_dir)
            .await
            .map_err(tracker_err)?;
        self.tracker.end_run().await.map_err(tracker_err)
    }
}

/// Classify a non-zero exit: out-of-memory indicators win, then the log
/// tail, then a bare exit code.
fn child_failure(log_path: &Path, status: ExitStatus) -> WorkerError {
    let log_text = std::fs::read_to_string(log_path).unwrap_or_default();
    let normalized = log_text.to_lowercase();
    if normalized.contains("outofmemory") || normalized.contains("oom") {
        return WorkerError::OutOfMemory;
    }
    let tail = log_tail(&log_text, ERROR_TAIL_LINES);
    if !tail.is_empty() {
        return WorkerError::ChildOutput(tail);
    }
    match status.code() {
        Some(code) => WorkerError::Exit(code),
        None => WorkerError::Killed,
    }
}

fn load_metrics(output_dir: &Path) -> Result<MetricsDocument, WorkerError> {
    let path = output_dir.join("metrics.json");
    let text = match std::fs::read_to_string(&path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(WorkerError::MetricsMissing);
        }
        Err(e) => return Err(e.into()),
    };
    MetricsDocument::from_json(&text).map_err(|e| WorkerError::MetricsInvalid(e.to_string()))
}

fn log_tail(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].join("\n").trim().to_string()
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
