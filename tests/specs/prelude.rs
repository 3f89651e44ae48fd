//! Test helpers for behavioral specifications.
//!
//! Provides a wired control plane: filesystem bundle store in a tempdir,
//! in-memory state store / queue / gate, fake tracker, and a worker
//! configured to run `.py`-named shell scripts via `sh`.

#![allow(dead_code)]

use eb_adapters::{
    FakeTracker, FsBundleStore, JobStateStore, MemoryBackend, MemoryGate, MemoryJobQueue,
    MemoryJobStateStore,
};
use eb_core::{JobId, JobRecord, Limits, SequentialIdGen, SubmissionId, UserId};
use eb_engine::{
    AddSubmissionFile, CreateSubmission, EnqueueJob, GetJobLogs, GetJobResults, GetJobStatus,
    JobWorker, ListSubmissionFiles, StopSignal, WorkerConfig,
};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

pub const TRACKING_URI: &str = "http://mlflow:5010";

/// Spec polling cadence for terminal-status waits.
pub const POLL_INTERVAL: Duration = Duration::from_millis(25);
pub const WAIT_MAX: Duration = Duration::from_secs(10);

/// A happy-path entrypoint: prints a marker and writes metrics.json.
pub const HAPPY_SCRIPT: &str = r#"
echo "run-e2e"
out="$4"
mkdir -p "$out"
printf '{"params": {"method": "test"}, "metrics": {"auc": 0.95}}' > "$out/metrics.json"
"#;

/// Fully wired control plane over test backends.
pub struct ControlPlane {
    _tmp: TempDir,
    pub backend: MemoryBackend,
    pub store: FsBundleStore,
    pub tracker: FakeTracker,
    pub limits: Limits,
    worker_config: WorkerConfig,
    // Clones share the underlying counters, so ids stay unique across
    // repeated service construction.
    sub_ids: SequentialIdGen,
    job_ids: SequentialIdGen,
}

pub fn control_plane() -> ControlPlane {
    control_plane_with(Limits::default())
}

pub fn control_plane_with(limits: Limits) -> ControlPlane {
    let tmp = TempDir::new().unwrap();
    let store =
        FsBundleStore::new(tmp.path().join("submissions"), tmp.path().join("logs")).unwrap();
    let mut worker_config =
        WorkerConfig::new(tmp.path().join("artifacts"), tmp.path().join("logs"));
    worker_config.interpreter = "sh".to_string();
    worker_config.dequeue_timeout = Duration::from_millis(50);
    ControlPlane {
        _tmp: tmp,
        backend: MemoryBackend::default(),
        store,
        tracker: FakeTracker::new(),
        limits,
        worker_config,
        sub_ids: SequentialIdGen::new("sub"),
        job_ids: SequentialIdGen::new("job"),
    }
}

impl ControlPlane {
    pub fn create_submission(&self) -> CreateSubmission<FsBundleStore, SequentialIdGen> {
        CreateSubmission::new(self.store.clone(), self.sub_ids.clone())
    }

    pub fn add_file(&self) -> AddSubmissionFile<FsBundleStore> {
        AddSubmissionFile::new(self.store.clone())
    }

    pub fn list_files(&self) -> ListSubmissionFiles<FsBundleStore> {
        ListSubmissionFiles::new(self.store.clone())
    }

    pub fn enqueue_job(
        &self,
    ) -> EnqueueJob<FsBundleStore, MemoryJobQueue, MemoryJobStateStore, MemoryGate, SequentialIdGen>
    {
        EnqueueJob::new(
            self.store.clone(),
            self.backend.job_queue(),
            self.backend.state_store(),
            self.backend.gate(),
            self.job_ids.clone(),
            self.limits,
        )
    }

    pub fn job_status(&self) -> GetJobStatus<MemoryJobStateStore> {
        GetJobStatus::new(self.backend.state_store())
    }

    pub fn job_logs(&self) -> GetJobLogs<FsBundleStore> {
        GetJobLogs::new(self.store.clone())
    }

    pub fn job_results(&self) -> GetJobResults<MemoryJobStateStore> {
        GetJobResults::new(self.backend.state_store(), TRACKING_URI, "1")
    }

    /// Override a resource class timeout for this plane's workers.
    pub fn set_resource_timeout(&mut self, class: &str, timeout: Option<Duration>) {
        self.worker_config
            .resource_timeouts
            .insert(class.to_string(), timeout);
    }

    /// Spawn a worker task; returns the stop signal and join handle.
    pub fn spawn_worker(&self) -> (Arc<StopSignal>, tokio::task::JoinHandle<()>) {
        let stop = StopSignal::new();
        let worker = JobWorker::new(
            self.backend.job_queue(),
            self.backend.state_store(),
            self.store.clone(),
            self.tracker.clone(),
            self.worker_config.clone(),
            stop.clone(),
        );
        let handle = tokio::spawn(async move { worker.run().await });
        (stop, handle)
    }

    /// Create a bundle whose entrypoint is `script` plus a config file.
    pub async fn submit_bundle(&self, user: &UserId, script: &str) -> SubmissionId {
        let files = vec![
            ("main.py".to_string(), script.as_bytes().to_vec()),
            ("config.yaml".to_string(), b"batch_size: 1".to_vec()),
        ];
        self.create_submission()
            .execute(user, files, None, None, serde_json::Map::new())
            .await
            .unwrap()
    }

    /// Admit a job for `sid` with a `resource_class` config entry.
    pub async fn admit(&self, sid: &SubmissionId, user: &UserId, resource_class: &str) -> JobId {
        let mut config = serde_json::Map::new();
        config.insert(
            "resource_class".to_string(),
            serde_json::json!(resource_class),
        );
        self.enqueue_job().execute(sid, user, config).await.unwrap()
    }

    /// Poll the state store until `jid` is terminal.
    pub async fn wait_terminal(&self, jid: &JobId) -> JobRecord {
        let state = self.backend.state_store();
        let deadline = tokio::time::Instant::now() + WAIT_MAX;
        loop {
            if let Some(record) = state.get(jid).await.unwrap() {
                if record.status.is_terminal() {
                    return record;
                }
            }
            if tokio::time::Instant::now() > deadline {
                panic!("job {jid} never reached a terminal status");
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}

pub fn alice() -> UserId {
    UserId::new("alice")
}

pub fn bob() -> UserId {
    UserId::new("bob")
}
