//! Worker execution specs: the happy path and the failure taxonomy.

use crate::prelude::*;
use eb_adapters::{JobStateStore, TrackerCall};
use eb_core::{JobStatus, Limits};
use std::time::Duration;

// S1: full happy path through admission, execution, tracking, and the
// read-side queries.
#[tokio::test]
async fn happy_path_end_to_end() {
    let plane = control_plane();
    let sid = plane.submit_bundle(&alice(), HAPPY_SCRIPT).await;
    let jid = plane.admit(&sid, &alice(), "small").await;
    let (stop, handle) = plane.spawn_worker();

    let record = plane.wait_terminal(&jid).await;
    assert_eq!(record.status, JobStatus::Completed);
    let run_id = record.run_id.clone().unwrap();
    assert!(!run_id.is_empty());

    // Status query observes the same terminal record.
    let status = plane.job_status().execute(&jid).await.unwrap().unwrap();
    assert_eq!(status.status, JobStatus::Completed);
    assert_eq!(status.run_id.as_deref(), Some(run_id.as_str()));

    // Logs captured the child's stdout.
    let logs = plane.job_logs().execute(&jid, None).await.unwrap();
    assert!(logs.logs.contains("run-e2e"));

    // Result links point at the tracker run.
    let results = plane.job_results().execute(&jid).await.unwrap();
    assert_eq!(results.run_id.as_deref(), Some(run_id.as_str()));
    assert!(results.mlflow_ui_link.ends_with(&format!("/runs/{run_id}")));

    // Tracker saw the canonical sequence.
    let calls = plane.tracker.calls();
    assert_eq!(calls.first(), Some(&TrackerCall::StartRun(jid.to_string())));
    assert_eq!(calls.last(), Some(&TrackerCall::EndRun));

    stop.raise();
    handle.await.unwrap();
}

// S5: a sleeping child under a tiny timeout fails with a timeout error.
#[tokio::test]
async fn timeout_fails_the_job() {
    let mut plane = control_plane();
    plane.set_resource_timeout("tiny", Some(Duration::from_millis(10)));
    let sid = plane.submit_bundle(&alice(), "sleep 10\n").await;
    let jid = plane.admit(&sid, &alice(), "tiny").await;
    let (stop, handle) = plane.spawn_worker();

    let record = plane.wait_terminal(&jid).await;
    assert_eq!(record.status, JobStatus::Failed);
    assert!(record
        .error
        .as_deref()
        .unwrap_or_default()
        .contains("timeout"));

    stop.raise();
    handle.await.unwrap();
}

// S6: a child that dies printing an OOM marker is reported as out of
// memory.
#[tokio::test]
async fn oom_exit_is_classified() {
    let plane = control_plane();
    let sid = plane
        .submit_bundle(&alice(), "echo 'OutOfMemory' >&2\nexit 1\n")
        .await;
    let jid = plane.admit(&sid, &alice(), "small").await;
    let (stop, handle) = plane.spawn_worker();

    let record = plane.wait_terminal(&jid).await;
    assert_eq!(record.status, JobStatus::Failed);
    assert_eq!(record.error.as_deref(), Some("out of memory"));

    stop.raise();
    handle.await.unwrap();
}

// S7: a tracker failure after a successful child marks the job failed
// exactly once.
#[tokio::test]
async fn tracker_failure_is_recorded_once() {
    let plane = control_plane();
    plane.tracker.fail_on("start_run", "boom");
    let sid = plane.submit_bundle(&alice(), HAPPY_SCRIPT).await;
    let jid = plane.admit(&sid, &alice(), "small").await;
    let (stop, handle) = plane.spawn_worker();

    let record = plane.wait_terminal(&jid).await;
    assert_eq!(record.status, JobStatus::Failed);
    assert!(record
        .error
        .as_deref()
        .unwrap_or_default()
        .starts_with("MLflow recording failed"));

    // Property 2 (terminal monotonicity): the record does not change
    // after its terminal write.
    let first = record.clone();
    tokio::time::sleep(Duration::from_millis(100)).await;
    let again = plane
        .backend
        .state_store()
        .get(&jid)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(again.status, first.status);
    assert_eq!(again.error, first.error);
    assert_eq!(again.updated_at, first.updated_at);

    stop.raise();
    handle.await.unwrap();
}

// Property 3 (running-counter agreement) across a full execution.
#[tokio::test]
async fn running_counter_returns_to_zero_after_completion() {
    let plane = control_plane();
    let sid = plane.submit_bundle(&alice(), HAPPY_SCRIPT).await;
    let jid = plane.admit(&sid, &alice(), "small").await;
    let (stop, handle) = plane.spawn_worker();

    plane.wait_terminal(&jid).await;
    assert_eq!(
        plane
            .backend
            .state_store()
            .count_running(&alice())
            .await
            .unwrap(),
        0
    );

    stop.raise();
    handle.await.unwrap();
}

// A worker pool drains multiple queued jobs.
#[tokio::test]
async fn two_workers_drain_the_queue() {
    let plane = control_plane_with(Limits {
        max_submissions_per_hour: 50,
        max_concurrent_running: 10,
    });
    let sid = plane.submit_bundle(&alice(), HAPPY_SCRIPT).await;
    let jid1 = plane.admit(&sid, &alice(), "small").await;
    let jid2 = plane.admit(&sid, &alice(), "small").await;
    let jid3 = plane.admit(&sid, &alice(), "small").await;

    let (stop_a, handle_a) = plane.spawn_worker();
    let (stop_b, handle_b) = plane.spawn_worker();

    for jid in [&jid1, &jid2, &jid3] {
        let record = plane.wait_terminal(jid).await;
        assert_eq!(record.status, JobStatus::Completed);
    }
    assert_eq!(plane.backend.queue_len(), 0);

    stop_a.raise();
    stop_b.raise();
    handle_a.await.unwrap();
    handle_b.await.unwrap();
}

// Shutdown: an in-flight job runs to completion after stop is raised.
#[tokio::test]
async fn stop_lets_the_inflight_job_finish() {
    let plane = control_plane();
    let script = r#"
sleep 0.3
out="$4"
mkdir -p "$out"
printf '{"params": {}, "metrics": {"ok": 1.0}}' > "$out/metrics.json"
"#;
    let sid = plane.submit_bundle(&alice(), script).await;
    let jid = plane.admit(&sid, &alice(), "small").await;
    let (stop, handle) = plane.spawn_worker();

    // Give the worker time to dequeue, then stop mid-job.
    tokio::time::sleep(Duration::from_millis(100)).await;
    stop.raise();
    handle.await.unwrap();

    let record = plane
        .backend
        .state_store()
        .get(&jid)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.status, JobStatus::Completed);
}
