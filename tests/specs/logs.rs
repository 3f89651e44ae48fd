//! Log retrieval specs: tail semantics and the prefix-ordering contract.

use crate::prelude::*;
use eb_core::JobStatus;

#[tokio::test]
async fn tail_returns_only_the_last_lines() {
    let plane = control_plane();
    let script = r#"
for i in 1 2 3 4 5; do echo "line$i"; done
out="$4"
mkdir -p "$out"
printf '{"params": {}, "metrics": {"ok": 1.0}}' > "$out/metrics.json"
"#;
    let sid = plane.submit_bundle(&alice(), script).await;
    let jid = plane.admit(&sid, &alice(), "small").await;
    let (stop, handle) = plane.spawn_worker();
    let record = plane.wait_terminal(&jid).await;
    assert_eq!(record.status, JobStatus::Completed);

    let full = plane.job_logs().execute(&jid, None).await.unwrap();
    assert!(full.logs.contains("line1"));
    assert!(full.logs.contains("line5"));

    let tail = plane.job_logs().execute(&jid, Some(2)).await.unwrap();
    assert_eq!(tail.logs, "line4\nline5");

    // Property 7 (log ordering): the tail is a suffix of the full read.
    assert!(full.logs.trim_end().ends_with(&tail.logs));

    stop.raise();
    handle.await.unwrap();
}

#[tokio::test]
async fn logs_for_a_job_without_a_log_file_are_empty() {
    let plane = control_plane();
    let logs = plane
        .job_logs()
        .execute(&eb_core::JobId::new("never-ran"), None)
        .await
        .unwrap();
    assert_eq!(logs.logs, "");
    assert_eq!(logs.job_id, "never-ran");
}

// Successive reads while the child is writing observe prefixes, never
// reordered content.
#[tokio::test]
async fn concurrent_reads_observe_a_growing_prefix() {
    let plane = control_plane();
    let script = r#"
echo "first"
sleep 0.2
echo "second"
out="$4"
mkdir -p "$out"
printf '{"params": {}, "metrics": {"ok": 1.0}}' > "$out/metrics.json"
"#;
    let sid = plane.submit_bundle(&alice(), script).await;
    let jid = plane.admit(&sid, &alice(), "small").await;
    let (stop, handle) = plane.spawn_worker();

    // Snapshot logs mid-run, then after completion.
    let mut early = String::new();
    for _ in 0..100 {
        early = plane.job_logs().execute(&jid, None).await.unwrap().logs;
        if early.contains("first") {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    let record = plane.wait_terminal(&jid).await;
    assert_eq!(record.status, JobStatus::Completed);
    let late = plane.job_logs().execute(&jid, None).await.unwrap().logs;

    assert!(late.starts_with(&early));
    assert!(late.contains("second"));

    stop.raise();
    handle.await.unwrap();
}
