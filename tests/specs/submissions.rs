//! Submission lifecycle specs: creation, incremental upload, listing,
//! and name safety.

use crate::prelude::*;
use eb_core::SubmissionId;
use eb_engine::ServiceError;

// S8: create with only main.py, append config.yaml, list shows both with
// non-decreasing upload times, and admission then succeeds.
#[tokio::test]
async fn incremental_upload_completes_a_bundle() {
    let plane = control_plane();
    let files = vec![("main.py".to_string(), HAPPY_SCRIPT.as_bytes().to_vec())];
    let sid = plane
        .create_submission()
        .execute(&alice(), files, None, None, serde_json::Map::new())
        .await
        .unwrap();

    // Admission refuses while config.yaml is missing, returning the slot.
    let err = plane
        .enqueue_job()
        .execute(&sid, &alice(), serde_json::Map::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Incomplete(_)));
    assert_eq!(plane.backend.rate_count(&alice()), 0);

    plane
        .add_file()
        .execute(&sid, "config.yaml", b"batch_size: 1", &alice())
        .await
        .unwrap();

    let listed = plane.list_files().execute(&sid, &alice()).await.unwrap();
    let names: Vec<&str> = listed.iter().map(|f| f.filename.as_str()).collect();
    assert_eq!(names, vec!["main.py", "config.yaml"]);
    assert!(listed[0].uploaded_at <= listed[1].uploaded_at);

    // Admission now succeeds.
    plane.admit(&sid, &alice(), "small").await;
}

// S9: path traversal in an append is rejected and the bundle unchanged.
#[tokio::test]
async fn traversal_filename_is_rejected_and_bundle_unchanged() {
    let plane = control_plane();
    let sid = plane.submit_bundle(&alice(), HAPPY_SCRIPT).await;

    let err = plane
        .add_file()
        .execute(&sid, "../etc/passwd", b"x", &alice())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidName(_)));
    assert_eq!(err.http_status(), 400);

    let listed = plane.list_files().execute(&sid, &alice()).await.unwrap();
    let names: Vec<&str> = listed.iter().map(|f| f.filename.as_str()).collect();
    assert_eq!(names, vec!["main.py", "config.yaml"]);
}

#[tokio::test]
async fn cross_user_listing_is_forbidden() {
    let plane = control_plane();
    let sid = plane.submit_bundle(&alice(), HAPPY_SCRIPT).await;

    let err = plane.list_files().execute(&sid, &bob()).await.unwrap_err();
    assert!(matches!(err, ServiceError::NotOwner(_)));
    assert_eq!(err.http_status(), 403);
}

#[tokio::test]
async fn unknown_submission_maps_to_404() {
    let plane = control_plane();
    let err = plane
        .add_file()
        .execute(&SubmissionId::new("ghost"), "a.py", b"x", &alice())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::SubmissionNotFound(_)));
    assert_eq!(err.http_status(), 404);
}

// Property 4 (bundle integrity): everything listed exists on disk, and
// nothing outside the metadata list is reported.
#[tokio::test]
async fn listing_reflects_metadata_and_disk_exactly() {
    let plane = control_plane();
    let sid = plane.submit_bundle(&alice(), HAPPY_SCRIPT).await;

    // A stray file dropped into the directory is not listed.
    let dir = {
        use eb_adapters::BundleStore;
        plane.store.submission_dir(&sid).await.unwrap()
    };
    std::fs::write(dir.join("stray.py"), b"not listed").unwrap();

    let listed = plane.list_files().execute(&sid, &alice()).await.unwrap();
    let names: Vec<&str> = listed.iter().map(|f| f.filename.as_str()).collect();
    assert_eq!(names, vec!["main.py", "config.yaml"]);
    for file in &listed {
        assert!(dir.join(&file.filename).is_file());
    }
}
