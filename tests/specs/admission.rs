//! Admission specs: rate and concurrency caps, rollback, and counter
//! conservation.

use crate::prelude::*;
use eb_adapters::JobStateStore;
use eb_core::{JobStatus, Limits, UpdateFields};
use eb_engine::ServiceError;

// S2: with R=2, the third admission is refused and the observed rate
// counter stays at 2.
#[tokio::test]
async fn rate_cap_refuses_third_admission() {
    let plane = control_plane_with(Limits {
        max_submissions_per_hour: 2,
        max_concurrent_running: 10,
    });
    let sid = plane.submit_bundle(&bob(), HAPPY_SCRIPT).await;

    plane.admit(&sid, &bob(), "small").await;
    plane.admit(&sid, &bob(), "small").await;
    let err = plane
        .enqueue_job()
        .execute(&sid, &bob(), serde_json::Map::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::RateExceeded));
    assert_eq!(err.to_string(), "submission rate limit exceeded");
    assert_eq!(plane.backend.rate_count(&bob()), 2);
}

// S3: with C=1 and a running job, a second admission is refused as a
// concurrency error and only one rate slot is consumed.
#[tokio::test]
async fn concurrency_cap_refuses_second_admission() {
    let plane = control_plane_with(Limits {
        max_submissions_per_hour: 50,
        max_concurrent_running: 1,
    });
    let sid = plane.submit_bundle(&bob(), HAPPY_SCRIPT).await;

    let jid = plane.admit(&sid, &bob(), "small").await;
    plane
        .backend
        .state_store()
        .update(&jid, JobStatus::Running, UpdateFields::none())
        .await
        .unwrap();

    let err = plane
        .enqueue_job()
        .execute(&sid, &bob(), serde_json::Map::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::ConcurrencyExceeded));
    assert_eq!(err.to_string(), "too many running jobs");
    assert_eq!(plane.backend.rate_count(&bob()), 1);
}

// S4: gate passes but the completeness check fails; the rate counter
// returns to its pre-call value and no job record exists.
#[tokio::test]
async fn incomplete_bundle_rolls_back_the_admission() {
    let plane = control_plane();
    let files = vec![("main.py".to_string(), HAPPY_SCRIPT.as_bytes().to_vec())];
    let sid = plane
        .create_submission()
        .execute(&alice(), files, None, None, serde_json::Map::new())
        .await
        .unwrap();

    let before = plane.backend.rate_count(&alice());
    let err = plane
        .enqueue_job()
        .execute(&sid, &alice(), serde_json::Map::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Incomplete(_)));
    assert_eq!(plane.backend.rate_count(&alice()), before);

    // Property 5: no orphaned admission.
    use eb_core::JobId;
    assert!(plane
        .backend
        .state_store()
        .get(&JobId::new("job-1"))
        .await
        .unwrap()
        .is_none());
}

// Property 1 (counter conservation): after any mix of accepted and
// refused admissions, the rate counter equals the number of successes.
#[tokio::test]
async fn rate_counter_equals_successful_admissions() {
    let plane = control_plane_with(Limits {
        max_submissions_per_hour: 3,
        max_concurrent_running: 10,
    });
    let sid = plane.submit_bundle(&alice(), HAPPY_SCRIPT).await;

    let mut successes = 0;
    for _ in 0..6 {
        if plane
            .enqueue_job()
            .execute(&sid, &alice(), serde_json::Map::new())
            .await
            .is_ok()
        {
            successes += 1;
        }
    }
    assert_eq!(successes, 3);
    assert_eq!(plane.backend.rate_count(&alice()), successes);
}

// Per-user isolation: bob's refusals never touch alice's counters.
#[tokio::test]
async fn limits_are_per_user() {
    let plane = control_plane_with(Limits {
        max_submissions_per_hour: 1,
        max_concurrent_running: 10,
    });
    let sid_a = plane.submit_bundle(&alice(), HAPPY_SCRIPT).await;
    let sid_b = {
        let files = vec![
            ("main.py".to_string(), HAPPY_SCRIPT.as_bytes().to_vec()),
            ("config.yaml".to_string(), b"batch_size: 1".to_vec()),
        ];
        plane
            .create_submission()
            .execute(&bob(), files, None, None, serde_json::Map::new())
            .await
            .unwrap()
    };

    plane.admit(&sid_a, &alice(), "small").await;
    plane.admit(&sid_b, &bob(), "small").await;

    let err = plane
        .enqueue_job()
        .execute(&sid_b, &bob(), serde_json::Map::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::RateExceeded));
    assert_eq!(plane.backend.rate_count(&alice()), 1);
    assert_eq!(plane.backend.rate_count(&bob()), 1);
}
