//! AsyncPoller behaviour on a paused clock

mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use common::*;
use providers::{AsyncPoller, JobStatus, JobStatusResponse, MockJobBackend, ProviderError};
use shared::{CancellationToken, ProgressReporter};
use tokio::time::Instant;
use tokio_test::{assert_err, assert_ok};

fn poller() -> AsyncPoller {
    AsyncPoller::new(Duration::from_secs(5), Duration::from_secs(300))
}

#[tokio::test(start_paused = true)]
async fn test_completes_after_k_processing_polls() {
    for k in [0usize, 1, 4] {
        // Arrange
        let mut script = vec![Ok(JobStatusResponse::processing()); k];
        script.push(Ok(JobStatusResponse::completed(vec!["https://cdn/out.png".to_string()])));
        let backend = ScriptedBackend::new(script);

        // Act
        let completed = assert_ok!(poller().run(&backend, &payload(), &ProgressReporter::silent()).await);

        // Assert
        assert_eq!(completed.polls as usize, k + 1);
        assert_eq!(backend.queries() as usize, k + 1);
        assert_eq!(completed.job.status, JobStatus::Completed);
        assert_eq!(completed.outputs, vec!["https://cdn/out.png".to_string()]);
    }
}

#[tokio::test(start_paused = true)]
async fn test_times_out_once_elapsed_reaches_timeout() {
    let backend = ScriptedBackend::stuck();
    let started = Instant::now();

    let err = assert_err!(poller().run(&backend, &payload(), &ProgressReporter::silent()).await);

    match err {
        ProviderError::Timeout { job_id, elapsed, .. } => {
            assert_eq!(job_id, "job-42");
            assert!(elapsed >= Duration::from_secs(300));
            assert!(elapsed < Duration::from_secs(305));
        }
        other => panic!("expected timeout, got {other:?}"),
    }
    assert!(started.elapsed() >= Duration::from_secs(300));
    assert_eq!(backend.queries(), 60);
}

#[tokio::test(start_paused = true)]
async fn test_transport_errors_are_retried() {
    let backend = ScriptedBackend::new(vec![
        Err(transport_error()),
        Ok(JobStatusResponse::processing()),
        Err(transport_error()),
        Ok(JobStatusResponse::completed(vec!["a".to_string(), "b".to_string()])),
    ]);

    let completed = poller()
        .run(&backend, &payload(), &ProgressReporter::silent())
        .await
        .unwrap();

    assert_eq!(completed.polls, 4);
    assert_eq!(completed.outputs.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_completed_without_output_is_data_integrity_error() {
    let backend = ScriptedBackend::new(vec![Ok(JobStatusResponse::completed(Vec::new()))]);

    let err = poller()
        .run(&backend, &payload(), &ProgressReporter::silent())
        .await
        .unwrap_err();

    assert!(matches!(err, ProviderError::DataIntegrity { .. }));
}

#[tokio::test(start_paused = true)]
async fn test_failed_job_is_backend_error() {
    let backend = ScriptedBackend::new(vec![
        Ok(JobStatusResponse::processing()),
        Ok(JobStatusResponse::failed("garment not detected")),
    ]);

    let err = poller()
        .run(&backend, &payload(), &ProgressReporter::silent())
        .await
        .unwrap_err();

    assert_eq!(err, ProviderError::backend("scripted", "garment not detected"));
}

#[tokio::test(start_paused = true)]
async fn test_non_transport_query_error_propagates() {
    let mut backend = MockJobBackend::new();
    backend.expect_provider().return_const("mock");
    backend.expect_submit().returning(|_| Ok("job-7".to_string()));
    backend
        .expect_query()
        .times(1)
        .returning(|_| Err(ProviderError::data_integrity("mock", "garbled status")));

    let err = poller()
        .run(&backend, &payload(), &ProgressReporter::silent())
        .await
        .unwrap_err();

    assert!(matches!(err, ProviderError::DataIntegrity { .. }));
}

#[tokio::test(start_paused = true)]
async fn test_submit_failure_skips_polling() {
    let mut backend = MockJobBackend::new();
    backend.expect_provider().return_const("mock");
    backend
        .expect_submit()
        .returning(|_| Err(ProviderError::backend("mock", "quota exceeded")));
    backend.expect_query().never();

    let err = poller()
        .run(&backend, &payload(), &ProgressReporter::silent())
        .await
        .unwrap_err();

    assert_eq!(err, ProviderError::backend("mock", "quota exceeded"));
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_interrupts_the_wait() {
    let token = CancellationToken::new();
    let backend = Arc::new(ScriptedBackend::stuck());
    let poller = poller().with_cancellation(token.clone());

    let task_backend = backend.clone();
    let handle = tokio::spawn(async move {
        poller
            .run(task_backend.as_ref(), &payload(), &ProgressReporter::silent())
            .await
    });

    tokio::time::sleep(Duration::from_secs(12)).await;
    token.cancel();

    let err = handle.await.unwrap().unwrap_err();
    assert_eq!(err, ProviderError::Cancelled { job_id: "job-42".to_string() });
    assert!(backend.queries() < 60);
}

#[tokio::test(start_paused = true)]
async fn test_progress_stays_in_polling_band() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let captured = seen.clone();
    let reporter = ProgressReporter::new(Arc::new(move |_: &str, pct: u8| {
        captured.lock().unwrap().push(pct);
    }));

    let mut script = vec![Ok(JobStatusResponse::processing()); 10];
    script.push(Ok(JobStatusResponse::completed(vec!["x".to_string()])));
    let backend = ScriptedBackend::new(script);

    poller().run(&backend, &payload(), &reporter).await.unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 10);
    assert!(seen.iter().all(|p| (30..=90).contains(p)));
    assert!(seen.windows(2).all(|w| w[0] <= w[1]));
}
