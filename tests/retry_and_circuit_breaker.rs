//! Scenario D (audio-too-small retry) and Scenario C (circuit breaker),
//! exercised directly against the [`Dispatcher`] so the test can observe
//! worker-pool state without waiting out a full batch's retry backoff.

mod common;
use common::{sufficient_audio_body, MockTtsServer, ScratchDirectory};

use mdtts_cli::config::Config;
use mdtts_cli::core::dispatcher::Dispatcher;
use mdtts_cli::core::registry::{BatchParams, Registry};
use mdtts_cli::core::worker::WorkerStatus;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn undersized_audio_is_retried_as_a_general_failure_and_then_succeeds() {
    let mock = MockTtsServer::start().await;
    // Input is short, so the default size floor (4096 bytes) governs.
    mock.mock_undersized_then_sufficient(1, vec![0u8; 100], sufficient_audio_body())
        .await;

    let scratch = ScratchDirectory::new();
    scratch.write_markdown("a.md", "short input text");
    let server = mock.as_upstream_server("s1");

    let registry = Arc::new(Registry::new());
    let params = BatchParams::default();
    let batch_id = registry.create_batch(
        params.clone(),
        scratch.path().to_path_buf(),
        &["a.md".to_string()],
    );

    let config = Config::default();
    let dispatcher = Dispatcher::new(
        Arc::clone(&registry),
        batch_id,
        scratch.path().to_path_buf(),
        params,
        &[server],
        &config,
        None,
    );

    // One retry at the general-failure backoff (roughly 4-6s) is expected
    // before the second attempt lands on the now-sufficient response.
    let result =
        tokio::time::timeout(Duration::from_secs(20), dispatcher.run()).await;
    assert!(result.is_ok(), "dispatcher did not finish within the retry window");
    result.unwrap().unwrap();

    let view = registry.snapshot(batch_id).unwrap();
    assert_eq!(view.completed_files, 1);
    assert!(scratch.path().join("a.mp3").exists());
}

#[tokio::test]
async fn a_persistently_failing_worker_opens_its_circuit_while_the_other_keeps_serving() {
    let flaky = MockTtsServer::start().await;
    flaky.mock_always_failing(500, "internal error").await;
    let healthy = MockTtsServer::start().await;
    healthy.mock_fixed_response(200, sufficient_audio_body()).await;

    let scratch = ScratchDirectory::new();
    for i in 0..6 {
        scratch.write_markdown(&format!("f{i}.md"), "some text to synthesize");
    }
    let filenames: Vec<String> = (0..6).map(|i| format!("f{i}.md")).collect();

    let registry = Arc::new(Registry::new());
    let params = BatchParams::default();
    let batch_id = registry.create_batch(params.clone(), scratch.path().to_path_buf(), &filenames);

    let config = Config::default();
    let dispatcher = Arc::new(Dispatcher::new(
        Arc::clone(&registry),
        batch_id,
        scratch.path().to_path_buf(),
        params,
        &[flaky.as_upstream_server("flaky"), healthy.as_upstream_server("healthy")],
        &config,
        None,
    ));

    let run_dispatcher = Arc::clone(&dispatcher);
    let handle = tokio::spawn(async move { run_dispatcher.run().await });

    // Poll until the flaky worker's circuit has opened (three consecutive
    // failures) or we give up; this does not wait for the whole batch to
    // finish, since the flaky side still has to exhaust its retry caps.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(40);
    let mut circuit_opened = false;
    while tokio::time::Instant::now() < deadline {
        let snapshot = dispatcher.worker_snapshot().await;
        let flaky_view = snapshot.iter().find(|w| w.name == "flaky").unwrap();
        if flaky_view.consecutive_failures >= 3 && flaky_view.status == WorkerStatus::Error {
            circuit_opened = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
    }

    handle.abort();
    assert!(circuit_opened, "flaky worker never opened its circuit breaker");

    let final_snapshot = dispatcher.worker_snapshot().await;
    let healthy_view = final_snapshot.iter().find(|w| w.name == "healthy").unwrap();
    assert!(
        healthy_view.completed > 0,
        "healthy worker should have picked up tasks while the flaky one was in cooldown"
    );
}
