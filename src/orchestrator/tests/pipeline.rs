use super::*;

#[tokio::test]
async fn test_fetch_returns_verified_artifact_and_removal_empties_temp_dir() {
    let tool = Arc::new(StubMediaTool::new(StubBehavior::Write(2048)));
    let (orchestrator, _temp) = create_test_orchestrator(tool.clone()).await;

    let fetched = orchestrator.fetch(&url("https://example.com/v")).await.unwrap();
    assert_eq!(fetched.size, 2048);
    assert_eq!(fetched.title.as_deref(), Some("Stub Video"));
    assert!(fetched.artifact.path().exists());

    // The artifact lives in the temp dir under the reserved prefix
    let name = fetched.artifact.path().file_name().unwrap().to_str().unwrap();
    assert!(name.starts_with(artifact::ARTIFACT_PREFIX));
    assert!(name.ends_with(".mp4"));

    let removed = fetched.artifact.remove().await;
    assert_eq!(removed, 2, "artifact and its .part side file");
    assert!(temp_files(&orchestrator).is_empty());
}

#[tokio::test]
async fn test_dropping_fetched_artifact_deletes_file() {
    let tool = Arc::new(StubMediaTool::new(StubBehavior::Write(16)));
    let (orchestrator, _temp) = create_test_orchestrator(tool).await;

    let fetched = orchestrator.fetch(&url("https://example.com/v")).await.unwrap();
    drop(fetched);

    assert!(temp_files(&orchestrator).is_empty());
}

#[tokio::test]
async fn test_empty_url_is_rejected_before_any_work() {
    let tool = Arc::new(StubMediaTool::new(StubBehavior::Write(16)));
    let (orchestrator, _temp) = create_test_orchestrator(tool.clone()).await;

    for input in [None, Some(""), Some("  ")] {
        let err = orchestrator.validate_url(input).unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
    }
    assert_eq!(tool.download_calls(), 0);
    assert_eq!(tool.probe_calls(), 0);
}

#[tokio::test]
async fn test_failed_process_cleans_up_and_hides_diagnostics() {
    let tool = Arc::new(StubMediaTool::new(StubBehavior::Fail));
    let (orchestrator, _temp) = create_test_orchestrator(tool.clone()).await;

    let err = orchestrator
        .fetch(&url("https://example.com/v"))
        .await
        .unwrap_err();

    match &err {
        Error::Download(DownloadError::Failed {
            exit_code,
            timed_out,
            ..
        }) => {
            assert_eq!(*exit_code, Some(1));
            assert!(!timed_out);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!err.to_string().contains("secret-token"));
    assert!(!err.public_message().contains("secret-token"));
    assert!(temp_files(&orchestrator).is_empty(), "partial output removed");
    assert_eq!(orchestrator.active_jobs(), 0);
}

#[tokio::test]
async fn test_empty_artifact_is_a_failure() {
    let tool = Arc::new(StubMediaTool::new(StubBehavior::WriteEmpty));
    let (orchestrator, _temp) = create_test_orchestrator(tool).await;

    let err = orchestrator
        .fetch(&url("https://example.com/v"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::Download(DownloadError::EmptyArtifact { .. })
    ));
    assert!(temp_files(&orchestrator).is_empty());
}

#[tokio::test]
async fn test_missing_artifact_is_a_failure() {
    let tool = Arc::new(StubMediaTool::new(StubBehavior::WriteNothing));
    let (orchestrator, _temp) = create_test_orchestrator(tool).await;

    let err = orchestrator
        .fetch(&url("https://example.com/v"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::Download(DownloadError::MissingArtifact { .. })
    ));
}

#[tokio::test]
async fn test_not_ready_spawns_nothing() {
    let tool = Arc::new(StubMediaTool::new(StubBehavior::Write(16)));
    let temp = tempfile::tempdir().unwrap();
    let orchestrator = Orchestrator::new(test_config(temp.path()), tool.clone())
        .await
        .unwrap();

    // initialize() never ran
    let err = orchestrator
        .fetch(&url("https://example.com/v"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::NotReady));
    assert_eq!(tool.download_calls(), 0);
    assert_eq!(tool.probe_calls(), 0);
}

#[tokio::test]
async fn test_probe_failure_skips_download() {
    let tool = Arc::new(StubMediaTool::new(StubBehavior::Write(16)).failing_probe());
    let (orchestrator, _temp) = create_test_orchestrator(tool.clone()).await;

    let err = orchestrator
        .fetch(&url("https://example.com/not-a-video"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::UnreachableSource { .. }));
    assert_eq!(tool.probe_calls(), 1);
    assert_eq!(tool.download_calls(), 0);
    assert!(temp_files(&orchestrator).is_empty());
}

#[tokio::test]
async fn test_probe_skipped_when_disabled_or_unsupported() {
    let tool = Arc::new(StubMediaTool::new(StubBehavior::Write(16)).without_probe());
    let (orchestrator, _temp) = create_test_orchestrator(tool.clone()).await;
    let fetched = orchestrator.fetch(&url("https://example.com/v")).await.unwrap();
    assert!(fetched.title.is_none());
    assert_eq!(tool.probe_calls(), 0);

    let tool = Arc::new(StubMediaTool::new(StubBehavior::Write(16)));
    let temp = tempfile::tempdir().unwrap();
    let mut config = test_config(temp.path());
    config.download.probe_before_download = false;
    let (orchestrator, _temp) = create_test_orchestrator_with(tool.clone(), config, temp).await;
    orchestrator.fetch(&url("https://example.com/v")).await.unwrap();
    assert_eq!(tool.probe_calls(), 0);
    assert_eq!(tool.download_calls(), 1);
}

#[tokio::test]
async fn test_concurrent_jobs_get_distinct_artifacts() {
    let tool = Arc::new(StubMediaTool::new(StubBehavior::EchoUrl));
    let temp = tempfile::tempdir().unwrap();
    let mut config = test_config(temp.path());
    config.download.max_concurrent_downloads = 8;
    let (orchestrator, _temp) = create_test_orchestrator_with(tool.clone(), config, temp).await;

    let mut handles = Vec::new();
    for i in 0..8 {
        let orchestrator = orchestrator.clone();
        handles.push(tokio::spawn(async move {
            let source = format!("https://example.com/video/{i}");
            let fetched = orchestrator.fetch(&url(&source)).await.unwrap();
            let body = tokio::fs::read(fetched.artifact.path()).await.unwrap();
            fetched.artifact.remove().await;
            (source, body)
        }));
    }

    for handle in handles {
        let (source, body) = handle.await.unwrap();
        assert_eq!(body, source.as_bytes(), "each caller sees its own bytes");
    }

    let paths = tool.output_paths();
    let unique: std::collections::HashSet<_> = paths.iter().collect();
    assert_eq!(unique.len(), 8);
    assert!(temp_files(&orchestrator).is_empty());
}

#[tokio::test]
async fn test_busy_when_no_slot_frees_up() {
    let tool = Arc::new(StubMediaTool::new(StubBehavior::Hang));
    let temp = tempfile::tempdir().unwrap();
    let mut config = test_config(temp.path());
    config.download.max_concurrent_downloads = 1;
    config.download.queue_timeout = Duration::from_millis(50);
    config.download.job_timeout = Duration::from_secs(30);
    let (orchestrator, _temp) = create_test_orchestrator_with(tool.clone(), config, temp).await;

    let running = {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move { orchestrator.fetch(&url("https://example.com/a")).await })
    };
    while tool.download_calls() == 0 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let err = orchestrator
        .fetch(&url("https://example.com/b"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Busy { capacity: 1 }));
    assert_eq!(tool.download_calls(), 1);

    running.abort();
    let _ = running.await;
}

#[tokio::test]
async fn test_job_timeout_reports_timed_out() {
    let tool = Arc::new(StubMediaTool::new(StubBehavior::Hang));
    let temp = tempfile::tempdir().unwrap();
    let mut config = test_config(temp.path());
    config.download.job_timeout = Duration::from_millis(50);
    let (orchestrator, _temp) = create_test_orchestrator_with(tool, config, temp).await;

    let err = orchestrator
        .fetch(&url("https://example.com/v"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::Download(DownloadError::Failed {
            timed_out: true,
            ..
        })
    ));
    assert!(temp_files(&orchestrator).is_empty());
}

#[tokio::test]
async fn test_abandoned_request_removes_partial_output() {
    let tool = Arc::new(StubMediaTool::new(StubBehavior::Hang));
    let temp = tempfile::tempdir().unwrap();
    let mut config = test_config(temp.path());
    config.download.job_timeout = Duration::from_secs(30);
    let (orchestrator, _temp) = create_test_orchestrator_with(tool.clone(), config, temp).await;

    let handle = {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move { orchestrator.fetch(&url("https://example.com/v")).await })
    };
    while temp_files(&orchestrator).is_empty() {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    // Same as a client disconnecting while the handler awaits
    handle.abort();
    assert!(handle.await.unwrap_err().is_cancelled());

    assert!(temp_files(&orchestrator).is_empty());
    assert_eq!(orchestrator.active_jobs(), 0);
}

#[tokio::test]
async fn test_stalled_probe_hits_job_timeout_and_frees_its_slot() {
    let tool = Arc::new(StubMediaTool::new(StubBehavior::Write(64)).hanging_probe());
    let temp = tempfile::tempdir().unwrap();
    let mut config = test_config(temp.path());
    config.download.max_concurrent_downloads = 1;
    config.download.queue_timeout = Duration::from_secs(5);
    config.download.job_timeout = Duration::from_millis(100);
    let (orchestrator, _temp) = create_test_orchestrator_with(tool.clone(), config, temp).await;

    let first = {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move { orchestrator.fetch(&url("https://example.com/a")).await })
    };
    while tool.probe_calls() == 0 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    // The probing job holds the only slot and is counted as running
    assert_eq!(orchestrator.active_jobs(), 1);

    let started = std::time::Instant::now();
    let second = orchestrator.fetch(&url("https://example.com/b")).await;
    let first = tokio::time::timeout(Duration::from_secs(5), first)
        .await
        .unwrap()
        .unwrap();

    for result in [first, second] {
        assert!(matches!(
            result.unwrap_err(),
            Error::Download(DownloadError::Failed { timed_out: true, .. })
        ));
    }
    // The second request got the slot instead of waiting out the queue timeout
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(tool.download_calls(), 0);
    assert_eq!(orchestrator.active_jobs(), 0);
    assert!(temp_files(&orchestrator).is_empty());
}
