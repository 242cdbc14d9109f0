//! Shared test helpers for creating Orchestrator instances in tests.

use crate::config::Config;
use crate::error::{DownloadError, Error, Result};
use crate::orchestrator::Orchestrator;
use crate::tools::MediaTool;
use crate::types::{JobOutcome, JobSpec, ProbeResult, SourceUrl, ToolCapabilities};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::tempdir;
use tokio_util::sync::CancellationToken;

/// What the stub does when asked to download
#[derive(Debug, Clone)]
pub(crate) enum StubBehavior {
    /// Exit 0 after writing this many bytes (plus a `.part` side file)
    Write(usize),
    /// Exit 0 after creating an empty file
    WriteEmpty,
    /// Exit 0 without creating anything
    WriteNothing,
    /// Exit 1 after leaving a partial file behind
    Fail,
    /// Write a partial file then wait for cancellation or the job timeout
    Hang,
    /// Write the URL bytes after a short delay, so concurrent jobs interleave
    EchoUrl,
}

/// In-process stand-in for yt-dlp
pub(crate) struct StubMediaTool {
    pub(crate) behavior: StubBehavior,
    pub(crate) probe_fails: bool,
    pub(crate) probe_hangs: bool,
    pub(crate) can_probe: bool,
    pub(crate) probe_calls: AtomicUsize,
    pub(crate) download_calls: AtomicUsize,
    pub(crate) output_paths: Mutex<Vec<PathBuf>>,
}

impl StubMediaTool {
    pub(crate) fn new(behavior: StubBehavior) -> Self {
        Self {
            behavior,
            probe_fails: false,
            probe_hangs: false,
            can_probe: true,
            probe_calls: AtomicUsize::new(0),
            download_calls: AtomicUsize::new(0),
            output_paths: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn failing_probe(mut self) -> Self {
        self.probe_fails = true;
        self
    }

    /// Probe never answers; only cancellation or the job timeout end it
    pub(crate) fn hanging_probe(mut self) -> Self {
        self.probe_hangs = true;
        self
    }

    pub(crate) fn without_probe(mut self) -> Self {
        self.can_probe = false;
        self
    }

    pub(crate) fn download_calls(&self) -> usize {
        self.download_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn probe_calls(&self) -> usize {
        self.probe_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn output_paths(&self) -> Vec<PathBuf> {
        self.output_paths.lock().unwrap().clone()
    }
}

fn outcome(success: bool, exit_code: Option<i32>, timed_out: bool, diagnostics: &str) -> JobOutcome {
    JobOutcome {
        success,
        exit_code,
        timed_out,
        diagnostics: diagnostics.to_string(),
        elapsed: Duration::from_millis(1),
    }
}

fn part_path(output: &std::path::Path) -> PathBuf {
    let mut name = output.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

#[async_trait]
impl MediaTool for StubMediaTool {
    async fn probe(&self, job: &JobSpec, cancel: CancellationToken) -> Result<ProbeResult> {
        self.probe_calls.fetch_add(1, Ordering::SeqCst);
        if self.probe_hangs {
            return tokio::select! {
                _ = cancel.cancelled() => Err(DownloadError::Cancelled.into()),
                _ = tokio::time::sleep(job.timeout) => Err(DownloadError::Failed {
                    exit_code: None,
                    timed_out: true,
                    diagnostics: "probe timed out".to_string(),
                }
                .into()),
            };
        }
        if self.probe_fails {
            return Err(Error::UnreachableSource {
                url: job.url.to_string(),
                reason: "ERROR: Unsupported URL".to_string(),
            });
        }
        Ok(ProbeResult {
            title: "Stub Video".to_string(),
        })
    }

    async fn download(&self, job: &JobSpec, cancel: CancellationToken) -> Result<JobOutcome> {
        self.download_calls.fetch_add(1, Ordering::SeqCst);
        self.output_paths
            .lock()
            .unwrap()
            .push(job.output_path.clone());
        let output = &job.output_path;

        match &self.behavior {
            StubBehavior::Write(len) => {
                tokio::fs::write(part_path(output), b"partial").await?;
                tokio::fs::write(output, vec![0xAB; *len]).await?;
                Ok(outcome(true, Some(0), false, ""))
            }
            StubBehavior::WriteEmpty => {
                tokio::fs::write(output, b"").await?;
                Ok(outcome(true, Some(0), false, ""))
            }
            StubBehavior::WriteNothing => Ok(outcome(true, Some(0), false, "")),
            StubBehavior::Fail => {
                tokio::fs::write(part_path(output), b"partial").await?;
                Ok(outcome(
                    false,
                    Some(1),
                    false,
                    "ERROR: secret-token-in-stderr /internal/path",
                ))
            }
            StubBehavior::Hang => {
                tokio::fs::write(part_path(output), b"partial").await?;
                tokio::select! {
                    _ = cancel.cancelled() => Err(DownloadError::Cancelled.into()),
                    _ = tokio::time::sleep(job.timeout) => Ok(outcome(false, None, true, "killed")),
                }
            }
            StubBehavior::EchoUrl => {
                tokio::time::sleep(Duration::from_millis(20)).await;
                tokio::fs::write(output, job.url.as_str().as_bytes()).await?;
                Ok(outcome(true, Some(0), false, ""))
            }
        }
    }

    async fn version(&self) -> Result<String> {
        Ok("2024.01.01-stub".to_string())
    }

    fn capabilities(&self) -> ToolCapabilities {
        ToolCapabilities {
            can_probe: self.can_probe,
            can_postprocess: false,
        }
    }

    fn name(&self) -> &'static str {
        "stub"
    }
}

/// Config pointing at a temp directory inside `root`
pub(crate) fn test_config(root: &std::path::Path) -> Config {
    let mut config = Config::default();
    config.download.temp_dir = root.join("work");
    config.download.max_concurrent_downloads = 2;
    config.download.queue_timeout = Duration::from_millis(200);
    config.download.job_timeout = Duration::from_secs(5);
    config.download.sweep_interval = None;
    config
}

/// Create an initialized (ready) orchestrator around `tool`.
/// Returns the orchestrator and the tempdir (which must be kept alive).
pub(crate) async fn create_test_orchestrator(
    tool: Arc<StubMediaTool>,
) -> (Orchestrator, tempfile::TempDir) {
    let temp_dir = tempdir().unwrap();
    let config = test_config(temp_dir.path());
    create_test_orchestrator_with(tool, config, temp_dir).await
}

/// Like [`create_test_orchestrator`] with a caller-supplied config
pub(crate) async fn create_test_orchestrator_with(
    tool: Arc<StubMediaTool>,
    config: Config,
    temp_dir: tempfile::TempDir,
) -> (Orchestrator, tempfile::TempDir) {
    let orchestrator = Orchestrator::new(config, tool).await.unwrap();
    orchestrator.initialize().await.unwrap();
    (orchestrator, temp_dir)
}

/// Names of every file in the orchestrator's temp directory
pub(crate) fn temp_files(orchestrator: &Orchestrator) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(orchestrator.config().temp_dir())
        .unwrap()
        .flatten()
        .filter_map(|e| e.file_name().to_str().map(str::to_string))
        .collect();
    names.sort();
    names
}

pub(crate) fn url(s: &str) -> SourceUrl {
    SourceUrl::parse(Some(s)).unwrap()
}
