//! CLI-based downloader using the external yt-dlp binary

use super::args::{download_args, probe_args};
use super::output::collect_lines;
use super::traits::MediaTool;
use crate::config::{FormatConfig, ToolsConfig};
use crate::error::{DownloadError, Error};
use crate::types::{JobOutcome, JobSpec, ProbeResult, ToolCapabilities};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

/// How long to wait for output readers after the process is gone
///
/// ffmpeg children can keep the pipes open briefly after yt-dlp exits.
const READER_GRACE: Duration = Duration::from_secs(2);

/// CLI-based downloader using the external `yt-dlp` binary
///
/// # Examples
///
/// ```no_run
/// use ytdlp_gateway::tools::YtDlpCli;
/// use std::path::PathBuf;
///
/// // Create with explicit path
/// let tool = YtDlpCli::new(PathBuf::from("/usr/local/bin/yt-dlp"));
///
/// // Or auto-discover from PATH
/// let tool = YtDlpCli::from_path().expect("yt-dlp not found in PATH");
/// ```
#[derive(Debug)]
pub struct YtDlpCli {
    binary_path: PathBuf,
    ffmpeg_path: Option<PathBuf>,
    format: FormatConfig,
}

impl YtDlpCli {
    /// Create a new CLI tool with an explicit binary path and default format settings
    pub fn new(binary_path: PathBuf) -> Self {
        Self {
            binary_path,
            ffmpeg_path: None,
            format: FormatConfig::default(),
        }
    }

    /// Attempt to find yt-dlp in PATH
    ///
    /// Uses the `which` crate to search for the `yt-dlp` binary in the system PATH.
    pub fn from_path() -> Option<Self> {
        which::which("yt-dlp").ok().map(Self::new)
    }

    /// Locate yt-dlp (and optionally ffmpeg) according to `tools`
    ///
    /// An explicit path must point at an executable; otherwise PATH is searched
    /// when `search_path` is enabled. ffmpeg is optional: yt-dlp finds it on its
    /// own when no explicit location is given.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ToolUnavailable`] when yt-dlp cannot be found.
    pub fn discover(tools: &ToolsConfig, format: FormatConfig) -> crate::Result<Self> {
        let binary_path = locate_binary("yt-dlp", tools.ytdlp_path.as_deref(), tools.search_path)
            .ok_or_else(|| {
                Error::ToolUnavailable(match &tools.ytdlp_path {
                    Some(path) => format!("yt-dlp not executable at {}", path.display()),
                    None => "yt-dlp not found in PATH".to_string(),
                })
            })?;

        tracing::info!(path = %binary_path.display(), "found yt-dlp");

        let ffmpeg_path = locate_binary("ffmpeg", tools.ffmpeg_path.as_deref(), tools.search_path);
        if ffmpeg_path.is_none() {
            tracing::warn!("ffmpeg not found; merging and trimming will fail for formats that need it");
        }

        Ok(Self {
            binary_path,
            ffmpeg_path,
            format,
        })
    }

    /// Use this ffmpeg binary for post-processing
    pub fn with_ffmpeg(mut self, ffmpeg_path: PathBuf) -> Self {
        self.ffmpeg_path = Some(ffmpeg_path);
        self
    }

    /// Use these format settings
    pub fn with_format(mut self, format: FormatConfig) -> Self {
        self.format = format;
        self
    }

    fn spawn_error(&self, e: std::io::Error) -> Error {
        Error::ToolUnavailable(format!(
            "Failed to execute yt-dlp at {}: {}",
            self.binary_path.display(),
            e
        ))
    }
}

fn locate_binary(name: &str, explicit: Option<&Path>, search_path: bool) -> Option<PathBuf> {
    match explicit {
        // which() accepts paths too and checks they are executable files
        Some(path) => which::which(path).ok(),
        None if search_path => which::which(name).ok(),
        None => None,
    }
}

#[async_trait]
impl MediaTool for YtDlpCli {
    async fn probe(
        &self,
        job: &JobSpec,
        cancel: CancellationToken,
    ) -> crate::Result<ProbeResult> {
        let mut command = Command::new(&self.binary_path);
        command
            .args(probe_args(&job.url))
            .stdin(Stdio::null())
            .kill_on_drop(true);

        // Dropping the pending output() future drops the child, which kills it
        let output = tokio::select! {
            output = command.output() => output.map_err(|e| self.spawn_error(e))?,
            _ = cancel.cancelled() => {
                tracing::info!(job_id = job.id.0, "cancelling yt-dlp probe");
                return Err(Error::Download(DownloadError::Cancelled));
            }
            _ = tokio::time::sleep(job.timeout) => {
                tracing::warn!(
                    job_id = job.id.0,
                    timeout_secs = job.timeout.as_secs(),
                    "yt-dlp probe exceeded job timeout, killing"
                );
                return Err(Error::Download(DownloadError::Failed {
                    exit_code: None,
                    timed_out: true,
                    diagnostics: "probe timed out".to_string(),
                }));
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let title = stdout.lines().map(str::trim).find(|l| !l.is_empty());

        match (output.status.success(), title) {
            (true, Some(title)) => Ok(ProbeResult {
                title: title.to_string(),
            }),
            _ => Err(Error::UnreachableSource {
                url: job.url.to_string(),
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }),
        }
    }

    async fn download(
        &self,
        job: &JobSpec,
        cancel: CancellationToken,
    ) -> crate::Result<JobOutcome> {
        let args = download_args(
            &self.format,
            self.ffmpeg_path.as_deref(),
            &job.url,
            &job.output_path,
        );

        tracing::debug!(job_id = job.id.0, ?args, "spawning yt-dlp");
        let started = Instant::now();

        let mut child = Command::new(&self.binary_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        let stdout = child
            .stdout
            .take()
            .map(|out| tokio::spawn(collect_lines(out, job.id, "stdout")));
        let stderr = child
            .stderr
            .take()
            .map(|err| tokio::spawn(collect_lines(err, job.id, "stderr")));

        let mut timed_out = false;
        let status = tokio::select! {
            status = child.wait() => Some(status?),
            _ = cancel.cancelled() => {
                tracing::info!(job_id = job.id.0, "cancelling yt-dlp");
                if let Err(e) = child.kill().await {
                    tracing::warn!(job_id = job.id.0, error = %e, "failed to kill yt-dlp");
                }
                return Err(Error::Download(DownloadError::Cancelled));
            }
            _ = tokio::time::sleep(job.timeout) => {
                tracing::warn!(
                    job_id = job.id.0,
                    timeout_secs = job.timeout.as_secs(),
                    "yt-dlp exceeded job timeout, killing"
                );
                timed_out = true;
                if let Err(e) = child.kill().await {
                    tracing::warn!(job_id = job.id.0, error = %e, "failed to kill yt-dlp");
                }
                None
            }
        };

        let mut diagnostics = String::new();
        for reader in [stderr, stdout].into_iter().flatten() {
            match tokio::time::timeout(READER_GRACE, reader).await {
                Ok(Ok(tail)) => diagnostics.push_str(&tail.render()),
                Ok(Err(e)) => tracing::debug!(job_id = job.id.0, error = %e, "output reader failed"),
                Err(_) => tracing::debug!(job_id = job.id.0, "output reader still open, giving up on it"),
            }
        }

        Ok(JobOutcome {
            success: status.is_some_and(|s| s.success()),
            exit_code: status.and_then(|s| s.code()),
            timed_out,
            diagnostics,
            elapsed: started.elapsed(),
        })
    }

    async fn version(&self) -> crate::Result<String> {
        let output = Command::new(&self.binary_path)
            .arg("--version")
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            return Err(Error::ToolUnavailable(format!(
                "yt-dlp --version exited with {}",
                output.status
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn capabilities(&self) -> ToolCapabilities {
        ToolCapabilities {
            can_probe: true,
            can_postprocess: self.ffmpeg_path.is_some(),
        }
    }

    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    fn binary_path(&self) -> Option<&Path> {
        Some(&self.binary_path)
    }

    fn postprocessor_path(&self) -> Option<&Path> {
        self.ffmpeg_path.as_deref()
    }
}
