//! Trait for the external media downloader

use crate::types::{JobOutcome, JobSpec, ProbeResult, ToolCapabilities};
use async_trait::async_trait;
use std::path::Path;
use tokio_util::sync::CancellationToken;

/// Trait for tools that turn a URL into a video file on disk
///
/// The orchestrator only talks to this trait, so the real `yt-dlp` binary can
/// be swapped for a stub in tests or for another downloader later.
///
/// # Examples
///
/// ```no_run
/// use ytdlp_gateway::tools::{MediaTool, YtDlpCli};
/// use ytdlp_gateway::types::{JobId, JobSpec, SourceUrl};
/// use std::time::Duration;
/// use tokio_util::sync::CancellationToken;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let tool = YtDlpCli::from_path().expect("yt-dlp not found in PATH");
///
/// let job = JobSpec {
///     id: JobId(1),
///     url: SourceUrl::parse(Some("https://example.com/watch?v=abc"))?,
///     output_path: "/tmp/ytdlp-example.mp4".into(),
///     timeout: Duration::from_secs(60),
/// };
/// let probe = tool.probe(&job, CancellationToken::new()).await?;
/// println!("title: {}", probe.title);
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait MediaTool: Send + Sync {
    /// Resolve `job.url` without downloading anything
    ///
    /// The probe runs under the same bounds as a download: it is killed when
    /// `job.timeout` elapses or `cancel` fires.
    ///
    /// # Errors
    ///
    /// - [`crate::Error::UnreachableSource`] if the tool rejects the URL
    /// - [`crate::Error::ToolUnavailable`] if the tool cannot be executed
    /// - [`crate::error::DownloadError::Failed`] with `timed_out` set on timeout
    /// - [`crate::error::DownloadError::Cancelled`] if `cancel` fires first
    async fn probe(&self, job: &JobSpec, cancel: CancellationToken)
    -> crate::Result<ProbeResult>;

    /// Download `job.url` to `job.output_path`
    ///
    /// A process that exits non-zero or times out is reported through
    /// [`JobOutcome`], not as an error. Errors are reserved for failing to
    /// start the process and for cancellation.
    ///
    /// # Errors
    ///
    /// - [`crate::Error::ToolUnavailable`] if the process cannot be spawned
    /// - [`crate::error::DownloadError::Cancelled`] if `cancel` fires first
    async fn download(&self, job: &JobSpec, cancel: CancellationToken)
    -> crate::Result<JobOutcome>;

    /// Version string reported by the tool
    async fn version(&self) -> crate::Result<String>;

    /// Query capabilities of this tool
    fn capabilities(&self) -> ToolCapabilities;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;

    /// Path of the executable backing this tool, if there is one
    fn binary_path(&self) -> Option<&Path> {
        None
    }

    /// Path of the post-processor (ffmpeg) the tool hands work to, if found
    fn postprocessor_path(&self) -> Option<&Path> {
        None
    }
}

