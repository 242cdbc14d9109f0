//! Core types shared by the orchestrator, the tool layer and the API

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use utoipa::ToSchema;

/// Unique identifier of one download job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub u64);

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a finished artifact is handed back to the caller
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMode {
    /// Binary `video/mp4` body streamed from disk
    #[default]
    Stream,
    /// JSON body carrying a base64 `data:` URI (memory grows with file size)
    Base64,
}

impl std::str::FromStr for DeliveryMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stream" | "binary" => Ok(DeliveryMode::Stream),
            "base64" | "encoded" | "json" => Ok(DeliveryMode::Base64),
            other => Err(Error::Config {
                message: format!("unknown delivery mode '{}', expected stream or base64", other),
                key: Some("DELIVERY_MODE".to_string()),
            }),
        }
    }
}

/// Body of `POST /download`
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct DownloadRequest {
    /// Video page URL, passed to yt-dlp untouched
    #[serde(default)]
    pub url: Option<String>,

    /// Per-request override of the configured delivery mode
    #[serde(default)]
    pub delivery: Option<DeliveryMode>,
}

/// A URL that passed request validation
///
/// Only emptiness is checked here. Whether the URL points at playable media is
/// decided by the downloader's own probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUrl(String);

impl SourceUrl {
    /// Validate raw request input
    pub fn parse(input: Option<&str>) -> Result<Self> {
        match input.map(str::trim) {
            Some(url) if !url.is_empty() => Ok(SourceUrl(url.to_string())),
            _ => Err(Error::InvalidRequest("url is required".to_string())),
        }
    }

    /// The URL as given by the caller (trimmed)
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SourceUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle stage of a request, used in logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Request accepted by the handler
    Received,
    /// Checking the request body
    Validating,
    /// Waiting for the metadata probe
    Probing,
    /// Downloader process running
    Downloading,
    /// Checking the artifact on disk
    Verifying,
    /// Streaming or encoding the artifact
    Delivering,
    /// Deleting the artifact
    Cleaning,
    /// Response handed off
    Completed,
    /// Terminal failure (cleanup still runs)
    Failed,
}

impl Stage {
    /// Stage name as it appears in logs
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Received => "received",
            Stage::Validating => "validating",
            Stage::Probing => "probing",
            Stage::Downloading => "downloading",
            Stage::Verifying => "verifying",
            Stage::Delivering => "delivering",
            Stage::Cleaning => "cleaning",
            Stage::Completed => "completed",
            Stage::Failed => "failed",
        }
    }
}

/// Result of a metadata-only probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    /// Title reported by the downloader
    pub title: String,
}

/// Everything a tool needs to run one download
#[derive(Debug, Clone)]
pub struct JobSpec {
    /// Job identifier, for logging
    pub id: JobId,
    /// Source URL
    pub url: SourceUrl,
    /// Where the artifact must be written
    pub output_path: PathBuf,
    /// Kill the process after this long
    pub timeout: Duration,
}

/// How a downloader process ended
#[must_use]
#[derive(Debug, Clone)]
pub struct JobOutcome {
    /// Whether the process exited with status 0
    pub success: bool,
    /// Exit code, `None` when killed by a signal or timeout
    pub exit_code: Option<i32>,
    /// Whether the job was killed for exceeding its timeout
    pub timed_out: bool,
    /// Tail of the process output
    pub diagnostics: String,
    /// Wall time of the process
    pub elapsed: Duration,
}

/// Capabilities of a media tool implementation
#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
pub struct ToolCapabilities {
    /// Can run metadata-only probes
    pub can_probe: bool,
    /// Can hand trim/scale post-processing to ffmpeg
    pub can_postprocess: bool,
}

/// Health information returned by `GET /health`
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HealthReport {
    /// "ok", "starting" or "draining"
    pub status: String,
    /// Whether downloads are currently accepted
    pub ready: bool,
    /// Crate version
    pub version: String,
    /// Seconds since the orchestrator was created
    pub uptime_secs: i64,
    /// Downloader tool status
    pub tool: ToolHealth,
    /// Temp directory status
    pub temp_dir: TempDirHealth,
    /// Jobs currently running
    pub active_jobs: usize,
    /// Maximum simultaneous jobs
    pub max_concurrent_downloads: usize,
}

/// Downloader presence and version
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ToolHealth {
    /// Implementation name
    pub name: String,
    /// Resolved binary path, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Version reported at startup
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Location of ffmpeg, when one was found
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ffmpeg_path: Option<String>,
    /// Tool capabilities
    pub capabilities: ToolCapabilities,
}

/// Temp directory state
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TempDirHealth {
    /// Directory path
    pub path: String,
    /// Whether the directory exists
    pub exists: bool,
    /// Whether a probe file could be created and removed
    pub writable: bool,
    /// Free bytes on the containing filesystem, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_bytes: Option<u64>,
}
