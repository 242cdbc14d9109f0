//! Error types for ytdlp-gateway
//!
//! This module provides the error taxonomy for the gateway, including:
//! - Request, download, artifact and delivery failures
//! - HTTP status code mapping for the API layer
//! - Structured error responses with machine-readable error codes
//!
//! Subprocess diagnostics travel inside [`DownloadError::Failed`] so they can
//! be logged, but they are never part of an error's `Display` text and never
//! reach an HTTP client.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for ytdlp-gateway operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for ytdlp-gateway
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "MAX_FILESIZE_MB")
        key: Option<String>,
    },

    /// The caller sent a request this service cannot act on (missing URL, bad body)
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The metadata probe could not resolve the URL to playable media
    #[error("source could not be resolved")]
    UnreachableSource {
        /// The URL that failed to resolve
        url: String,
        /// Probe output, kept for server-side logging only
        reason: String,
    },

    /// Download job failure (process exit, artifact verification, cancellation)
    #[error("download error: {0}")]
    Download(#[from] DownloadError),

    /// I/O failure while streaming or encoding an artifact
    #[error("delivery failed: {0}")]
    DeliveryFailed(String),

    /// External tool is missing or cannot be executed
    #[error("external tool unavailable: {0}")]
    ToolUnavailable(String),

    /// Startup checks have not completed yet
    #[error("server is still initializing")]
    NotReady,

    /// Shutdown in progress - not accepting new downloads
    #[error("shutdown in progress: not accepting new downloads")]
    ShuttingDown,

    /// No download slot became free within the queue timeout
    #[error("all {capacity} download slots are busy")]
    Busy {
        /// Configured number of simultaneous downloads
        capacity: usize,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),
}

/// Errors produced while running a single download job
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The downloader process exited unsuccessfully or was killed on timeout
    #[error("downloader {}", describe_exit(.exit_code, .timed_out))]
    Failed {
        /// Process exit code, if the process exited normally
        exit_code: Option<i32>,
        /// Whether the job was killed for exceeding the job timeout
        timed_out: bool,
        /// Tail of the captured stdout/stderr, for server-side logs only
        diagnostics: String,
    },

    /// The downloader reported success but the artifact is zero bytes
    #[error("artifact at {path} is empty")]
    EmptyArtifact {
        /// Where the artifact was expected
        path: PathBuf,
    },

    /// The downloader reported success but no artifact was written
    #[error("artifact at {path} is missing")]
    MissingArtifact {
        /// Where the artifact was expected
        path: PathBuf,
    },

    /// The job was cancelled (shutdown or client disconnect) before finishing
    #[error("download cancelled")]
    Cancelled,
}

fn describe_exit(exit_code: &Option<i32>, timed_out: &bool) -> String {
    match (exit_code, timed_out) {
        (_, true) => "timed out and was killed".to_string(),
        (Some(code), false) => format!("exited with code {}", code),
        (None, false) => "was terminated by a signal".to_string(),
    }
}

/// API error response format
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "download_failed",
///     "message": "Failed to download video",
///     "details": {
///       "reason": "download error: downloader exited with code 1",
///       "exit_code": 1
///     }
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "invalid_request", "download_failed")
    pub code: String,

    /// Human-readable, generic error message
    pub message: String,

    /// Optional additional context, only present when detail exposure is enabled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    /// Create an API error with additional details
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    /// Build the response body for `error`, attaching details only when asked to
    pub fn from_error(error: &Error, expose_details: bool) -> Self {
        let code = error.error_code().to_string();
        let message = error.public_message();

        if !expose_details {
            return Self::new(code, message);
        }

        let mut details = serde_json::json!({ "reason": error.to_string() });
        match error {
            Error::Download(DownloadError::Failed {
                exit_code,
                timed_out,
                ..
            }) => {
                details["exit_code"] = serde_json::json!(exit_code);
                details["timed_out"] = serde_json::json!(timed_out);
            }
            Error::Busy { capacity } => {
                details["capacity"] = serde_json::json!(capacity);
            }
            Error::Config { key: Some(key), .. } => {
                details["key"] = serde_json::json!(key);
            }
            _ => {}
        }

        Self::with_details(code, message, details)
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - caller input errors
            Error::InvalidRequest(_) => 400,

            // 503 Service Unavailable - not accepting work right now
            Error::NotReady => 503,
            Error::ShuttingDown => 503,
            Error::Busy { .. } => 503,

            // 500 Internal Server Error - everything downstream of the request
            Error::Config { .. } => 500,
            Error::UnreachableSource { .. } => 500,
            Error::Download(_) => 500,
            Error::DeliveryFailed(_) => 500,
            Error::ToolUnavailable(_) => 500,
            Error::Io(_) => 500,
            Error::ApiServerError(_) => 500,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::InvalidRequest(_) => "invalid_request",
            Error::UnreachableSource { .. } => "unreachable_source",
            Error::Download(e) => match e {
                DownloadError::Failed { .. } => "download_failed",
                DownloadError::EmptyArtifact { .. } => "empty_artifact",
                DownloadError::MissingArtifact { .. } => "missing_artifact",
                DownloadError::Cancelled => "cancelled",
            },
            Error::DeliveryFailed(_) => "delivery_failed",
            Error::ToolUnavailable(_) => "tool_unavailable",
            Error::NotReady => "not_ready",
            Error::ShuttingDown => "shutting_down",
            Error::Busy { .. } => "busy",
            Error::Io(_) => "io_error",
            Error::ApiServerError(_) => "api_server_error",
        }
    }
}

impl Error {
    /// Message safe to show to any caller
    ///
    /// Input errors echo their own text; downstream failures collapse to a
    /// fixed sentence so URL-derived content never travels back in a response.
    pub fn public_message(&self) -> String {
        match self {
            Error::InvalidRequest(msg) => msg.clone(),
            Error::UnreachableSource { .. } => {
                "The URL could not be resolved to a downloadable video".to_string()
            }
            Error::Download(DownloadError::EmptyArtifact { .. })
            | Error::Download(DownloadError::MissingArtifact { .. }) => {
                "Download produced no usable file".to_string()
            }
            Error::Download(DownloadError::Cancelled) => "Download was cancelled".to_string(),
            Error::Download(DownloadError::Failed { .. }) => {
                "Failed to download video".to_string()
            }
            Error::DeliveryFailed(_) => "Failed to deliver the downloaded video".to_string(),
            Error::ToolUnavailable(_) => "Video downloader is not available".to_string(),
            Error::NotReady => "Server is still initializing, try again shortly".to_string(),
            Error::ShuttingDown => "Server is shutting down".to_string(),
            Error::Busy { .. } => "Too many downloads in progress, try again later".to_string(),
            _ => "Internal server error".to_string(),
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        ApiError::from_error(&error, false)
    }
}
