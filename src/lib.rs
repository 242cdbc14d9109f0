//! # ytdlp-gateway
//!
//! HTTP gateway that downloads a video through `yt-dlp` and hands the file
//! back to the caller.
//!
//! ## Request flow
//!
//! `POST /download {"url": "..."}` is validated, optionally probed, downloaded
//! by a `yt-dlp` subprocess into a uniquely named temp file, verified to be
//! non-empty, then delivered either as a streamed `video/mp4` body or as a JSON
//! object carrying a base64 data URI. The temp file is deleted on every path,
//! including client disconnects and shutdown.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use ytdlp_gateway::{Config, Orchestrator, YtDlpCli};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let tool = YtDlpCli::discover(&config.tools, config.format.clone())?;
//!     let orchestrator = Orchestrator::new(config, Arc::new(tool)).await?;
//!
//!     let listener = ytdlp_gateway::api::bind(&orchestrator).await?;
//!     orchestrator.initialize().await?;
//!
//!     let server = tokio::spawn(ytdlp_gateway::api::serve(
//!         listener,
//!         orchestrator.clone(),
//!         std::future::pending(),
//!     ));
//!
//!     ytdlp_gateway::run_with_shutdown(orchestrator).await?;
//!     server.abort();
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// HTTP API
pub mod api;
/// Configuration types
pub mod config;
/// Streaming and base64 delivery of artifacts
pub mod delivery;
/// Error types
pub mod error;
/// Job orchestration: admission, download, verification, cleanup
pub mod orchestrator;
/// External downloader integration
pub mod tools;
/// Core types
pub mod types;
/// Filesystem and naming helpers
pub mod utils;

pub use config::{Config, FormatConfig, FormatPolicy};
pub use error::{Error, Result};
pub use orchestrator::{Artifact, FetchedArtifact, Orchestrator, Readiness, ReadinessGate};
pub use tools::{MediaTool, YtDlpCli};
pub use types::{DeliveryMode, DownloadRequest, HealthReport, JobId, SourceUrl};

/// Wait for a termination signal, then shut the orchestrator down
///
/// Listens for SIGTERM and SIGINT on Unix, Ctrl+C elsewhere. Once a signal
/// arrives, new downloads are refused, running jobs are cancelled and their
/// files deleted.
pub async fn run_with_shutdown(orchestrator: Orchestrator) -> Result<()> {
    wait_for_signal().await;
    orchestrator.shutdown().await
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Signal registration may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
