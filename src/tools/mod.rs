//! External media tool integration
//!
//! Provides a trait-based abstraction over the downloader binary:
//! - [`MediaTool`] - the seam the orchestrator depends on
//! - [`YtDlpCli`] - implementation driving the `yt-dlp` executable
//! - [`args`] - argument vector construction

pub mod args;
mod cli;
mod output;
mod traits;

pub use cli::YtDlpCli;
pub use traits::MediaTool;
