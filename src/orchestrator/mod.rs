//! Download orchestration split into focused submodules.
//!
//! The [`Orchestrator`] runs one request through
//! validate → (probe) → download → verify and hands back a verified
//! [`Artifact`] for delivery:
//! - [`artifact`] - unique naming, verification and guaranteed deletion
//! - [`readiness`] - the startup/shutdown gate consulted per request
//! - [`sweep`] - reconciliation of orphaned files in the temp directory
//! - [`lifecycle`] - initialization, periodic sweeping and shutdown
//! - [`pipeline`] - the per-request job flow

pub mod artifact;
mod health;
mod lifecycle;
mod pipeline;
pub mod readiness;
pub mod sweep;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use artifact::{Artifact, ArtifactNamer, verify_artifact};
pub use pipeline::FetchedArtifact;
pub use readiness::{Readiness, ReadinessGate};
pub use sweep::{SweepReport, sweep_stale_artifacts};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::tools::MediaTool;
use crate::types::JobId;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

/// A running downloader process, as seen by shutdown and the sweep
#[derive(Debug, Clone)]
pub(crate) struct ActiveJob {
    /// Cancels the process (child of the shutdown token)
    pub(crate) token: CancellationToken,
    /// Where the job is writing
    pub(crate) artifact_path: PathBuf,
}

/// Admission control and bookkeeping for running jobs
#[derive(Clone)]
pub(crate) struct JobState {
    /// Semaphore capping simultaneous downloader processes
    pub(crate) concurrent_limit: Arc<tokio::sync::Semaphore>,
    /// Map of running jobs to their cancellation tokens and output paths
    pub(crate) active_jobs: Arc<Mutex<HashMap<JobId, ActiveJob>>>,
    /// Next job ID
    pub(crate) next_job_id: Arc<AtomicU64>,
    /// Parent of every job token; cancelled on shutdown
    pub(crate) shutdown_token: CancellationToken,
}

impl JobState {
    fn new(max_concurrent: usize) -> Self {
        Self {
            concurrent_limit: Arc::new(tokio::sync::Semaphore::new(max_concurrent)),
            active_jobs: Arc::new(Mutex::new(HashMap::new())),
            next_job_id: Arc::new(AtomicU64::new(1)),
            shutdown_token: CancellationToken::new(),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<JobId, ActiveJob>> {
        // The map holds plain data, so a panic elsewhere cannot leave it inconsistent
        self.active_jobs
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn next_id(&self) -> JobId {
        JobId(self.next_job_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Record a running job; the returned guard unregisters it on drop
    pub(crate) fn register(&self, id: JobId, artifact_path: PathBuf) -> JobRegistration {
        let token = self.shutdown_token.child_token();
        self.lock().insert(
            id,
            ActiveJob {
                token: token.clone(),
                artifact_path,
            },
        );
        JobRegistration {
            id,
            token,
            state: self.clone(),
        }
    }

    pub(crate) fn active_count(&self) -> usize {
        self.lock().len()
    }

    /// File stems of every running job's artifact
    pub(crate) fn active_stems(&self) -> HashSet<String> {
        self.lock()
            .values()
            .filter_map(|job| job.artifact_path.file_stem())
            .filter_map(|stem| stem.to_str())
            .map(str::to_string)
            .collect()
    }

    pub(crate) fn cancel_all(&self) {
        let jobs = self.lock();
        tracing::debug!(active_count = jobs.len(), "cancelling all active jobs");
        for (id, job) in jobs.iter() {
            tracing::debug!(job_id = id.0, "signalling cancellation");
            job.token.cancel();
        }
    }
}

/// Keeps a job listed as active for as long as it lives
pub(crate) struct JobRegistration {
    id: JobId,
    token: CancellationToken,
    state: JobState,
}

impl JobRegistration {
    pub(crate) fn token(&self) -> CancellationToken {
        self.token.clone()
    }
}

impl Drop for JobRegistration {
    fn drop(&mut self) {
        self.state.lock().remove(&self.id);
    }
}

/// Download orchestrator (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct Orchestrator {
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// External downloader (trait object for pluggable implementations)
    pub(crate) tool: Arc<dyn MediaTool>,
    /// Startup/shutdown gate
    pub(crate) readiness: ReadinessGate,
    /// Admission control and running jobs
    pub(crate) jobs: JobState,
    /// Unique artifact paths inside the temp directory
    pub(crate) namer: Arc<ArtifactNamer>,
    /// Tool version captured during initialization
    pub(crate) tool_version: Arc<tokio::sync::OnceCell<String>>,
    /// Creation time, for uptime reporting
    pub(crate) started_at: chrono::DateTime<chrono::Utc>,
}

impl Orchestrator {
    /// Create a new orchestrator
    ///
    /// Validates the configuration and makes sure the temp directory exists.
    /// The readiness gate starts closed; call [`Orchestrator::initialize`] to
    /// open it.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the temp directory
    /// cannot be created.
    pub async fn new(config: Config, tool: Arc<dyn MediaTool>) -> Result<Self> {
        config.validate()?;

        tokio::fs::create_dir_all(&config.download.temp_dir)
            .await
            .map_err(|e| {
                Error::Io(std::io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to create temp directory '{}': {}",
                        config.download.temp_dir.display(),
                        e
                    ),
                ))
            })?;

        tracing::info!(
            temp_dir = %config.download.temp_dir.display(),
            tool = tool.name(),
            max_concurrent = config.download.max_concurrent_downloads,
            "orchestrator created"
        );

        Ok(Self {
            jobs: JobState::new(config.download.max_concurrent_downloads),
            namer: Arc::new(ArtifactNamer::new(config.download.temp_dir.clone())),
            config: Arc::new(config),
            tool,
            readiness: ReadinessGate::new(),
            tool_version: Arc::new(tokio::sync::OnceCell::new()),
            started_at: chrono::Utc::now(),
        })
    }

    /// Shared configuration
    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    /// The readiness gate
    pub fn readiness(&self) -> &ReadinessGate {
        &self.readiness
    }

    /// Number of downloader processes currently running
    pub fn active_jobs(&self) -> usize {
        self.jobs.active_count()
    }
}
