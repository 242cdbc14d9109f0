//! Startup, periodic sweeping and graceful shutdown

use super::{Orchestrator, SweepReport, sweep_stale_artifacts};
use crate::error::Result;
use std::time::Duration;

/// Upper bound on how long shutdown waits for running jobs to exit
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

impl Orchestrator {
    /// Run startup checks and open the readiness gate
    ///
    /// Records the tool version and removes every artifact left in the temp
    /// directory by a previous run. The gate stays closed if either step
    /// fails.
    pub async fn initialize(&self) -> Result<()> {
        let version = self.tool.version().await?;
        tracing::info!(tool = self.tool.name(), version = %version, "downloader available");
        // A second initialize keeps the first version
        let _ = self.tool_version.set(version);

        let report = self.sweep(None).await?;
        if report.removed > 0 || report.failed > 0 {
            tracing::info!(
                removed = report.removed,
                failed = report.failed,
                "removed artifacts left over from a previous run"
            );
        }

        if self.readiness.mark_ready() {
            tracing::info!("ready to accept downloads");
        } else {
            tracing::warn!("shutdown began before startup finished, staying closed");
        }
        Ok(())
    }

    /// Delete orphaned artifacts older than `max_age` (all of them with `None`)
    ///
    /// Files belonging to running jobs are always kept.
    pub async fn sweep(&self, max_age: Option<Duration>) -> Result<SweepReport> {
        let active = self.jobs.active_stems();
        sweep_stale_artifacts(self.namer.dir(), max_age, &active).await
    }

    /// Spawn the periodic stale-artifact sweep
    ///
    /// Returns `None` when the sweep interval is disabled. The task exits on
    /// shutdown.
    pub fn spawn_sweeper(&self) -> Option<tokio::task::JoinHandle<()>> {
        let interval = self.config.download.sweep_interval?;
        let max_age = self.config.download.stale_artifact_age;
        let orchestrator = self.clone();

        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately; startup already swept
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = orchestrator.jobs.shutdown_token.cancelled() => {
                        tracing::debug!("stale artifact sweeper stopping");
                        break;
                    }
                    _ = ticker.tick() => {
                        match orchestrator.sweep(Some(max_age)).await {
                            Ok(report) if report.removed > 0 || report.failed > 0 => {
                                tracing::info!(
                                    removed = report.removed,
                                    failed = report.failed,
                                    in_use = report.in_use,
                                    "stale artifact sweep finished"
                                );
                            }
                            Ok(_) => tracing::trace!("stale artifact sweep found nothing"),
                            Err(e) => tracing::warn!(error = %e, "stale artifact sweep failed"),
                        }
                    }
                }
            }
        }))
    }

    /// Gracefully shut down
    ///
    /// 1. Close the readiness gate and the download slots
    /// 2. Cancel every running job (their processes are killed and their
    ///    artifacts deleted)
    /// 3. Wait for the jobs to unregister, up to 30 seconds
    /// 4. Sweep the temp directory one last time
    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!("initiating graceful shutdown");

        self.readiness.begin_drain();
        self.jobs.concurrent_limit.close();
        tracing::info!("stopped accepting new downloads");

        self.jobs.cancel_all();
        self.jobs.shutdown_token.cancel();

        match tokio::time::timeout(SHUTDOWN_TIMEOUT, self.wait_for_active_jobs()).await {
            Ok(()) => tracing::info!("all running jobs stopped"),
            Err(_) => tracing::warn!(
                active_jobs = self.jobs.active_count(),
                "timeout waiting for jobs to stop, proceeding with shutdown"
            ),
        }

        match self.sweep(None).await {
            Ok(report) => tracing::debug!(removed = report.removed, "final sweep finished"),
            Err(e) => tracing::error!(error = %e, "final sweep failed"),
        }

        tracing::info!("graceful shutdown complete");
        Ok(())
    }

    async fn wait_for_active_jobs(&self) {
        loop {
            let active_count = self.jobs.active_count();
            if active_count == 0 {
                return;
            }
            tracing::debug!(active_count, "waiting for running jobs to stop");
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }
}
