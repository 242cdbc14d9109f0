//! Per-request job flow: probe, download, verify.

use super::{Artifact, Orchestrator, verify_artifact};
use crate::error::{DownloadError, Error, Result};
use crate::types::{JobId, JobOutcome, JobSpec, SourceUrl, Stage};
use tokio::sync::OwnedSemaphorePermit;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// A downloaded, verified artifact ready for delivery
#[derive(Debug)]
pub struct FetchedArtifact {
    /// Job that produced the artifact
    pub job_id: JobId,
    /// The file; deleting it is now the deliverer's job
    pub artifact: Artifact,
    /// Size in bytes at verification time
    pub size: u64,
    /// Title from the probe, when one ran
    pub title: Option<String>,
}

impl Orchestrator {
    /// Check request input; only emptiness is rejected
    pub fn validate_url(&self, input: Option<&str>) -> Result<SourceUrl> {
        SourceUrl::parse(input)
    }

    /// Resolve the URL with a metadata-only probe, when enabled
    ///
    /// Returns `Ok(None)` when probing is disabled or the tool cannot probe.
    /// The probe is bounded by `job.timeout` and `cancel`, like a download.
    pub async fn probe_title(
        &self,
        job: &JobSpec,
        cancel: CancellationToken,
    ) -> Result<Option<String>> {
        if !self.config.download.probe_before_download || !self.tool.capabilities().can_probe {
            return Ok(None);
        }

        match self.tool.probe(job, cancel).await {
            Ok(probe) => Ok(Some(probe.title)),
            Err(Error::UnreachableSource { url, reason }) => {
                warn!(job_id = job.id.0, %url, reason = %reason, "probe rejected source");
                Err(Error::UnreachableSource { url, reason })
            }
            Err(e) => Err(e),
        }
    }

    /// Run the downloader for one job and wait for it to finish
    ///
    /// Non-zero exits and timeouts become [`DownloadError::Failed`]; the
    /// captured output is logged here and goes no further.
    pub async fn run_download(
        &self,
        job: &JobSpec,
        cancel: CancellationToken,
    ) -> Result<JobOutcome> {
        let outcome = self.tool.download(job, cancel).await?;

        if outcome.success {
            info!(
                job_id = job.id.0,
                elapsed_ms = outcome.elapsed.as_millis() as u64,
                "downloader finished"
            );
            return Ok(outcome);
        }

        error!(
            job_id = job.id.0,
            url = %job.url,
            exit_code = ?outcome.exit_code,
            timed_out = outcome.timed_out,
            diagnostics = %outcome.diagnostics,
            "downloader failed"
        );
        Err(Error::Download(DownloadError::Failed {
            exit_code: outcome.exit_code,
            timed_out: outcome.timed_out,
            diagnostics: outcome.diagnostics,
        }))
    }

    /// Take a request from validated URL to verified artifact
    ///
    /// The job counts as active from the moment it holds a download slot, so
    /// shutdown sees and cancels it while probing as well as downloading.
    /// `job_timeout` bounds probe and download together. On every failure
    /// path the artifact (including partial output) is deleted before the
    /// error is returned.
    ///
    /// # Errors
    ///
    /// - [`Error::NotReady`] / [`Error::ShuttingDown`] when the gate is closed
    /// - [`Error::Busy`] when no download slot frees up in time
    /// - [`Error::UnreachableSource`] when the probe rejects the URL
    /// - [`Error::Download`] for process failures, timeouts, cancellation and
    ///   bad artifacts
    /// - [`Error::ToolUnavailable`] when the downloader cannot be started
    pub async fn fetch(&self, url: &SourceUrl) -> Result<FetchedArtifact> {
        self.readiness.check()?;

        let id = self.jobs.next_id();
        debug!(job_id = id.0, %url, stage = Stage::Received.as_str(), "job received");

        let permit = self.acquire_slot(id).await?;
        let artifact = self.namer.allocate();
        let registration = self.jobs.register(id, artifact.path().to_path_buf());

        let job = JobSpec {
            id,
            url: url.clone(),
            output_path: artifact.path().to_path_buf(),
            timeout: self.config.download.job_timeout,
        };
        let fetched = self.probe_and_download(job, registration.token()).await;
        drop(registration);
        drop(permit);

        let verified = match fetched {
            Ok(title) => {
                debug!(job_id = id.0, stage = Stage::Verifying.as_str(), "verifying artifact");
                verify_artifact(artifact.path()).await.map(|size| (size, title))
            }
            Err(e) => Err(e),
        };

        match verified {
            Ok((size, title)) => {
                info!(job_id = id.0, size, "artifact ready");
                Ok(FetchedArtifact {
                    job_id: id,
                    artifact,
                    size,
                    title,
                })
            }
            Err(e) => {
                warn!(
                    job_id = id.0,
                    stage = Stage::Failed.as_str(),
                    error = %e,
                    "job failed, cleaning up"
                );
                artifact.remove().await;
                Err(e)
            }
        }
    }

    /// Probe then download, sharing one deadline; returns the probed title
    async fn probe_and_download(
        &self,
        mut job: JobSpec,
        cancel: CancellationToken,
    ) -> Result<Option<String>> {
        let deadline = Instant::now() + job.timeout;

        // A job admitted while shutdown was cancelling the others starts cancelled
        if cancel.is_cancelled() {
            return Err(DownloadError::Cancelled.into());
        }

        debug!(job_id = job.id.0, stage = Stage::Probing.as_str(), "probing source");
        let title = self.probe_title(&job, cancel.clone()).await?;

        if cancel.is_cancelled() {
            return Err(DownloadError::Cancelled.into());
        }

        job.timeout = deadline.saturating_duration_since(Instant::now());
        debug!(
            job_id = job.id.0,
            stage = Stage::Downloading.as_str(),
            path = %job.output_path.display(),
            remaining_ms = job.timeout.as_millis() as u64,
            "starting download"
        );
        self.run_download(&job, cancel).await?;
        Ok(title)
    }

    async fn acquire_slot(&self, id: JobId) -> Result<OwnedSemaphorePermit> {
        let limit = self.jobs.concurrent_limit.clone();
        let capacity = self.config.download.max_concurrent_downloads;

        if limit.available_permits() == 0 {
            debug!(job_id = id.0, capacity, "waiting for a download slot");
        }

        match tokio::time::timeout(self.config.download.queue_timeout, limit.acquire_owned()).await
        {
            Ok(Ok(permit)) => Ok(permit),
            // The semaphore is closed only during shutdown
            Ok(Err(_)) => Err(Error::ShuttingDown),
            Err(_) => {
                warn!(job_id = id.0, capacity, "no download slot within queue timeout");
                Err(Error::Busy { capacity })
            }
        }
    }
}
