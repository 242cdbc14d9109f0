//! Handing a verified artifact to the caller
//!
//! Both modes take ownership of the [`FetchedArtifact`] so the file is deleted
//! exactly once, whatever happens to the response:
//! - [`open_stream`] reads the file lazily; it is deleted when the stream ends,
//!   fails, or is dropped by a disconnecting client
//! - [`encode_base64`] reads the whole file, deletes it, then encodes

use crate::error::{Error, Result};
use crate::orchestrator::{Artifact, FetchedArtifact};
use crate::types::{JobId, Stage};
use crate::utils::safe_filename;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use futures::Stream;
use serde::Serialize;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use utoipa::ToSchema;

/// Content type of every artifact
pub const VIDEO_CONTENT_TYPE: &str = "video/mp4";

/// A streaming response body plus the headers it needs
#[derive(Debug)]
pub struct StreamDelivery {
    /// File bytes; deletes the artifact once finished or dropped
    pub stream: ArtifactStream,
    /// Exact size of the file when the stream was opened
    pub content_length: u64,
    /// Suggested download name including extension
    pub filename: String,
}

/// Body of an encoded-mode response
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EncodedDelivery {
    /// `data:video/mp4;base64,...`
    pub video_url: String,
    /// Human-readable status
    pub message: String,
    /// Title from the probe, when one ran
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Size of the decoded video in bytes
    pub size: u64,
}

/// File reader that owns the artifact it reads
#[derive(Debug)]
pub struct ArtifactStream {
    inner: ReaderStream<File>,
    artifact: Option<Artifact>,
    job_id: JobId,
}

impl ArtifactStream {
    fn finish(&mut self, stage: Stage) {
        if let Some(artifact) = self.artifact.take() {
            tracing::debug!(job_id = self.job_id.0, stage = stage.as_str(), "stream finished");
            drop(artifact);
        }
    }
}

impl Stream for ArtifactStream {
    type Item = std::io::Result<axum::body::Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        match Pin::new(&mut this.inner).poll_next(cx) {
            Poll::Ready(None) => {
                this.finish(Stage::Completed);
                Poll::Ready(None)
            }
            Poll::Ready(Some(Err(e))) => {
                tracing::warn!(job_id = this.job_id.0, error = %e, "failed reading artifact mid-stream");
                this.finish(Stage::Failed);
                Poll::Ready(Some(Err(e)))
            }
            other => other,
        }
    }
}

impl Drop for ArtifactStream {
    fn drop(&mut self) {
        if self.artifact.is_some() {
            tracing::info!(job_id = self.job_id.0, "client went away before stream finished");
        }
    }
}

/// Open the artifact for a streamed response
///
/// # Errors
///
/// Returns [`Error::DeliveryFailed`] if the file cannot be opened; the artifact
/// is deleted before returning.
pub async fn open_stream(fetched: FetchedArtifact) -> Result<StreamDelivery> {
    let FetchedArtifact {
        job_id,
        artifact,
        title,
        ..
    } = fetched;
    tracing::debug!(job_id = job_id.0, stage = Stage::Delivering.as_str(), "opening stream");

    let opened = match File::open(artifact.path()).await {
        Ok(file) => file.metadata().await.map(|m| (file, m.len())),
        Err(e) => Err(e),
    };

    match opened {
        Ok((file, content_length)) => Ok(StreamDelivery {
            stream: ArtifactStream {
                inner: ReaderStream::new(file),
                artifact: Some(artifact),
                job_id,
            },
            content_length,
            filename: format!("{}.mp4", safe_filename(title.as_deref())),
        }),
        Err(e) => {
            tracing::error!(job_id = job_id.0, error = %e, "could not open artifact for streaming");
            artifact.remove().await;
            Err(Error::DeliveryFailed(e.to_string()))
        }
    }
}

/// Read the artifact into a base64 `data:` URI and delete it
///
/// # Errors
///
/// Returns [`Error::DeliveryFailed`] if the file cannot be read; the artifact
/// is deleted either way.
pub async fn encode_base64(fetched: FetchedArtifact) -> Result<EncodedDelivery> {
    let FetchedArtifact {
        job_id,
        artifact,
        title,
        ..
    } = fetched;
    tracing::debug!(job_id = job_id.0, stage = Stage::Delivering.as_str(), "encoding artifact");

    let read = tokio::fs::read(artifact.path()).await;

    tracing::debug!(job_id = job_id.0, stage = Stage::Cleaning.as_str(), "deleting artifact");
    artifact.remove().await;

    let bytes = read.map_err(|e| {
        tracing::error!(job_id = job_id.0, error = %e, "could not read artifact");
        Error::DeliveryFailed(e.to_string())
    })?;

    let mut video_url = String::with_capacity(bytes.len() * 4 / 3 + 32);
    video_url.push_str("data:");
    video_url.push_str(VIDEO_CONTENT_TYPE);
    video_url.push_str(";base64,");
    STANDARD.encode_string(&bytes, &mut video_url);

    Ok(EncodedDelivery {
        video_url,
        message: "Video downloaded successfully".to_string(),
        title,
        size: bytes.len() as u64,
    })
}
