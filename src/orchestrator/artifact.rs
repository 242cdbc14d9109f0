//! Artifact files: unique naming, verification and guaranteed deletion

use crate::error::{DownloadError, Error, Result};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::task::JoinError;
use tracing::{debug, warn};

/// File name prefix of every artifact; the sweep only touches these
pub const ARTIFACT_PREFIX: &str = "ytdlp-";

/// Extension every artifact is written with
pub const ARTIFACT_EXTENSION: &str = "mp4";

/// Hands out collision-free artifact paths inside one directory
///
/// Names combine a millisecond timestamp, a process-wide counter and 64 random
/// bits. The counter alone rules out collisions inside one process; the other
/// parts keep names distinct across restarts sharing a directory.
#[derive(Debug)]
pub struct ArtifactNamer {
    dir: PathBuf,
    counter: AtomicU64,
}

impl ArtifactNamer {
    /// Create a namer for `dir`
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            counter: AtomicU64::new(0),
        }
    }

    /// Directory artifacts are created in
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Reserve a fresh artifact path
    ///
    /// Nothing is created on disk; the returned guard deletes whatever ends up
    /// at that path (and yt-dlp's side files next to it) once it is removed or
    /// dropped.
    pub fn allocate(&self) -> Artifact {
        let seq = self.counter.fetch_add(1, Ordering::Relaxed);
        let name = format!(
            "{}{}-{}-{:016x}.{}",
            ARTIFACT_PREFIX,
            chrono::Utc::now().timestamp_millis(),
            seq,
            rand::random::<u64>(),
            ARTIFACT_EXTENSION
        );
        Artifact::new(self.dir.join(name))
    }
}

/// Owned handle to one artifact path
///
/// The file is deleted exactly once: either explicitly through
/// [`Artifact::remove`] or, if that never happens, when the handle is dropped.
/// Deletion covers the artifact itself plus any yt-dlp leftovers sharing its
/// stem (`.part`, `.ytdl`, per-format intermediates).
#[derive(Debug)]
pub struct Artifact {
    path: PathBuf,
    removed: bool,
}

impl Artifact {
    pub(crate) fn new(path: PathBuf) -> Self {
        Self {
            path,
            removed: false,
        }
    }

    /// Path the downloader writes to
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the artifact and its side files
    ///
    /// Returns the number of files deleted. Failures are logged, never
    /// returned: the caller has already produced its response by now.
    pub async fn remove(mut self) -> usize {
        self.removed = true;
        let path = self.path.clone();
        let joined = tokio::task::spawn_blocking(move || remove_family(&path)).await;
        self.settle_removal(joined)
    }

    /// Result of the blocking cleanup; deletes inline if that task never ran
    fn settle_removal(&self, joined: std::result::Result<usize, JoinError>) -> usize {
        match joined {
            Ok(count) => count,
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "artifact cleanup task failed, deleting inline"
                );
                remove_family(&self.path)
            }
        }
    }
}

impl Drop for Artifact {
    fn drop(&mut self) {
        if !self.removed {
            self.removed = true;
            remove_family(&self.path);
        }
    }
}

/// Delete `path` and every sibling whose name starts with `<stem>.`
fn remove_family(path: &Path) -> usize {
    let (Some(dir), Some(stem)) = (path.parent(), path.file_stem().and_then(|s| s.to_str()))
    else {
        return usize::from(remove_one(path));
    };

    let family_prefix = format!("{}.", stem);
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "failed to list temp dir during cleanup");
            return usize::from(remove_one(path));
        }
    };

    entries
        .flatten()
        .filter(|entry| {
            entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.starts_with(&family_prefix))
        })
        .filter(|entry| remove_one(&entry.path()))
        .count()
}

fn remove_one(path: &Path) -> bool {
    match std::fs::remove_file(path) {
        Ok(()) => {
            debug!(path = %path.display(), "deleted artifact file");
            true
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to delete artifact file");
            false
        }
    }
}

/// Confirm the artifact exists and is non-empty, returning its size
///
/// # Errors
///
/// - [`DownloadError::MissingArtifact`] when nothing (or a non-file) is at `path`
/// - [`DownloadError::EmptyArtifact`] when the file has zero bytes
pub async fn verify_artifact(path: &Path) -> Result<u64> {
    let metadata = match tokio::fs::metadata(path).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::Download(DownloadError::MissingArtifact {
                path: path.to_path_buf(),
            }));
        }
        Err(e) => return Err(Error::Io(e)),
    };

    if !metadata.is_file() {
        return Err(Error::Download(DownloadError::MissingArtifact {
            path: path.to_path_buf(),
        }));
    }

    match metadata.len() {
        0 => Err(Error::Download(DownloadError::EmptyArtifact {
            path: path.to_path_buf(),
        })),
        size => Ok(size),
    }
}
