//! Reconciliation of orphaned artifacts in the temp directory

use super::artifact::ARTIFACT_PREFIX;
use crate::error::Result;
use std::collections::HashSet;
use std::path::Path;
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};

/// Outcome of one sweep
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    /// Files deleted
    pub removed: usize,
    /// Files that matched but could not be deleted
    pub failed: usize,
    /// Files skipped because a running job owns them
    pub in_use: usize,
}

/// Delete artifact files in `dir` left behind by crashed or killed jobs
///
/// Only regular files named with [`ARTIFACT_PREFIX`] are considered. With
/// `max_age` set, files modified more recently are kept; with `None` every
/// matching file goes. Files whose stem is listed in `active_stems` belong to
/// running jobs and are never touched.
pub async fn sweep_stale_artifacts(
    dir: &Path,
    max_age: Option<Duration>,
    active_stems: &HashSet<String>,
) -> Result<SweepReport> {
    let mut report = SweepReport::default();
    let mut entries = tokio::fs::read_dir(dir).await?;
    let now = SystemTime::now();

    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if !name.starts_with(ARTIFACT_PREFIX) {
            continue;
        }

        let stem = name.split('.').next().unwrap_or(name);
        if active_stems.contains(stem) {
            report.in_use += 1;
            continue;
        }

        let metadata = match entry.metadata().await {
            Ok(metadata) if metadata.is_file() => metadata,
            Ok(_) => continue,
            Err(e) => {
                debug!(file = name, error = %e, "could not stat temp file, skipping");
                continue;
            }
        };

        if let Some(max_age) = max_age {
            let age = metadata
                .modified()
                .ok()
                .and_then(|modified| now.duration_since(modified).ok())
                .unwrap_or_default();
            if age < max_age {
                continue;
            }
        }

        match tokio::fs::remove_file(entry.path()).await {
            Ok(()) => {
                debug!(file = name, "removed orphaned artifact");
                report.removed += 1;
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(file = name, error = %e, "failed to remove orphaned artifact");
                report.failed += 1;
            }
        }
    }

    if report.removed > 0 || report.failed > 0 {
        info!(
            dir = %dir.display(),
            removed = report.removed,
            failed = report.failed,
            "temp directory sweep finished"
        );
    }

    Ok(report)
}
