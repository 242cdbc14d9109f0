//! Health reporting

use super::Orchestrator;
use crate::types::{HealthReport, TempDirHealth, ToolHealth};
use crate::utils::get_available_space;
use std::path::Path;
use tracing::warn;

impl Orchestrator {
    /// Snapshot of readiness, tool and temp directory state
    ///
    /// Never fails: problems show up as fields of the report.
    pub async fn health(&self) -> HealthReport {
        let readiness = self.readiness.current();

        HealthReport {
            status: readiness.as_str().to_string(),
            ready: readiness.is_ready(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_secs: (chrono::Utc::now() - self.started_at).num_seconds(),
            tool: ToolHealth {
                name: self.tool.name().to_string(),
                path: self.tool.binary_path().map(|p| p.display().to_string()),
                version: self.tool_version.get().cloned(),
                ffmpeg_path: self
                    .tool
                    .postprocessor_path()
                    .map(|p| p.display().to_string()),
                capabilities: self.tool.capabilities(),
            },
            temp_dir: check_temp_dir(self.namer.dir()).await,
            active_jobs: self.jobs.active_count(),
            max_concurrent_downloads: self.config.download.max_concurrent_downloads,
        }
    }
}

async fn check_temp_dir(dir: &Path) -> TempDirHealth {
    let exists = tokio::fs::metadata(dir)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false);

    let writable = exists && probe_writable(dir).await;

    let available_bytes = if exists {
        let dir = dir.to_path_buf();
        tokio::task::spawn_blocking(move || get_available_space(&dir))
            .await
            .ok()
            .and_then(|r| r.ok())
    } else {
        None
    };

    TempDirHealth {
        path: dir.display().to_string(),
        exists,
        writable,
        available_bytes,
    }
}

/// Create and delete a small file; the name avoids the artifact prefix
async fn probe_writable(dir: &Path) -> bool {
    let probe = dir.join(format!(".ytdlp-gateway-health-{:08x}", rand::random::<u32>()));
    if let Err(e) = tokio::fs::write(&probe, b"ok").await {
        warn!(dir = %dir.display(), error = %e, "temp directory is not writable");
        return false;
    }
    if let Err(e) = tokio::fs::remove_file(&probe).await {
        warn!(path = %probe.display(), error = %e, "failed to remove health probe file");
    }
    true
}
