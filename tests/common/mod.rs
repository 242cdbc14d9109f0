//! Common test utilities for ytdlp-gateway end-to-end tests

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use ytdlp_gateway::config::ToolsConfig;
use ytdlp_gateway::{Config, FormatConfig, Orchestrator, YtDlpCli};

/// Shell stand-in for yt-dlp
///
/// Behaves according to the URL (always the last argument):
/// - `--version` prints a version
/// - `--skip-download` (the probe) prints a title, fails for `.../missing`
///   and never answers for `.../stalled`
/// - `.../fail` writes a partial file, complains on stderr and exits 1
/// - `.../empty` creates a zero-byte output
/// - `.../slow` writes a partial file and sleeps
/// - anything else writes 1024 bytes to the `-o` path
const FAKE_YTDLP: &str = r#"#!/bin/sh
out=""
prev=""
probe=0
for a in "$@"; do
  if [ "$prev" = "-o" ]; then out="$a"; fi
  if [ "$a" = "--skip-download" ]; then probe=1; fi
  if [ "$a" = "--version" ]; then echo "2099.01.01-fake"; exit 0; fi
  prev="$a"
  url="$a"
done
if [ "$probe" = "1" ]; then
  case "$url" in
    */missing) echo "ERROR: [generic] Unable to download webpage: HTTP Error 404" >&2; exit 1 ;;
    */stalled) exec sleep 30 ;;
    *) echo "Fake Clip: $url"; exit 0 ;;
  esac
fi
case "$url" in
  */fail) printf 'partial' > "$out.part"; echo "ERROR: token=hunter2 leaked" >&2; exit 1 ;;
  */empty) : > "$out"; exit 0 ;;
  */slow) printf 'partial' > "$out.part"; exec sleep 30 ;;
  *) echo "[download] Destination: $out"; head -c 1024 /dev/zero > "$out"; exit 0 ;;
esac
"#;

/// A gateway wired to [`FAKE_YTDLP`], with its own temp directory
pub struct TestGateway {
    pub orchestrator: Orchestrator,
    pub work_dir: PathBuf,
    _root: TempDir,
}

impl TestGateway {
    /// Names of all files currently in the gateway's temp directory
    pub fn temp_files(&self) -> Vec<String> {
        list_dir(&self.work_dir)
    }
}

/// Write the fake yt-dlp into `dir` and return its path
pub fn install_fake_ytdlp(dir: &Path) -> PathBuf {
    let path = dir.join("yt-dlp");
    std::fs::write(&path, FAKE_YTDLP).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Build and initialize a gateway around the fake downloader
pub async fn start_gateway(configure: impl FnOnce(&mut Config)) -> TestGateway {
    let root = tempfile::tempdir().unwrap();
    let binary = install_fake_ytdlp(root.path());

    let mut config = Config::default();
    config.download.temp_dir = root.path().join("work");
    config.download.job_timeout = Duration::from_secs(10);
    config.download.sweep_interval = None;
    config.tools = ToolsConfig {
        ytdlp_path: Some(binary),
        ffmpeg_path: None,
        search_path: false,
    };
    configure(&mut config);

    let tool = YtDlpCli::discover(&config.tools, FormatConfig::default()).unwrap();
    let work_dir = config.download.temp_dir.clone();
    let orchestrator = Orchestrator::new(config, Arc::new(tool)).await.unwrap();
    orchestrator.initialize().await.unwrap();

    TestGateway {
        orchestrator,
        work_dir,
        _root: root,
    }
}

fn list_dir(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .flatten()
        .filter_map(|e| e.file_name().to_str().map(str::to_string))
        .collect();
    names.sort();
    names
}
