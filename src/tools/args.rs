//! Argument vectors for yt-dlp
//!
//! Arguments are always built as a discrete list and handed to the process
//! directly. No shell is involved, and the URL is placed after `--` so a value
//! starting with `-` cannot be read as an option.

use crate::config::{FormatConfig, FormatPolicy};
use crate::types::SourceUrl;
use std::ffi::OsString;
use std::path::Path;

/// Format selector string for the configured policy
pub fn format_selector(format: &FormatConfig) -> String {
    if let Some(custom) = format.custom_selector.as_deref() {
        let custom = custom.trim();
        if !custom.is_empty() {
            return custom.to_string();
        }
    }

    let cap = format.max_filesize_mb;
    let height = format
        .max_height
        .map(|h| format!("[height<=?{}]", h))
        .unwrap_or_default();

    match format.policy {
        FormatPolicy::Smallest => {
            format!("worst[ext=mp4]{height}/worstvideo[ext=mp4]{height}+worstaudio/worst")
        }
        FormatPolicy::Capped => format!(
            "best[ext=mp4]{height}[filesize<?{cap}M]/best[ext=mp4]{height}[filesize_approx<?{cap}M]/worst[ext=mp4]/worst"
        ),
        FormatPolicy::Merged => format!(
            "bestvideo[ext=mp4]{height}[filesize<?{cap}M]+bestaudio[ext=m4a]/best[ext=mp4]{height}[filesize<?{cap}M]/best{height}"
        ),
    }
}

/// Escape a filesystem path for use as an output template
///
/// yt-dlp expands `%(field)s` sequences in `-o`, so literal percent signs in
/// the temp directory must be doubled.
pub fn output_template(path: &Path) -> OsString {
    let raw = path.as_os_str();
    match raw.to_str() {
        Some(s) if s.contains('%') => OsString::from(s.replace('%', "%%")),
        _ => raw.to_os_string(),
    }
}

/// Full argument list for downloading `url` to `output`
pub fn download_args(
    format: &FormatConfig,
    ffmpeg_path: Option<&Path>,
    url: &SourceUrl,
    output: &Path,
) -> Vec<OsString> {
    let mut args: Vec<OsString> = [
        "--no-playlist",
        "--newline",
        "--no-mtime",
        "--no-continue",
        "-f",
    ]
    .iter()
    .map(OsString::from)
    .collect();

    args.push(format_selector(format).into());
    args.push("--max-filesize".into());
    args.push(format!("{}M", format.max_filesize_mb).into());
    args.push("--merge-output-format".into());
    args.push("mp4".into());
    // Fallback selectors can pick webm/flv; the container must still be mp4
    args.push("--remux-video".into());
    args.push("mp4".into());

    if let Some(ffmpeg) = ffmpeg_path {
        args.push("--ffmpeg-location".into());
        args.push(ffmpeg.as_os_str().to_os_string());
    }

    // Trimming is cut by ffmpeg while downloading the requested section
    if let Some(secs) = format.trim_seconds {
        args.push("--download-sections".into());
        args.push(format!("*0-{}", secs).into());
        args.push("--force-keyframes-at-cuts".into());
    }

    if let Some(height) = format.max_height {
        args.push("--format-sort".into());
        args.push(format!("res:{}", height).into());
    }

    args.push("-o".into());
    args.push(output_template(output));
    args.push("--".into());
    args.push(url.as_str().into());
    args
}

/// Argument list for a metadata-only probe printing the title
pub fn probe_args(url: &SourceUrl) -> Vec<OsString> {
    [
        "--no-playlist",
        "--skip-download",
        "--no-warnings",
        "--print",
        "title",
        "--",
    ]
    .iter()
    .map(OsString::from)
    .chain(std::iter::once(OsString::from(url.as_str())))
    .collect()
}
