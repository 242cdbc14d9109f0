//! Configuration types for ytdlp-gateway
//!
//! Settings are grouped into nested sub-configs. Every field has a serde
//! default, so an empty document (or no environment at all) yields a working
//! configuration. [`Config::from_env`] overlays process environment variables
//! on top of those defaults.

use crate::error::{Error, Result};
use crate::types::DeliveryMode;
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::PathBuf, time::Duration};
use utoipa::ToSchema;

/// Main configuration for the gateway
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct Config {
    /// HTTP listener and response policy
    #[serde(default)]
    pub api: ApiConfig,

    /// Temp directory, concurrency, timeouts and delivery
    #[serde(default)]
    pub download: DownloadConfig,

    /// External binary locations
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Format selection and post-processing passed to the downloader
    #[serde(default)]
    pub format: FormatConfig,
}

/// API server configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiConfig {
    /// Address to bind to (default: 0.0.0.0:3000)
    #[serde(default = "default_bind_address")]
    #[schema(value_type = String)]
    pub bind_address: SocketAddr,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Attach the caught error's message to error responses (default: false)
    ///
    /// Subprocess output is never included, even when this is enabled.
    #[serde(default)]
    pub expose_error_details: bool,

    /// Enable Swagger UI at /swagger-ui (default: false)
    #[serde(default)]
    pub swagger_ui: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            expose_error_details: false,
            swagger_ui: false,
        }
    }
}

/// Download behavior configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct DownloadConfig {
    /// Directory artifacts are written to (default: "<system tmp>/ytdlp-gateway")
    #[serde(default = "default_temp_dir")]
    #[schema(value_type = String)]
    pub temp_dir: PathBuf,

    /// Maximum simultaneous downloader processes (default: 4)
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_downloads: usize,

    /// How long a request may wait for a free download slot (default: 30 seconds)
    #[serde(default = "default_queue_timeout", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub queue_timeout: Duration,

    /// Upper bound on a single downloader run (default: 300 seconds)
    #[serde(default = "default_job_timeout", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub job_timeout: Duration,

    /// Delivery mode used when the request does not pick one (default: stream)
    #[serde(default)]
    pub delivery_mode: DeliveryMode,

    /// Resolve the URL with a metadata probe before downloading (default: true)
    #[serde(default = "default_true")]
    pub probe_before_download: bool,

    /// Artifacts older than this are removed by the periodic sweep (default: 3600 seconds)
    #[serde(default = "default_stale_artifact_age", with = "duration_serde")]
    #[schema(value_type = u64)]
    pub stale_artifact_age: Duration,

    /// Interval of the periodic sweep; `None` disables it (default: 600 seconds)
    #[serde(
        default = "default_sweep_interval",
        with = "optional_duration_serde"
    )]
    #[schema(value_type = Option<u64>)]
    pub sweep_interval: Option<Duration>,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            temp_dir: default_temp_dir(),
            max_concurrent_downloads: default_max_concurrent(),
            queue_timeout: default_queue_timeout(),
            job_timeout: default_job_timeout(),
            delivery_mode: DeliveryMode::default(),
            probe_before_download: true,
            stale_artifact_age: default_stale_artifact_age(),
            sweep_interval: default_sweep_interval(),
        }
    }
}

/// External tool paths
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ToolsConfig {
    /// Path to yt-dlp executable (auto-detected if None)
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub ytdlp_path: Option<PathBuf>,

    /// Path to ffmpeg executable handed to yt-dlp (auto-detected if None)
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub ffmpeg_path: Option<PathBuf>,

    /// Whether to search PATH for external binaries if explicit paths not set (default: true)
    #[serde(default = "default_true")]
    pub search_path: bool,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: None,
            ffmpeg_path: None,
            search_path: true,
        }
    }
}

/// How yt-dlp picks among the available formats
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum FormatPolicy {
    /// Smallest mp4 the site offers
    Smallest,
    /// Best single-file mp4 under the size cap, falling back to the smallest
    #[default]
    Capped,
    /// Best video+audio pair under the size cap, merged into mp4
    Merged,
}

impl std::str::FromStr for FormatPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "smallest" => Ok(FormatPolicy::Smallest),
            "capped" => Ok(FormatPolicy::Capped),
            "merged" => Ok(FormatPolicy::Merged),
            other => Err(Error::Config {
                message: format!(
                    "unknown format policy '{}', expected smallest, capped or merged",
                    other
                ),
                key: Some("FORMAT_POLICY".to_string()),
            }),
        }
    }
}

/// Format selection and post-processing settings
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct FormatConfig {
    /// Format selection policy (default: capped)
    #[serde(default)]
    pub policy: FormatPolicy,

    /// Raw yt-dlp format selector, overrides `policy` when set
    #[serde(default)]
    pub custom_selector: Option<String>,

    /// Size ceiling in megabytes (default: 50)
    #[serde(default = "default_max_filesize_mb")]
    pub max_filesize_mb: u64,

    /// Keep only the first N seconds of the video (ffmpeg post-processing)
    #[serde(default)]
    pub trim_seconds: Option<u32>,

    /// Scale the video down to this height (ffmpeg post-processing)
    #[serde(default)]
    pub max_height: Option<u32>,
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            policy: FormatPolicy::default(),
            custom_selector: None,
            max_filesize_mb: default_max_filesize_mb(),
            trim_seconds: None,
            max_height: None,
        }
    }
}

impl Config {
    /// Build a configuration from defaults overlaid with environment variables
    ///
    /// Unset variables keep their defaults; malformed values are reported as
    /// [`Error::Config`] naming the offending variable.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Config::from_env`] with an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Config::default();

        if let Some(addr) = get("BIND_ADDRESS") {
            config.api.bind_address = parse_value("BIND_ADDRESS", &addr)?;
        }
        if let Some(port) = get("PORT") {
            let port: u16 = parse_value("PORT", &port)?;
            config.api.bind_address.set_port(port);
        }
        if let Some(origins) = get("ALLOWED_ORIGINS") {
            config.api.cors_origins = origins
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
        }
        if let Some(v) = get("EXPOSE_ERROR_DETAILS") {
            config.api.expose_error_details = parse_bool("EXPOSE_ERROR_DETAILS", &v)?;
        }
        if let Some(v) = get("SWAGGER_UI") {
            config.api.swagger_ui = parse_bool("SWAGGER_UI", &v)?;
        }

        if let Some(dir) = get("TEMP_DIR") {
            config.download.temp_dir = PathBuf::from(dir);
        }
        if let Some(v) = get("MAX_CONCURRENT_DOWNLOADS") {
            config.download.max_concurrent_downloads = parse_value("MAX_CONCURRENT_DOWNLOADS", &v)?;
        }
        if let Some(v) = get("QUEUE_TIMEOUT_SECS") {
            config.download.queue_timeout = parse_secs("QUEUE_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = get("JOB_TIMEOUT_SECS") {
            config.download.job_timeout = parse_secs("JOB_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = get("DELIVERY_MODE") {
            config.download.delivery_mode = v.parse()?;
        }
        if let Some(v) = get("PROBE_BEFORE_DOWNLOAD") {
            config.download.probe_before_download = parse_bool("PROBE_BEFORE_DOWNLOAD", &v)?;
        }
        if let Some(v) = get("STALE_ARTIFACT_SECS") {
            config.download.stale_artifact_age = parse_secs("STALE_ARTIFACT_SECS", &v)?;
        }
        if let Some(v) = get("SWEEP_INTERVAL_SECS") {
            let interval = parse_secs("SWEEP_INTERVAL_SECS", &v)?;
            config.download.sweep_interval = (!interval.is_zero()).then_some(interval);
        }

        if let Some(path) = get("YTDLP_PATH") {
            config.tools.ytdlp_path = Some(PathBuf::from(path));
        }
        if let Some(path) = get("FFMPEG_PATH") {
            config.tools.ffmpeg_path = Some(PathBuf::from(path));
        }

        if let Some(v) = get("FORMAT_POLICY") {
            config.format.policy = v.parse()?;
        }
        if let Some(v) = get("FORMAT_SELECTOR") {
            config.format.custom_selector = Some(v);
        }
        if let Some(v) = get("MAX_FILESIZE_MB") {
            config.format.max_filesize_mb = parse_value("MAX_FILESIZE_MB", &v)?;
        }
        if let Some(v) = get("TRIM_SECONDS") {
            config.format.trim_seconds = Some(parse_value("TRIM_SECONDS", &v)?);
        }
        if let Some(v) = get("MAX_HEIGHT") {
            config.format.max_height = Some(parse_value("MAX_HEIGHT", &v)?);
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the service cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.download.max_concurrent_downloads == 0 {
            return Err(Error::Config {
                message: "max_concurrent_downloads must be at least 1".to_string(),
                key: Some("MAX_CONCURRENT_DOWNLOADS".to_string()),
            });
        }
        if self.format.max_filesize_mb == 0 {
            return Err(Error::Config {
                message: "max_filesize_mb must be at least 1".to_string(),
                key: Some("MAX_FILESIZE_MB".to_string()),
            });
        }
        if self.format.trim_seconds == Some(0) {
            return Err(Error::Config {
                message: "trim_seconds must be positive when set".to_string(),
                key: Some("TRIM_SECONDS".to_string()),
            });
        }
        if self.format.max_height == Some(0) {
            return Err(Error::Config {
                message: "max_height must be positive when set".to_string(),
                key: Some("MAX_HEIGHT".to_string()),
            });
        }
        Ok(())
    }

    /// Temp directory artifacts live in
    pub fn temp_dir(&self) -> &PathBuf {
        &self.download.temp_dir
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse::<T>().map_err(|e| Error::Config {
        message: format!("invalid value '{}' for {}: {}", raw, key, e),
        key: Some(key.to_string()),
    })
}

fn parse_secs(key: &str, raw: &str) -> Result<Duration> {
    parse_value::<u64>(key, raw).map(Duration::from_secs)
}

fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::Config {
            message: format!("invalid boolean '{}' for {}", raw, key),
            key: Some(key.to_string()),
        }),
    }
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 3000))
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_true() -> bool {
    true
}

fn default_temp_dir() -> PathBuf {
    std::env::temp_dir().join("ytdlp-gateway")
}

fn default_max_concurrent() -> usize {
    4
}

fn default_queue_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_job_timeout() -> Duration {
    Duration::from_secs(300)
}

fn default_stale_artifact_age() -> Duration {
    Duration::from_secs(3600)
}

fn default_sweep_interval() -> Option<Duration> {
    Some(Duration::from_secs(600))
}

fn default_max_filesize_mb() -> u64 {
    50
}

// Duration serialization helper (whole seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// Optional Duration serialization helper
mod optional_duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&d.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<u64>::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs))
    }
}
