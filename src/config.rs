//! Configuration types for playlist-dl

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable holding the streaming service client ID
pub const CLIENT_ID_ENV: &str = "SPOTIFY_CLIENT_ID";
/// Environment variable holding the streaming service client secret
pub const CLIENT_SECRET_ENV: &str = "SPOTIFY_CLIENT_SECRET";

/// Directory layout and worker pool settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Root for per-job working directories (default: "./downloads")
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,

    /// Flat directory for finished archives (default: "./output")
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Scratch directory, swept by retention (default: "./temp")
    #[serde(default = "default_temp_dir")]
    pub temp_dir: PathBuf,

    /// Maximum jobs running at once (default: 3)
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_jobs: usize,

    /// How long shutdown waits for in-flight jobs (default: 30 seconds)
    #[serde(default = "default_shutdown_timeout", with = "duration_serde")]
    pub shutdown_timeout: Duration,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            output_dir: default_output_dir(),
            temp_dir: default_temp_dir(),
            max_concurrent_jobs: default_max_concurrent(),
            shutdown_timeout: default_shutdown_timeout(),
        }
    }
}

/// Client credentials for the streaming service API
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// OAuth client ID
    pub client_id: String,
    /// OAuth client secret
    pub client_secret: String,
}

// The secret must never end up in logs.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// External downloader location and credentials
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Path to the downloader executable (auto-detected if None)
    #[serde(default)]
    pub downloader_path: Option<PathBuf>,

    /// Arguments placed before the job arguments (e.g. `["-m", "spotdl"]` for a Python interpreter)
    #[serde(default)]
    pub downloader_args: Vec<String>,

    /// Whether to search PATH for the downloader if no explicit path is set (default: true)
    #[serde(default = "default_true")]
    pub search_path: bool,

    /// Streaming service credentials; without them the service throttles harder
    #[serde(default)]
    pub credentials: Option<Credentials>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            downloader_path: None,
            downloader_args: Vec::new(),
            search_path: true,
            credentials: None,
        }
    }
}

/// How the downloader process is invoked
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProcessConfig {
    /// Wall-clock limit for one invocation (default: 30 minutes)
    #[serde(default = "default_process_timeout", with = "duration_serde")]
    pub timeout: Duration,

    /// Minimum spacing between invocation starts, across all jobs (default: 1 second)
    #[serde(default = "default_min_invocation_interval", with = "duration_serde")]
    pub min_invocation_interval: Duration,

    /// Extra wait before a streaming-origin invocation without credentials (default: 2 seconds)
    #[serde(default = "default_unauthenticated_delay", with = "duration_serde")]
    pub unauthenticated_delay: Duration,

    /// Downloader `--threads` value (default: 2)
    #[serde(default = "default_threads")]
    pub threads: u32,

    /// Downloader `--bitrate` value (default: "320k")
    #[serde(default = "default_bitrate")]
    pub bitrate: String,

    /// Downloader's own per-track `--max-retries` value (default: 5)
    #[serde(default = "default_tool_max_retries")]
    pub tool_max_retries: u32,

    /// Skip sponsored segments in video-site sources (default: true)
    #[serde(default = "default_true")]
    pub sponsor_block: bool,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            timeout: default_process_timeout(),
            min_invocation_interval: default_min_invocation_interval(),
            unauthenticated_delay: default_unauthenticated_delay(),
            threads: default_threads(),
            bitrate: default_bitrate(),
            tool_max_retries: default_tool_max_retries(),
            sponsor_block: true,
        }
    }
}

/// Retry configuration for failed downloader invocations
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per job, including the first (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base delay for exponential backoff (default: 5 seconds)
    #[serde(default = "default_base_delay", with = "duration_serde")]
    pub base_delay: Duration,

    /// Maximum delay between attempts (default: 60 seconds)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    pub max_delay: Duration,

    /// Upper bound of the uniform random jitter added to each delay (default: 1 second)
    #[serde(default = "default_jitter", with = "duration_serde")]
    pub jitter: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay: default_base_delay(),
            max_delay: default_max_delay(),
            jitter: default_jitter(),
        }
    }
}

/// Age-based cleanup of working directories and archives
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetentionConfig {
    /// Run the background sweeper (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Time between sweeps (default: 1 hour)
    #[serde(default = "default_retention_interval", with = "duration_serde")]
    pub interval: Duration,

    /// Entries older than this are deleted (default: 1 hour)
    #[serde(default = "default_retention_max_age", with = "duration_serde")]
    pub max_age: Duration,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: default_retention_interval(),
            max_age: default_retention_max_age(),
        }
    }
}

/// Allow-listed origins for submitted URLs
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Domain substrings identifying the streaming service
    #[serde(default = "default_streaming_domains")]
    pub streaming_domains: Vec<String>,

    /// Domain substrings identifying the video site
    #[serde(default = "default_video_domains")]
    pub video_domains: Vec<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            streaming_domains: default_streaming_domains(),
            video_domains: default_video_domains(),
        }
    }
}

/// Main configuration for PlaylistDownloader
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Directories and worker pool
    #[serde(default)]
    pub download: DownloadConfig,

    /// Downloader executable and credentials
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Downloader invocation
    #[serde(default)]
    pub process: ProcessConfig,

    /// Attempt budget and backoff
    #[serde(default)]
    pub retry: RetryConfig,

    /// Background cleanup
    #[serde(default)]
    pub retention: RetentionConfig,

    /// Accepted URL origins
    #[serde(default)]
    pub sources: SourceConfig,
}

impl Config {
    /// Working directory root
    pub fn download_dir(&self) -> &PathBuf {
        &self.download.download_dir
    }

    /// Archive directory
    pub fn output_dir(&self) -> &PathBuf {
        &self.download.output_dir
    }

    /// Fill streaming credentials from `SPOTIFY_CLIENT_ID` / `SPOTIFY_CLIENT_SECRET`
    ///
    /// Credentials are only taken when both variables are set and non-empty;
    /// explicitly configured credentials are left alone.
    pub fn with_env_credentials(mut self) -> Self {
        if self.tools.credentials.is_some() {
            return self;
        }

        let client_id = std::env::var(CLIENT_ID_ENV).ok().filter(|v| !v.is_empty());
        let client_secret = std::env::var(CLIENT_SECRET_ENV)
            .ok()
            .filter(|v| !v.is_empty());

        if let (Some(client_id), Some(client_secret)) = (client_id, client_secret) {
            self.tools.credentials = Some(Credentials {
                client_id,
                client_secret,
            });
        }
        self
    }

    /// Check settings that would make the orchestrator unusable
    pub fn validate(&self) -> Result<()> {
        if self.download.max_concurrent_jobs == 0 {
            return Err(Error::Config {
                message: "max_concurrent_jobs must be at least 1".to_string(),
                key: Some("max_concurrent_jobs".to_string()),
            });
        }
        if self.retry.max_attempts == 0 {
            return Err(Error::Config {
                message: "max_attempts must be at least 1".to_string(),
                key: Some("max_attempts".to_string()),
            });
        }
        if self.retry.base_delay > self.retry.max_delay {
            return Err(Error::Config {
                message: format!(
                    "base_delay ({:?}) exceeds max_delay ({:?})",
                    self.retry.base_delay, self.retry.max_delay
                ),
                key: Some("base_delay".to_string()),
            });
        }
        if self.process.timeout.is_zero() {
            return Err(Error::Config {
                message: "process timeout must be non-zero".to_string(),
                key: Some("timeout".to_string()),
            });
        }
        Ok(())
    }
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("./downloads")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./output")
}

fn default_temp_dir() -> PathBuf {
    PathBuf::from("./temp")
}

fn default_max_concurrent() -> usize {
    3
}

fn default_shutdown_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_true() -> bool {
    true
}

fn default_process_timeout() -> Duration {
    Duration::from_secs(30 * 60)
}

fn default_min_invocation_interval() -> Duration {
    Duration::from_secs(1)
}

fn default_unauthenticated_delay() -> Duration {
    Duration::from_secs(2)
}

fn default_threads() -> u32 {
    2
}

fn default_bitrate() -> String {
    "320k".to_string()
}

fn default_tool_max_retries() -> u32 {
    5
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay() -> Duration {
    Duration::from_secs(5)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(60)
}

fn default_jitter() -> Duration {
    Duration::from_secs(1)
}

fn default_retention_interval() -> Duration {
    Duration::from_secs(60 * 60)
}

fn default_retention_max_age() -> Duration {
    Duration::from_secs(60 * 60)
}

fn default_streaming_domains() -> Vec<String> {
    vec!["spotify.com".to_string(), "open.spotify.com".to_string()]
}

fn default_video_domains() -> Vec<String> {
    vec![
        "youtube.com".to_string(),
        "youtu.be".to_string(),
        "music.youtube.com".to_string(),
    ]
}

// Duration serialization helper
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
