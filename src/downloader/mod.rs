//! Job orchestration split into focused submodules.
//!
//! The `PlaylistDownloader` struct and its methods are organized by domain:
//! - [`queue`] - Submission, validation and enqueueing
//! - [`query`] - Status, artifact and health queries
//! - [`queue_processor`] - Dispatch onto the bounded worker pool
//! - [`job_task`] - Per-job attempt loop and finalization
//! - [`services`] - Background service starters
//! - [`lifecycle`] - Shutdown coordination

mod job_task;
mod lifecycle;
mod query;
mod queue;
mod queue_processor;
mod services;

use crate::config::{Config, ToolsConfig};
use crate::error::{Error, Result};
use crate::job::JobStore;
use crate::runner::{CliRunner, MissingToolRunner, RateGate, ToolRunner};
use crate::source::SourceClassifier;
use crate::types::{Event, JobId};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use tokio::sync::{Mutex, Semaphore, broadcast, mpsc};
use tokio_util::sync::CancellationToken;

/// Capacity of the event broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Queue and worker pool state
#[derive(Clone)]
pub(crate) struct QueueState {
    /// Sender side of the dispatch queue (submission never blocks)
    pub(crate) queue_tx: mpsc::UnboundedSender<JobId>,
    /// Semaphore bounding concurrently running jobs (max_concurrent_jobs)
    pub(crate) concurrent_limit: Arc<Semaphore>,
    /// Jobs currently holding a worker slot
    pub(crate) active_jobs: Arc<Mutex<HashSet<JobId>>>,
    /// Whether new submissions are accepted (false during shutdown)
    pub(crate) accepting_new: Arc<AtomicBool>,
    /// Cancels the dispatcher and background services on shutdown
    pub(crate) shutdown_token: CancellationToken,
}

/// Main downloader instance (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct PlaylistDownloader {
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// Job table
    pub(crate) jobs: JobStore,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: broadcast::Sender<Event>,
    /// URL classifier built from the configured domain lists
    pub(crate) classifier: Arc<SourceClassifier>,
    /// Downloader invocation capability
    pub(crate) runner: Arc<dyn ToolRunner>,
    /// Process-wide spacing of downloader starts
    pub(crate) rate_gate: RateGate,
    /// Queue and worker pool state
    pub(crate) queue_state: QueueState,
    /// When this instance was created
    pub(crate) started_at: std::time::Instant,
}

impl PlaylistDownloader {
    /// Create a new downloader, discovering the external tool
    ///
    /// The tool is taken from `tools.downloader_path`, else searched on PATH
    /// (when `tools.search_path` is set). Without one, every job fails with a
    /// clear reason instead of construction failing.
    pub async fn new(config: Config) -> Result<Self> {
        let runner = select_runner(&config.tools);
        Self::with_runner(config, runner).await
    }

    /// Create a new downloader using the given tool runner
    ///
    /// This initializes all core components:
    /// - Validates the configuration
    /// - Creates the download, output and temp directories
    /// - Sets up the event broadcast channel and job table
    /// - Starts the queue processor and (if enabled) the retention sweeper
    pub async fn with_runner(config: Config, runner: Arc<dyn ToolRunner>) -> Result<Self> {
        config.validate()?;

        for (label, dir) in [
            ("download", &config.download.download_dir),
            ("output", &config.download.output_dir),
            ("temp", &config.download.temp_dir),
        ] {
            create_dir(label, dir).await?;
        }

        let (event_tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();

        tracing::info!(
            runner = runner.name(),
            available = runner.is_available(),
            "Downloader tool initialized"
        );
        if !runner.is_available() {
            tracing::warn!("spotdl not found, all downloads will fail until it is installed");
        }
        if config.tools.credentials.is_some() {
            tracing::info!("Streaming service credentials configured");
        } else {
            tracing::warn!(
                "No streaming service credentials configured, downloads may be rate limited"
            );
        }

        let downloader = Self {
            classifier: Arc::new(SourceClassifier::new(&config.sources)),
            rate_gate: RateGate::new(config.process.min_invocation_interval),
            queue_state: QueueState {
                queue_tx,
                concurrent_limit: Arc::new(Semaphore::new(config.download.max_concurrent_jobs)),
                active_jobs: Arc::new(Mutex::new(HashSet::new())),
                accepting_new: Arc::new(AtomicBool::new(true)),
                shutdown_token: CancellationToken::new(),
            },
            config: Arc::new(config),
            jobs: JobStore::new(),
            event_tx,
            runner,
            started_at: std::time::Instant::now(),
        };

        downloader.start_queue_processor(queue_rx);
        if downloader.config.retention.enabled {
            downloader.start_retention_sweeper();
        }

        Ok(downloader)
    }

    /// Subscribe to job lifecycle events
    ///
    /// Each subscriber receives every event sent after it subscribed. Slow
    /// subscribers may observe `RecvError::Lagged`.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use playlist_dl::{Config, PlaylistDownloader};
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let downloader = PlaylistDownloader::new(Config::default()).await?;
    /// let mut events = downloader.subscribe();
    /// tokio::spawn(async move {
    ///     while let Ok(event) = events.recv().await {
    ///         tracing::info!(?event, "job event");
    ///     }
    /// });
    /// # Ok(())
    /// # }
    /// ```
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Get the current configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Name of the installed tool runner
    pub fn runner_name(&self) -> &'static str {
        self.runner.name()
    }

    pub(crate) fn emit(&self, event: Event) {
        // no subscribers is fine
        self.event_tx.send(event).ok();
    }
}

/// Pick the tool runner for this configuration
///
/// Explicit path first, then PATH lookup, then [`MissingToolRunner`].
pub(crate) fn select_runner(tools: &ToolsConfig) -> Arc<dyn ToolRunner> {
    if let Some(path) = &tools.downloader_path {
        return Arc::new(CliRunner::new(path.clone()).with_prefix_args(&tools.downloader_args));
    }
    if tools.search_path
        && let Some(runner) = CliRunner::from_path()
    {
        return Arc::new(runner.with_prefix_args(&tools.downloader_args));
    }
    Arc::new(MissingToolRunner)
}

async fn create_dir(label: &str, dir: &Path) -> Result<()> {
    tokio::fs::create_dir_all(dir).await.map_err(|e| {
        Error::Io(std::io::Error::new(
            e.kind(),
            format!(
                "Failed to create {} directory '{}': {}",
                label,
                dir.display(),
                e
            ),
        ))
    })
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn explicit_path_wins() {
        let tools = ToolsConfig {
            downloader_path: Some(PathBuf::from("/opt/python/bin/python3")),
            downloader_args: vec!["-m".to_string(), "spotdl".to_string()],
            ..ToolsConfig::default()
        };
        let runner = select_runner(&tools);
        assert_eq!(runner.name(), "cli-spotdl");
        assert!(runner.is_available());
    }

    #[test]
    fn missing_tool_when_search_disabled() {
        let tools = ToolsConfig {
            downloader_path: None,
            search_path: false,
            ..ToolsConfig::default()
        };
        let runner = select_runner(&tools);
        assert_eq!(runner.name(), "missing");
        assert!(!runner.is_available());
    }

    #[tokio::test]
    async fn construction_creates_directories() {
        let tmp = tempfile::TempDir::new().unwrap();
        let mut config = Config::default();
        config.download.download_dir = tmp.path().join("dl");
        config.download.output_dir = tmp.path().join("out");
        config.download.temp_dir = tmp.path().join("tmp");
        config.retention.enabled = false;

        let downloader = PlaylistDownloader::with_runner(config, Arc::new(MissingToolRunner))
            .await
            .unwrap();

        assert!(tmp.path().join("dl").is_dir());
        assert!(tmp.path().join("out").is_dir());
        assert!(tmp.path().join("tmp").is_dir());
        assert_eq!(downloader.runner_name(), "missing");
        downloader.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn invalid_config_is_rejected() {
        let mut config = Config::default();
        config.download.max_concurrent_jobs = 0;
        let result = PlaylistDownloader::with_runner(config, Arc::new(MissingToolRunner)).await;
        assert!(matches!(result, Err(Error::Config { .. })));
    }
}
