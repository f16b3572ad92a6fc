//! Test configuration helpers for creating downloaders backed by a scripted runner

use super::runner::ScriptedRunner;
use playlist_dl::{Config, PlaylistDownloader};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Domain used by tests for the streaming origin
pub const STREAMING_TEST_DOMAIN: &str = "example-service.com";

/// Fast configuration rooted in `root`
///
/// Backoff and pacing delays are shrunk to milliseconds and the retention
/// sweeper is disabled.
pub fn test_config(root: &Path) -> Config {
    let mut config = Config::default();
    config.download.download_dir = root.join("downloads");
    config.download.output_dir = root.join("output");
    config.download.temp_dir = root.join("temp");
    config.download.max_concurrent_jobs = 3;
    config.download.shutdown_timeout = Duration::from_secs(5);

    config.tools.search_path = false;

    config.process.timeout = Duration::from_secs(5);
    config.process.min_invocation_interval = Duration::from_millis(5);
    config.process.unauthenticated_delay = Duration::ZERO;

    config.retry.base_delay = Duration::from_millis(10);
    config.retry.max_delay = Duration::from_millis(100);
    config.retry.jitter = Duration::from_millis(1);

    config.retention.enabled = false;

    config
        .sources
        .streaming_domains
        .push(STREAMING_TEST_DOMAIN.to_string());
    config
}

/// A downloader, its scripted runner and the directory holding its files
pub struct Harness {
    pub downloader: PlaylistDownloader,
    pub runner: Arc<ScriptedRunner>,
    pub config: Config,
    // dropped last, removes everything
    pub temp: TempDir,
}

/// Create a downloader with the default test configuration
pub async fn harness(runner: ScriptedRunner) -> Harness {
    harness_with(runner, |_| {}).await
}

/// Create a downloader, adjusting the test configuration first
pub async fn harness_with(runner: ScriptedRunner, adjust: impl FnOnce(&mut Config)) -> Harness {
    let temp = tempfile::tempdir().unwrap();
    let mut config = test_config(temp.path());
    adjust(&mut config);

    let runner = Arc::new(runner);
    let downloader = PlaylistDownloader::with_runner(config.clone(), runner.clone())
        .await
        .unwrap();

    Harness {
        downloader,
        runner,
        config,
        temp,
    }
}
