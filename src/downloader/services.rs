//! Background service starters.

use super::PlaylistDownloader;
use crate::retention::RetentionSweeper;

impl PlaylistDownloader {
    /// Start the retention sweeper
    ///
    /// Sweeps the download, output and temp directories once now and then on
    /// every `retention.interval`, until shutdown.
    pub(crate) fn start_retention_sweeper(&self) -> tokio::task::JoinHandle<()> {
        let download = &self.config.download;
        let sweeper = RetentionSweeper::new(
            vec![
                download.download_dir.clone(),
                download.temp_dir.clone(),
                download.output_dir.clone(),
            ],
            self.config.retention.max_age,
            self.config.retention.interval,
        )
        .with_events(self.event_tx.clone());

        tokio::spawn(sweeper.run(self.queue_state.shutdown_token.clone()))
    }
}
