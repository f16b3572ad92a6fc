//! Shutdown coordination.

use super::PlaylistDownloader;
use crate::error::Result;
use crate::types::{Event, JobId};
use std::sync::atomic::Ordering;

/// Polling interval while waiting for in-flight jobs
const ACTIVE_POLL_INTERVAL: std::time::Duration = std::time::Duration::from_millis(100);

/// Failure reason for jobs still queued at shutdown
pub(crate) const SHUTDOWN_REASON: &str = "Service shut down before the download started";

impl PlaylistDownloader {
    /// Gracefully shut down the downloader
    ///
    /// This method performs a graceful shutdown sequence:
    /// 1. Stops accepting new submissions
    /// 2. Stops the queue processor and the retention sweeper
    /// 3. Waits for in-flight jobs with a timeout (`download.shutdown_timeout`)
    /// 4. Fails jobs that never got a worker slot
    /// 5. Emits [`Event::Shutdown`]
    ///
    /// Jobs still running when the timeout expires are left to finish in the
    /// background for as long as the runtime lives.
    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!("Initiating graceful shutdown");

        // 1. Stop accepting new jobs
        self.queue_state.accepting_new.store(false, Ordering::SeqCst);
        tracing::info!("Stopped accepting new jobs");

        // 2. Stop dispatching and sweeping
        self.queue_state.shutdown_token.cancel();

        // 3. Wait for in-flight jobs
        let shutdown_timeout = self.config.download.shutdown_timeout;
        match tokio::time::timeout(shutdown_timeout, self.wait_for_active_jobs()).await {
            Ok(()) => tracing::info!("All in-flight jobs finished"),
            Err(_) => tracing::warn!(
                timeout_secs = shutdown_timeout.as_secs(),
                "Timeout waiting for in-flight jobs, proceeding with shutdown"
            ),
        }

        // 4. Jobs that never started will not start now
        let abandoned = self
            .jobs
            .fail_pending(SHUTDOWN_REASON)
            .await;
        if !abandoned.is_empty() {
            tracing::warn!(count = abandoned.len(), "Failed queued jobs at shutdown");
        }
        for id in abandoned {
            self.emit(Event::Failed {
                id,
                error: SHUTDOWN_REASON.to_string(),
            });
        }

        // 5. Emit shutdown event
        self.emit(Event::Shutdown);

        tracing::info!("Graceful shutdown complete");
        Ok(())
    }

    /// Whether new submissions are currently accepted
    pub fn is_accepting(&self) -> bool {
        self.queue_state.accepting_new.load(Ordering::SeqCst)
    }

    /// Fail a queued job that will never be dispatched
    pub(crate) async fn abandon_queued(&self, id: JobId, reason: &str) {
        if self.jobs.fail_if_pending(id, reason).await {
            tracing::warn!(job_id = %id, reason, "queued job abandoned");
            self.emit(Event::Failed {
                id,
                error: reason.to_string(),
            });
        }
    }

    async fn wait_for_active_jobs(&self) {
        loop {
            let active_count = self.queue_state.active_jobs.lock().await.len();
            if active_count == 0 {
                return;
            }
            tracing::debug!(active_count, "Waiting for in-flight jobs");
            tokio::time::sleep(ACTIVE_POLL_INTERVAL).await;
        }
    }
}
