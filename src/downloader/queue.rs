//! Submission, validation and enqueueing.

use super::PlaylistDownloader;
use super::lifecycle::SHUTDOWN_REASON;
use crate::error::{Error, Result, ValidationError};
use crate::job::Job;
use crate::source::parse_format;
use crate::types::{AudioFormat, Event, JobId, SourceKind};
use std::path::PathBuf;
use std::sync::atomic::Ordering;

impl PlaylistDownloader {
    /// Submit a playlist for download
    ///
    /// Validates the URL and format, records a `pending` job and queues it for
    /// a worker. Returns immediately; progress is observed with
    /// [`get_status`](Self::get_status) or [`subscribe`](Self::subscribe).
    ///
    /// # Errors
    ///
    /// - [`ValidationError::InvalidUrl`] / [`ValidationError::InvalidFormat`]
    ///   when the input is rejected (no job is created)
    /// - [`Error::ShuttingDown`] after [`shutdown`](Self::shutdown) started
    pub async fn submit(&self, url: &str, format: &str) -> Result<JobId> {
        if !self.queue_state.accepting_new.load(Ordering::SeqCst) {
            return Err(Error::ShuttingDown);
        }

        let url = url.trim();
        let source = self.classifier.classify(url);
        if !source.is_valid() {
            tracing::debug!(url, "rejected submission with invalid URL");
            return Err(ValidationError::InvalidUrl(url.to_string()).into());
        }
        let format = parse_format(format)
            .ok_or_else(|| ValidationError::InvalidFormat(format.trim().to_string()))?;

        if source == SourceKind::Streaming && self.config.tools.credentials.is_none() {
            tracing::warn!(url, "streaming URL submitted without credentials, rate limiting likely");
        }

        let id = JobId::new();
        let job = Job::new(id, url, format, source, self.work_dir(id));
        self.jobs.insert(job).await;

        tracing::info!(job_id = %id, url, %format, ?source, "job submitted");
        self.emit(Event::Queued {
            id,
            url: url.to_string(),
        });

        if self.queue_state.queue_tx.send(id).is_err() {
            // dispatcher is gone; only happens while shutting down
            self.abandon_queued(id, SHUTDOWN_REASON).await;
            return Err(Error::ShuttingDown);
        }

        Ok(id)
    }

    /// Private working directory for a job
    pub(crate) fn work_dir(&self, id: JobId) -> PathBuf {
        self.config.download_dir().join(format!("download_{id}"))
    }

    /// Destination archive for a job
    pub(crate) fn archive_path(&self, id: JobId, format: AudioFormat) -> PathBuf {
        self.config
            .output_dir()
            .join(format!("playlist_{id}_{format}.zip"))
    }
}
