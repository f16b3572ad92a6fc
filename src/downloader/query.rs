//! Status, artifact and health queries.

use super::PlaylistDownloader;
use crate::error::{Error, Result};
use crate::types::{Artifact, HealthSnapshot, JobId, JobSnapshot, Status};
use std::sync::atomic::Ordering;

impl PlaylistDownloader {
    /// Consistent snapshot of a job
    ///
    /// # Errors
    ///
    /// [`Error::JobNotFound`] for an unknown ID.
    pub async fn get_status(&self, id: JobId) -> Result<JobSnapshot> {
        self.jobs.snapshot(id).await
    }

    /// Location of a completed job's archive
    ///
    /// # Errors
    ///
    /// - [`Error::JobNotFound`] for an unknown ID
    /// - [`Error::NotReady`] while the job is in flight or when it failed
    /// - [`Error::ArtifactMissing`] when the archive has been reclaimed
    pub async fn get_artifact(&self, id: JobId) -> Result<Artifact> {
        let job = self.jobs.get(id).await?;

        let path = match (job.status(), job.artifact_path()) {
            (Status::Completed, Some(path)) => path.to_path_buf(),
            (status, _) => return Err(Error::NotReady { id, status }),
        };

        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            tracing::debug!(job_id = %id, path = %path.display(), "artifact already reclaimed");
            return Err(Error::ArtifactMissing { id, path });
        }

        Ok(Artifact {
            path,
            file_name: format!("playlist_{}.zip", job.format()),
        })
    }

    /// Job counts, uptime and whether submissions are accepted
    pub async fn health_snapshot(&self) -> HealthSnapshot {
        HealthSnapshot {
            uptime_secs: self.started_at.elapsed().as_secs(),
            accepting_new: self.queue_state.accepting_new.load(Ordering::SeqCst),
            ..self.jobs.stats().await
        }
    }
}
