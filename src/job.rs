//! Job record and the shared job table
//!
//! A [`Job`] is mutated only by the task that owns it, through transition
//! methods that reject illegal status changes. Readers get [`JobSnapshot`]s
//! taken under the table's read lock.

use crate::error::{Error, Result};
use crate::types::{AudioFormat, HealthSnapshot, JobId, JobSnapshot, SourceKind, Status};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Progress reported when an attempt starts
pub const PROGRESS_DOWNLOADING: u8 = 25;
/// Progress reported while the archive is written
pub const PROGRESS_FINALIZING: u8 = 75;
/// Progress of a completed job
pub const PROGRESS_DONE: u8 = 100;

/// Mutable state of one download request
#[derive(Debug, Clone)]
pub struct Job {
    id: JobId,
    url: String,
    format: AudioFormat,
    source: SourceKind,
    work_dir: PathBuf,
    created_at: DateTime<Utc>,
    status: Status,
    progress: u8,
    message: String,
    failure_reason: Option<String>,
    artifact_path: Option<PathBuf>,
    attempts: u32,
}

impl Job {
    /// Create a pending job
    pub fn new(
        id: JobId,
        url: impl Into<String>,
        format: AudioFormat,
        source: SourceKind,
        work_dir: PathBuf,
    ) -> Self {
        Self {
            id,
            url: url.into(),
            format,
            source,
            work_dir,
            created_at: Utc::now(),
            status: Status::Pending,
            progress: 0,
            message: "Initializing download...".to_string(),
            failure_reason: None,
            artifact_path: None,
            attempts: 0,
        }
    }

    /// Job ID
    pub fn id(&self) -> JobId {
        self.id
    }

    /// Submitted URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Requested format
    pub fn format(&self) -> AudioFormat {
        self.format
    }

    /// Classified origin of the URL
    pub fn source(&self) -> SourceKind {
        self.source
    }

    /// Private working directory
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Current status
    pub fn status(&self) -> Status {
        self.status
    }

    /// Current progress percentage
    pub fn progress(&self) -> u8 {
        self.progress
    }

    /// Current status message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Failure reason, set once failed
    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    /// Archive path, set once completed
    pub fn artifact_path(&self) -> Option<&Path> {
        self.artifact_path.as_deref()
    }

    /// Downloader invocations so far
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// When the job was submitted
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Enter `running` for attempt `attempt` (1-based) of `max_attempts`
    pub fn start_attempt(&mut self, attempt: u32, max_attempts: u32) -> Result<()> {
        self.transition(Status::Running)?;
        self.attempts = attempt;
        self.advance(PROGRESS_DOWNLOADING);
        self.message = format!("Downloading tracks... (attempt {attempt}/{max_attempts})");
        Ok(())
    }

    /// Replace the status message while waiting between attempts
    pub fn set_message(&mut self, message: impl Into<String>) {
        self.message = message.into();
    }

    /// Enter `finalizing` with `files` media files found
    pub fn begin_finalizing(&mut self, files: usize) -> Result<()> {
        self.transition(Status::Finalizing)?;
        self.advance(PROGRESS_FINALIZING);
        self.message = format!("Creating archive ({files} files)...");
        Ok(())
    }

    /// Enter `completed` with the written archive
    pub fn complete(&mut self, artifact_path: PathBuf, files: usize) -> Result<()> {
        self.transition(Status::Completed)?;
        self.advance(PROGRESS_DONE);
        self.artifact_path = Some(artifact_path);
        self.message = format!("Download completed! {files} tracks downloaded.");
        Ok(())
    }

    /// Enter `failed` with a human-readable reason
    pub fn fail(&mut self, reason: impl Into<String>) -> Result<()> {
        self.transition(Status::Failed)?;
        let reason = reason.into();
        self.message = format!("Download failed: {reason}");
        self.failure_reason = Some(reason);
        Ok(())
    }

    /// Read-only view for status queries
    pub fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            id: self.id,
            url: self.url.clone(),
            format: self.format,
            status: self.status,
            progress: self.progress,
            message: self.message.clone(),
            error: self.failure_reason.clone(),
            attempts: self.attempts,
            created_at: self.created_at,
        }
    }

    fn transition(&mut self, to: Status) -> Result<()> {
        if !self.status.can_transition_to(to) {
            return Err(Error::InvalidTransition {
                id: self.id,
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }

    // progress never goes backwards
    fn advance(&mut self, progress: u8) {
        self.progress = self.progress.max(progress);
    }
}

/// Shared table of all jobs submitted during the process lifetime
///
/// Entries are never removed. Cloning shares the same table.
#[derive(Debug, Clone, Default)]
pub struct JobStore {
    jobs: Arc<RwLock<HashMap<JobId, Job>>>,
}

impl JobStore {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a new job
    pub async fn insert(&self, job: Job) {
        self.jobs.write().await.insert(job.id(), job);
    }

    /// Number of jobs in the table
    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    /// Whether the table is empty
    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }

    /// Clone of a job's full record
    pub async fn get(&self, id: JobId) -> Result<Job> {
        self.jobs
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(Error::JobNotFound(id))
    }

    /// Consistent snapshot of one job
    pub async fn snapshot(&self, id: JobId) -> Result<JobSnapshot> {
        self.jobs
            .read()
            .await
            .get(&id)
            .map(Job::snapshot)
            .ok_or(Error::JobNotFound(id))
    }

    /// Apply `f` to a job under the write lock
    pub async fn update<T>(&self, id: JobId, f: impl FnOnce(&mut Job) -> Result<T>) -> Result<T> {
        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(&id).ok_or(Error::JobNotFound(id))?;
        f(job)
    }

    /// Fail every job still waiting for a worker slot
    ///
    /// Returns the IDs of the jobs that were failed.
    pub async fn fail_pending(&self, reason: &str) -> Vec<JobId> {
        let mut jobs = self.jobs.write().await;
        jobs.values_mut()
            .filter(|job| job.status() == Status::Pending)
            .filter_map(|job| job.fail(reason).ok().map(|()| job.id()))
            .collect()
    }

    /// Fail one job if it is still waiting for a worker slot
    ///
    /// Returns `true` if this call failed it.
    pub async fn fail_if_pending(&self, id: JobId, reason: &str) -> bool {
        let mut jobs = self.jobs.write().await;
        match jobs.get_mut(&id) {
            Some(job) if job.status() == Status::Pending => job.fail(reason).is_ok(),
            _ => false,
        }
    }

    /// Count jobs by state (uptime and acceptance are filled in by the caller)
    pub async fn stats(&self) -> HealthSnapshot {
        let jobs = self.jobs.read().await;
        let mut stats = HealthSnapshot {
            total_jobs: jobs.len(),
            ..HealthSnapshot::default()
        };
        for job in jobs.values() {
            match job.status() {
                Status::Completed => stats.completed_jobs += 1,
                Status::Failed => stats.failed_jobs += 1,
                _ => stats.active_jobs += 1,
            }
        }
        stats
    }
}
