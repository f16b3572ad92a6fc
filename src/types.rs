//! Core types for playlist-dl

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Unique identifier for a download job
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub Uuid);

impl JobId {
    /// Generate a fresh random job ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID
    pub fn get(&self) -> Uuid {
        self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for JobId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl std::str::FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Job status
///
/// Transitions only move forward; `Running` may be re-entered across retry attempts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Created, waiting for a worker slot
    Pending,
    /// Invoking the external downloader
    Running,
    /// Packaging downloaded files into the archive
    Finalizing,
    /// Archive written, artifact available
    Completed,
    /// Terminal failure, see the failure reason
    Failed,
}

impl Status {
    /// Whether this status is terminal (`Completed` or `Failed`)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Status::Completed | Status::Failed)
    }

    /// Whether the job is still being worked on (pending or in flight)
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    /// Whether moving from `self` to `next` is a legal transition
    pub fn can_transition_to(&self, next: Status) -> bool {
        matches!(
            (self, next),
            (Status::Pending, Status::Running)
                | (Status::Pending, Status::Failed)
                | (Status::Running, Status::Running)
                | (Status::Running, Status::Finalizing)
                | (Status::Running, Status::Failed)
                | (Status::Finalizing, Status::Completed)
                | (Status::Finalizing, Status::Failed)
        )
    }

    /// Lowercase name, as serialized
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::Running => "running",
            Status::Finalizing => "finalizing",
            Status::Completed => "completed",
            Status::Failed => "failed",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output audio format accepted by the downloader
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    /// MPEG-1 Layer III (lossy)
    Mp3,
    /// Free Lossless Audio Codec
    Flac,
    /// Uncompressed PCM
    Wav,
}

impl AudioFormat {
    /// All accepted formats
    pub const ALL: [AudioFormat; 3] = [AudioFormat::Mp3, AudioFormat::Flac, AudioFormat::Wav];

    /// Token passed to the downloader's `--format` argument
    pub fn as_str(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Flac => "flac",
            AudioFormat::Wav => "wav",
        }
    }
}

impl std::fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Origin category of a submitted URL
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Not a well-formed, allow-listed URL
    Invalid,
    /// Music streaming service (Spotify)
    Streaming,
    /// Video site (YouTube, YouTube Music)
    VideoSite,
}

impl SourceKind {
    /// Whether the URL was accepted
    pub fn is_valid(&self) -> bool {
        !matches!(self, SourceKind::Invalid)
    }
}

/// Read-only view of a job, returned by status queries
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JobSnapshot {
    /// Job ID
    pub id: JobId,
    /// Submitted playlist URL
    pub url: String,
    /// Requested output format
    pub format: AudioFormat,
    /// Current status
    pub status: Status,
    /// Progress percentage (0 to 100)
    pub progress: u8,
    /// Human-readable description of the current activity
    pub message: String,
    /// Failure reason (only set once the job has failed)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Number of downloader invocations so far
    pub attempts: u32,
    /// When the job was submitted
    pub created_at: DateTime<Utc>,
}

/// Location of a finished archive
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// Path of the archive on disk
    pub path: PathBuf,
    /// Suggested file name for the client (`playlist_<format>.zip`)
    pub file_name: String,
}

/// Health and job-table statistics
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthSnapshot {
    /// Jobs that have not reached a terminal state
    pub active_jobs: usize,
    /// Jobs that completed successfully
    pub completed_jobs: usize,
    /// Jobs that failed
    pub failed_jobs: usize,
    /// All jobs in the table
    pub total_jobs: usize,
    /// Seconds since the downloader was created
    pub uptime_secs: u64,
    /// Whether new submissions are accepted
    pub accepting_new: bool,
}

/// Event emitted during the job lifecycle
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Job created and queued for a worker
    Queued {
        /// Job ID
        id: JobId,
        /// Source URL
        url: String,
    },

    /// Downloader invocation started
    AttemptStarted {
        /// Job ID
        id: JobId,
        /// Attempt number (1-based)
        attempt: u32,
        /// Attempt budget
        max_attempts: u32,
    },

    /// Attempt failed, another one is scheduled
    RetryScheduled {
        /// Job ID
        id: JobId,
        /// Attempt that failed (1-based)
        attempt: u32,
        /// Delay before the next attempt in milliseconds
        delay_ms: u64,
        /// Diagnostic reported by the downloader
        reason: String,
    },

    /// Downloads finished, archive is being written
    Finalizing {
        /// Job ID
        id: JobId,
        /// Number of media files found
        files: usize,
    },

    /// Archive written
    Completed {
        /// Job ID
        id: JobId,
        /// Archive location
        path: PathBuf,
        /// Files in the archive
        files: usize,
    },

    /// Job failed
    Failed {
        /// Job ID
        id: JobId,
        /// Failure reason
        error: String,
    },

    /// Retention sweep finished
    SweepComplete {
        /// Entries removed
        deleted: usize,
        /// Entries that could not be removed
        failed: usize,
    },

    /// Downloader shut down
    Shutdown,
}
