//! Error types for playlist-dl
//!
//! Validation errors are returned synchronously from `submit`. Failures that
//! happen while a job runs never cross the job boundary; they end up in the
//! job's failure reason. The remaining variants cover status and artifact
//! queries, configuration and internal faults.

use crate::types::{JobId, Status};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for playlist-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for playlist-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Submission rejected before a job was created
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// No job with this ID
    #[error("job {0} not found")]
    JobNotFound(JobId),

    /// Job has not completed (still running, or failed)
    #[error("job {id} is not ready ({status})")]
    NotReady {
        /// The job that was queried
        id: JobId,
        /// Its current status
        status: Status,
    },

    /// Job completed but its archive has been reclaimed
    #[error("artifact for job {id} no longer exists at {path}")]
    ArtifactMissing {
        /// The job that was queried
        id: JobId,
        /// Where the archive used to be
        path: PathBuf,
    },

    /// Downloader did not finish within the allowed time
    #[error("external tool timed out after {}s", timeout.as_secs())]
    ToolTimeout {
        /// The timeout that was exceeded
        timeout: Duration,
    },

    /// External downloader could not be executed
    #[error("external tool error: {0}")]
    ExternalTool(String),

    /// Archive creation failed
    #[error("archive error: {0}")]
    Archive(#[from] ArchiveError),

    /// Illegal job status transition
    #[error("invalid transition for job {id}: {from} -> {to}")]
    InvalidTransition {
        /// Job ID
        id: JobId,
        /// Current status
        from: Status,
        /// Requested status
        to: Status,
    },

    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "max_attempts")
        key: Option<String>,
    },

    /// Shutdown in progress - not accepting new jobs
    #[error("shutdown in progress: not accepting new jobs")]
    ShuttingDown,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Input rejected at submission time
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// URL is malformed or not from a supported site
    #[error("invalid or unsupported URL: {0}")]
    InvalidUrl(String),

    /// Format is not one of the supported output formats
    #[error("invalid format {0:?}, supported formats: wav, flac, mp3")]
    InvalidFormat(String),
}

/// Archive creation errors
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Source directory holds no files
    #[error("no files to archive in {0}")]
    NoFiles(PathBuf),

    /// Writing the archive failed
    #[error("failed to write archive {path}: {reason}")]
    Write {
        /// Destination archive path
        path: PathBuf,
        /// Underlying failure
        reason: String,
    },
}

/// Convert errors to HTTP status codes for the application layer
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            Error::Validation(_) => 400,
            Error::Config { .. } => 400,

            Error::JobNotFound(_) => 404,
            Error::ArtifactMissing { .. } => 404,

            Error::NotReady { .. } => 409,

            Error::ShuttingDown => 503,
            Error::ExternalTool(_) => 503,

            Error::ToolTimeout { .. } => 504,

            Error::Archive(_) => 500,
            Error::InvalidTransition { .. } => 500,
            Error::Io(_) => 500,
            Error::Other(_) => 500,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Validation(ValidationError::InvalidUrl(_)) => "invalid_url",
            Error::Validation(ValidationError::InvalidFormat(_)) => "invalid_format",
            Error::JobNotFound(_) => "job_not_found",
            Error::NotReady { .. } => "not_ready",
            Error::ArtifactMissing { .. } => "artifact_missing",
            Error::ToolTimeout { .. } => "tool_timeout",
            Error::ExternalTool(_) => "external_tool_error",
            Error::Archive(ArchiveError::NoFiles(_)) => "archive_empty",
            Error::Archive(ArchiveError::Write { .. }) => "archive_write_failed",
            Error::InvalidTransition { .. } => "invalid_transition",
            Error::Config { .. } => "config_error",
            Error::ShuttingDown => "shutting_down",
            Error::Io(_) => "io_error",
            Error::Other(_) => "internal_error",
        }
    }
}
