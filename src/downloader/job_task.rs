//! Per-job attempt loop and finalization.
//!
//! Everything that can go wrong inside a job (tool failures, I/O errors,
//! even panics) ends as a `failed` job; nothing escapes to the worker pool.

use super::PlaylistDownloader;
use crate::archive::{archive_directory, count_media_files_blocking};
use crate::error::{Error, Result};
use crate::retry::{AttemptFailure, FailureKind, RetryDecision, decide};
use crate::runner::Invocation;
use crate::types::{Event, JobId};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};

/// Failure reason when every attempt timed out
pub(crate) const TIMEOUT_REASON: &str =
    "Download timed out. The playlist might be too large or there are network issues.";

/// Failure reason when the tool succeeded but produced no media
pub(crate) const NO_FILES_REASON: &str =
    "No audio files were downloaded. The playlist might be empty or inaccessible.";

/// Result of a single downloader invocation
enum AttemptResult {
    /// Tool succeeded and left this many media files
    Downloaded(usize),
    /// Tool succeeded but left no media files
    Empty,
    /// Tool was killed after the process timeout
    TimedOut,
    /// Tool failed or could not be started
    Failed(AttemptFailure),
}

/// How a job ended
enum JobOutcome {
    Completed { archive: PathBuf, files: usize },
    Failed(String),
}

impl PlaylistDownloader {
    /// Drive one job to a terminal state
    pub(crate) async fn run_job_task(&self, id: JobId) {
        let outcome = match AssertUnwindSafe(self.execute_job(id)).catch_unwind().await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                tracing::error!(job_id = %id, error = %e, "job aborted by internal error");
                JobOutcome::Failed(format!("Internal error: {}", e))
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                tracing::error!(job_id = %id, panic = %message, "job task panicked");
                JobOutcome::Failed(format!("Internal error: {}", message))
            }
        };

        match outcome {
            JobOutcome::Completed { archive, files } => self.complete_job(id, archive, files).await,
            JobOutcome::Failed(reason) => self.fail_job(id, reason).await,
        }
    }

    async fn execute_job(&self, id: JobId) -> Result<JobOutcome> {
        let job = self.jobs.get(id).await?;
        let retry = &self.config.retry;
        let max_attempts = retry.max_attempts;
        let invocation = Invocation::new(
            job.url(),
            job.source(),
            job.format(),
            job.work_dir().to_path_buf(),
            &self.config.process,
            self.config.tools.credentials.clone(),
        );

        let mut attempt: u32 = 0;
        let files = loop {
            self.jobs
                .update(id, |job| job.start_attempt(attempt + 1, max_attempts))
                .await?;
            tracing::info!(
                job_id = %id,
                attempt = attempt + 1,
                max_attempts,
                "starting download attempt"
            );
            self.emit(Event::AttemptStarted {
                id,
                attempt: attempt + 1,
                max_attempts,
            });

            let (failure, exhausted_reason) = match self.run_attempt(&invocation).await? {
                AttemptResult::Downloaded(files) => break files,
                AttemptResult::Empty => (
                    AttemptFailure::unknown(NO_FILES_REASON),
                    NO_FILES_REASON.to_string(),
                ),
                AttemptResult::TimedOut => (
                    AttemptFailure::unknown(TIMEOUT_REASON),
                    TIMEOUT_REASON.to_string(),
                ),
                AttemptResult::Failed(failure) => {
                    let reason = format!(
                        "Download failed after {} attempts: {}",
                        max_attempts, failure.diagnostic
                    );
                    (failure, reason)
                }
            };

            match decide(failure.kind, attempt, retry) {
                RetryDecision::RetryAfter(delay) => {
                    let message = if failure.kind == FailureKind::RateLimited {
                        format!(
                            "Rate limited, waiting {:.0}s before retry...",
                            delay.as_secs_f64()
                        )
                    } else {
                        format!(
                            "Retrying download (attempt {}/{})...",
                            attempt + 2,
                            max_attempts
                        )
                    };
                    self.jobs
                        .update(id, |job| {
                            job.set_message(message);
                            Ok(())
                        })
                        .await?;

                    let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
                    tracing::warn!(
                        job_id = %id,
                        attempt = attempt + 1,
                        kind = ?failure.kind,
                        delay_ms,
                        error = %failure,
                        "download attempt failed, retrying"
                    );
                    self.emit(Event::RetryScheduled {
                        id,
                        attempt: attempt + 1,
                        delay_ms,
                        reason: failure.diagnostic,
                    });

                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                RetryDecision::PermanentFailure => {
                    tracing::warn!(job_id = %id, error = %failure, "content not found, not retrying");
                    return Ok(JobOutcome::Failed(format!(
                        "Content not found or URL invalid: {}",
                        failure.diagnostic
                    )));
                }
                RetryDecision::Exhausted => {
                    tracing::warn!(job_id = %id, attempts = attempt + 1, "attempt budget exhausted");
                    return Ok(JobOutcome::Failed(exhausted_reason));
                }
            }
        };

        self.jobs.update(id, |job| job.begin_finalizing(files)).await?;
        self.emit(Event::Finalizing { id, files });

        let archive = self.archive_path(id, job.format());
        match archive_directory(job.work_dir().to_path_buf(), archive.clone()).await {
            Ok(_) => Ok(JobOutcome::Completed { archive, files }),
            Err(e) => Ok(JobOutcome::Failed(format!("Failed to create archive: {}", e))),
        }
    }

    /// One downloader invocation, after the pacing waits
    ///
    /// Only I/O errors on the working directory are returned as `Err`.
    async fn run_attempt(&self, invocation: &Invocation) -> Result<AttemptResult> {
        tokio::fs::create_dir_all(&invocation.output_dir).await?;

        let process = &self.config.process;
        if invocation.is_unauthenticated_streaming() && !process.unauthenticated_delay.is_zero() {
            tokio::time::sleep(process.unauthenticated_delay).await;
        }
        self.rate_gate.wait().await;

        let result = match self.runner.run(invocation, process.timeout).await {
            Ok(output) if output.success() => {
                match count_media_files_blocking(invocation.output_dir.clone()).await? {
                    0 => AttemptResult::Empty,
                    files => AttemptResult::Downloaded(files),
                }
            }
            Ok(output) => {
                let diagnostic = if !output.stderr.is_empty() {
                    output.stderr
                } else {
                    match output.exit_code {
                        Some(code) => format!("downloader exited with code {}", code),
                        None => "downloader was terminated by a signal".to_string(),
                    }
                };
                AttemptResult::Failed(AttemptFailure::from_diagnostic(diagnostic))
            }
            Err(Error::ToolTimeout { .. }) => AttemptResult::TimedOut,
            Err(e) => AttemptResult::Failed(AttemptFailure::unknown(e.to_string())),
        };
        Ok(result)
    }

    async fn complete_job(&self, id: JobId, archive: PathBuf, files: usize) {
        let recorded = self
            .jobs
            .update(id, |job| job.complete(archive.clone(), files))
            .await;
        match recorded {
            Ok(()) => {
                tracing::info!(job_id = %id, archive = %archive.display(), files, "job completed");
                self.emit(Event::Completed {
                    id,
                    path: archive,
                    files,
                });
            }
            Err(e) => tracing::error!(job_id = %id, error = %e, "failed to record completion"),
        }
    }

    async fn fail_job(&self, id: JobId, reason: String) {
        match self.jobs.update(id, |job| job.fail(reason.clone())).await {
            Ok(()) => {
                tracing::error!(job_id = %id, reason = %reason, "job failed");
                self.emit(Event::Failed { id, error: reason });
            }
            Err(e) => tracing::debug!(job_id = %id, error = %e, "job already terminal"),
        }
        remove_work_dir(&self.work_dir(id)).await;
    }
}

async fn remove_work_dir(dir: &Path) {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => tracing::debug!(dir = %dir.display(), "removed working directory"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(dir = %dir.display(), error = %e, "failed to remove working directory"),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_message_handles_common_payloads() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("static message");
        assert_eq!(panic_message(payload.as_ref()), "static message");

        let payload: Box<dyn std::any::Any + Send> = Box::new(String::from("owned message"));
        assert_eq!(panic_message(payload.as_ref()), "owned message");

        let payload: Box<dyn std::any::Any + Send> = Box::new(42u32);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic");
    }

    #[tokio::test]
    async fn removing_missing_work_dir_is_silent() {
        let tmp = tempfile::TempDir::new().unwrap();
        remove_work_dir(&tmp.path().join("download_missing")).await;

        let dir = tmp.path().join("download_present");
        std::fs::create_dir_all(dir.join("nested")).unwrap();
        remove_work_dir(&dir).await;
        assert!(!dir.exists());
    }
}
