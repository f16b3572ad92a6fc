//! Age-based cleanup of working directories and archives
//!
//! The sweeper looks at the direct children of each managed root and deletes
//! anything whose modification time is older than the configured age. It
//! knows nothing about jobs: a completed job's archive can disappear while
//! its record still says `completed`.

use crate::types::Event;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Outcome of one sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Entries removed
    pub deleted: usize,
    /// Entries that could not be inspected or removed
    pub failed: usize,
}

/// Periodic deleter of stale filesystem entries
#[derive(Debug, Clone)]
pub struct RetentionSweeper {
    roots: Vec<PathBuf>,
    max_age: Duration,
    interval: Duration,
    event_tx: Option<broadcast::Sender<Event>>,
}

impl RetentionSweeper {
    /// Create a sweeper over `roots`
    pub fn new(roots: Vec<PathBuf>, max_age: Duration, interval: Duration) -> Self {
        Self {
            roots,
            max_age,
            interval,
            event_tx: None,
        }
    }

    /// Emit [`Event::SweepComplete`] after each sweep
    pub fn with_events(mut self, event_tx: broadcast::Sender<Event>) -> Self {
        self.event_tx = Some(event_tx);
        self
    }

    /// Managed roots
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Sweep once at startup, then every interval until `cancel` fires
    pub async fn run(self, cancel: CancellationToken) {
        // interval() panics on a zero period
        let period = self.interval.max(Duration::from_secs(1));
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        info!(
            roots = self.roots.len(),
            interval_secs = period.as_secs(),
            max_age_secs = self.max_age.as_secs(),
            "retention sweeper started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("retention sweeper stopping");
                    break;
                }
                // first tick completes immediately
                _ = ticker.tick() => {
                    self.sweep_once().await;
                }
            }
        }
    }

    /// Delete every stale entry as of now
    pub async fn sweep_once(&self) -> SweepReport {
        self.sweep_once_at(SystemTime::now()).await
    }

    /// Delete every entry older than the max age as of `now`
    ///
    /// Individual failures are logged and counted; they never abort the sweep.
    pub async fn sweep_once_at(&self, now: SystemTime) -> SweepReport {
        let mut report = SweepReport::default();

        for root in &self.roots {
            let mut entries = match tokio::fs::read_dir(root).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => {
                    warn!(root = %root.display(), error = %e, "failed to read retention root");
                    report.failed += 1;
                    continue;
                }
            };

            loop {
                let entry = match entries.next_entry().await {
                    Ok(Some(entry)) => entry,
                    Ok(None) => break,
                    Err(e) => {
                        warn!(root = %root.display(), error = %e, "failed to read directory entry");
                        report.failed += 1;
                        break;
                    }
                };
                match self.sweep_entry(&entry.path(), now).await {
                    Ok(true) => report.deleted += 1,
                    Ok(false) => {}
                    Err(e) => {
                        warn!(path = %entry.path().display(), error = %e, "failed to remove stale entry");
                        report.failed += 1;
                    }
                }
            }
        }

        if report.deleted > 0 || report.failed > 0 {
            info!(
                deleted = report.deleted,
                failed = report.failed,
                "retention sweep complete"
            );
        } else {
            debug!("retention sweep found nothing to delete");
        }

        if let Some(tx) = &self.event_tx {
            tx.send(Event::SweepComplete {
                deleted: report.deleted,
                failed: report.failed,
            })
            .ok();
        }

        report
    }

    async fn sweep_entry(&self, path: &Path, now: SystemTime) -> std::io::Result<bool> {
        let metadata = match tokio::fs::symlink_metadata(path).await {
            Ok(metadata) => metadata,
            // removed concurrently
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e),
        };

        let age = now
            .duration_since(metadata.modified()?)
            .unwrap_or(Duration::ZERO);
        if age <= self.max_age {
            return Ok(false);
        }

        let removed = if metadata.is_dir() {
            tokio::fs::remove_dir_all(path).await
        } else {
            tokio::fs::remove_file(path).await
        };
        match removed {
            Ok(()) => {
                debug!(path = %path.display(), age_secs = age.as_secs(), "removed stale entry");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }
}
