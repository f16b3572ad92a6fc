//! Process-wide spacing of downloader starts

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Enforces a minimum interval between consecutive downloader starts
///
/// Shared by all workers. Callers queue on the inner lock, so starts are
/// serialized even when several jobs become ready at the same moment.
#[derive(Debug, Clone)]
pub struct RateGate {
    min_interval: Duration,
    last_start: Arc<Mutex<Option<Instant>>>,
}

impl RateGate {
    /// Create a gate with the given minimum spacing
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_start: Arc::new(Mutex::new(None)),
        }
    }

    /// Configured minimum spacing
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Wait until a start is permitted and record it
    ///
    /// Returns the instant at which the start was granted.
    pub async fn wait(&self) -> Instant {
        let mut last = self.last_start.lock().await;
        if let Some(previous) = *last {
            let ready_at = previous + self.min_interval;
            if ready_at > Instant::now() {
                tokio::time::sleep_until(ready_at).await;
            }
        }
        let granted = Instant::now();
        *last = Some(granted);
        granted
    }
}
