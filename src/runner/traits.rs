//! Traits and types for downloader invocation

use super::Invocation;
use async_trait::async_trait;
use std::time::Duration;

/// Outcome of a downloader run that finished on its own
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    /// Process exit code (`None` if terminated by a signal)
    pub exit_code: Option<i32>,
    /// Captured standard error, trimmed
    pub stderr: String,
}

impl ToolOutput {
    /// Whether the process exited with status zero
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Capability to run the external downloader
///
/// # Errors
///
/// Implementations return [`crate::Error::ToolTimeout`] when the run exceeds
/// `timeout` (the process must be killed, not left running) and
/// [`crate::Error::ExternalTool`] when the process cannot be started.
/// A non-zero exit is not an error; it is reported through [`ToolOutput`].
#[async_trait]
pub trait ToolRunner: Send + Sync {
    /// Run the downloader for one attempt
    async fn run(&self, invocation: &Invocation, timeout: Duration) -> crate::Result<ToolOutput>;

    /// Whether a downloader is actually available
    fn is_available(&self) -> bool;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}
