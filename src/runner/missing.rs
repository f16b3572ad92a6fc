//! Fallback runner used when no downloader binary is installed

use super::Invocation;
use super::traits::{ToolOutput, ToolRunner};
use async_trait::async_trait;
use std::time::Duration;

/// Runner that fails every invocation
///
/// Lets the service start and accept jobs when `spotdl` is missing; each job
/// then fails with a clear reason instead of the process refusing to boot.
///
/// # Examples
///
/// ```
/// use playlist_dl::runner::{MissingToolRunner, ToolRunner};
///
/// let runner = MissingToolRunner;
/// assert!(!runner.is_available());
/// assert_eq!(runner.name(), "missing");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct MissingToolRunner;

#[async_trait]
impl ToolRunner for MissingToolRunner {
    async fn run(&self, _invocation: &Invocation, _timeout: Duration) -> crate::Result<ToolOutput> {
        Err(crate::Error::ExternalTool(
            "downloader binary not found. Install spotdl or set tools.downloader_path".to_string(),
        ))
    }

    fn is_available(&self) -> bool {
        false
    }

    fn name(&self) -> &'static str {
        "missing"
    }
}
