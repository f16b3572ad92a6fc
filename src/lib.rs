//! # playlist-dl
//!
//! Job orchestration core for playlist download-and-archive services.
//!
//! A caller submits a playlist URL and an output format. The library runs the
//! external `spotdl` downloader on a bounded worker pool, retries transient
//! failures with exponential backoff, packs the downloaded tracks into a ZIP
//! archive, and reclaims old files in the background.
//!
//! ## Design Philosophy
//!
//! - **Library-first** - No HTTP server or CLI; glue code calls [`PlaylistDownloader`]
//! - **Errors stay inside jobs** - Only validation is reported by `submit`;
//!   everything else ends up in the job's failure reason
//! - **Event-driven** - Consumers may subscribe to events instead of polling
//! - **Testable** - The external tool sits behind the [`ToolRunner`] trait
//!
//! ## Quick Start
//!
//! ```no_run
//! use playlist_dl::{Config, PlaylistDownloader, Status};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default().with_env_credentials();
//!     let downloader = PlaylistDownloader::new(config).await?;
//!
//!     let id = downloader
//!         .submit("https://open.spotify.com/playlist/37i9dQZF1DXcBWIGoYBM5M", "mp3")
//!         .await?;
//!
//!     loop {
//!         let status = downloader.get_status(id).await?;
//!         println!("{}% {}", status.progress, status.message);
//!         if status.status.is_terminal() {
//!             break;
//!         }
//!         tokio::time::sleep(Duration::from_secs(2)).await;
//!     }
//!
//!     if downloader.get_status(id).await?.status == Status::Completed {
//!         let artifact = downloader.get_artifact(id).await?;
//!         println!("archive ready: {}", artifact.path.display());
//!     }
//!
//!     downloader.shutdown().await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Archive assembly
pub mod archive;
/// Configuration types
pub mod config;
/// Job orchestration (decomposed into focused submodules)
pub mod downloader;
/// Error types
pub mod error;
/// Job record and job table
pub mod job;
/// Age-based cleanup
pub mod retention;
/// Failure classification and exponential backoff
pub mod retry;
/// External downloader invocation
pub mod runner;
/// URL classification and format validation
pub mod source;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use downloader::PlaylistDownloader;
pub use error::{ArchiveError, Error, Result, ToHttpStatus, ValidationError};
pub use runner::{CliRunner, Invocation, MissingToolRunner, ToolOutput, ToolRunner};
pub use types::{
    Artifact, AudioFormat, Event, HealthSnapshot, JobId, JobSnapshot, SourceKind, Status,
};

/// Run the downloader until a termination signal arrives, then shut it down.
///
/// - **Unix:** SIGTERM or SIGINT.
/// - **Other platforms:** Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use playlist_dl::{Config, PlaylistDownloader, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let downloader = PlaylistDownloader::new(Config::default()).await?;
///
///     // Hand a clone to the HTTP layer, then block until a signal
///     let _api_handle = downloader.clone();
///     run_with_shutdown(downloader).await?;
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(downloader: PlaylistDownloader) -> Result<()> {
    wait_for_signal().await;
    downloader.shutdown().await
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // registration can fail in restricted environments
    match (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    ) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => tracing::info!("Received SIGTERM"),
                _ = sigint.recv() => tracing::info!("Received SIGINT"),
            }
        }
        (Ok(mut sigterm), Err(e)) => {
            tracing::warn!(error = %e, "SIGINT handler unavailable, waiting for SIGTERM");
            sigterm.recv().await;
            tracing::info!("Received SIGTERM");
        }
        (Err(e), Ok(mut sigint)) => {
            tracing::warn!(error = %e, "SIGTERM handler unavailable, waiting for SIGINT");
            sigint.recv().await;
            tracing::info!("Received SIGINT");
        }
        (Err(e), Err(_)) => {
            tracing::error!(error = %e, "No signal handlers available, falling back to ctrl_c");
            tokio::signal::ctrl_c().await.ok();
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Received Ctrl+C"),
        Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl+C"),
    }
}
