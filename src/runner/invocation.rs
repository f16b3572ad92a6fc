//! Argument construction for one downloader run

use crate::config::{Credentials, ProcessConfig};
use crate::types::{AudioFormat, SourceKind};
use std::ffi::OsString;
use std::path::PathBuf;

/// Everything needed to invoke the downloader for one job
#[derive(Debug, Clone)]
pub struct Invocation {
    /// Playlist URL
    pub url: String,
    /// Classified origin of the URL
    pub source: SourceKind,
    /// Requested output format
    pub format: AudioFormat,
    /// Per-job working directory the tool writes into
    pub output_dir: PathBuf,
    /// Streaming service credentials, if configured
    pub credentials: Option<Credentials>,
    /// `--threads`
    pub threads: u32,
    /// `--bitrate`
    pub bitrate: String,
    /// `--max-retries`
    pub tool_max_retries: u32,
    /// `--sponsor-block`
    pub sponsor_block: bool,
}

impl Invocation {
    /// Build an invocation from the process settings
    pub fn new(
        url: impl Into<String>,
        source: SourceKind,
        format: AudioFormat,
        output_dir: PathBuf,
        process: &ProcessConfig,
        credentials: Option<Credentials>,
    ) -> Self {
        Self {
            url: url.into(),
            source,
            format,
            output_dir,
            credentials,
            threads: process.threads,
            bitrate: process.bitrate.clone(),
            tool_max_retries: process.tool_max_retries,
            sponsor_block: process.sponsor_block,
        }
    }

    /// Whether this run talks to the streaming service without credentials
    pub fn is_unauthenticated_streaming(&self) -> bool {
        self.source == SourceKind::Streaming && self.credentials.is_none()
    }

    /// Command-line arguments for the downloader (without the program itself)
    pub fn args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            self.url.clone().into(),
            "--format".into(),
            self.format.as_str().into(),
            "--output".into(),
            self.output_dir.clone().into_os_string(),
            "--threads".into(),
            self.threads.to_string().into(),
            "--bitrate".into(),
            self.bitrate.clone().into(),
            "--max-retries".into(),
            self.tool_max_retries.to_string().into(),
        ];
        if self.sponsor_block {
            args.push("--sponsor-block".into());
        }

        match self.source {
            SourceKind::Streaming => {
                args.extend(
                    [
                        "--audio",
                        "youtube",
                        "youtube-music",
                        "--lyrics",
                        "genius",
                        "musixmatch",
                        "--dont-filter-results",
                    ]
                    .map(OsString::from),
                );
                if let Some(creds) = &self.credentials {
                    args.push("--client-id".into());
                    args.push(creds.client_id.clone().into());
                    args.push("--client-secret".into());
                    args.push(creds.client_secret.clone().into());
                }
            }
            SourceKind::VideoSite => {
                args.extend(["--audio", "youtube-music", "youtube", "--ytm-data"].map(OsString::from));
            }
            SourceKind::Invalid => {}
        }

        args
    }
}
