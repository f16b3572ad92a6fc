//! Downloader runner backed by the `spotdl` command-line tool

use super::Invocation;
use super::traits::{ToolOutput, ToolRunner};
use crate::error::Error;
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Runs the external `spotdl` binary
///
/// The child is spawned with `kill_on_drop`, so a run that exceeds its
/// timeout is killed when the pending wait is dropped. On unix it also leads
/// its own process group, and the whole group (helpers such as ffmpeg
/// included) is killed on timeout.
///
/// # Examples
///
/// ```no_run
/// use playlist_dl::runner::CliRunner;
/// use std::path::PathBuf;
///
/// // Explicit binary
/// let runner = CliRunner::new(PathBuf::from("/usr/local/bin/spotdl"));
///
/// // Or auto-discover from PATH
/// let runner = CliRunner::from_path().expect("spotdl not found in PATH");
/// ```
#[derive(Debug, Clone)]
pub struct CliRunner {
    binary_path: PathBuf,
    prefix_args: Vec<OsString>,
}

impl CliRunner {
    /// Create a runner for an explicit binary path
    pub fn new(binary_path: PathBuf) -> Self {
        Self {
            binary_path,
            prefix_args: Vec::new(),
        }
    }

    /// Search PATH for `spotdl`
    ///
    /// Returns `None` if the binary is not installed.
    pub fn from_path() -> Option<Self> {
        which::which("spotdl").ok().map(Self::new)
    }

    /// Arguments placed before the invocation's own arguments
    ///
    /// Used for wrappers such as `python -m spotdl`.
    pub fn with_prefix_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.prefix_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Path of the binary this runner executes
    pub fn binary_path(&self) -> &PathBuf {
        &self.binary_path
    }
}

#[async_trait]
impl ToolRunner for CliRunner {
    async fn run(&self, invocation: &Invocation, timeout: Duration) -> crate::Result<ToolOutput> {
        tracing::info!(
            binary = %self.binary_path.display(),
            url = %invocation.url,
            format = %invocation.format,
            output = %invocation.output_dir.display(),
            "running downloader"
        );

        let mut command = Command::new(&self.binary_path);
        command
            .args(&self.prefix_args)
            .args(invocation.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        command.process_group(0);

        let child = command
            .spawn()
            .map_err(|e| Error::ExternalTool(format!("Failed to execute downloader: {}", e)))?;
        let pid = child.id();

        match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => {
                let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
                let exit_code = output.status.code();
                tracing::debug!(?exit_code, stderr_len = stderr.len(), "downloader exited");
                Ok(ToolOutput { exit_code, stderr })
            }
            Ok(Err(e)) => Err(Error::ExternalTool(format!(
                "Failed to wait for downloader: {}",
                e
            ))),
            Err(_) => {
                if let Some(pid) = pid {
                    kill_process_group(pid);
                }
                tracing::warn!(
                    url = %invocation.url,
                    timeout_secs = timeout.as_secs(),
                    "downloader timed out, process killed"
                );
                Err(Error::ToolTimeout { timeout })
            }
        }
    }

    fn is_available(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "cli-spotdl"
    }
}

/// Kill every process in the group led by `pid`
#[cfg(unix)]
fn kill_process_group(pid: u32) {
    let Ok(pgid) = libc::pid_t::try_from(pid) else {
        return;
    };
    // SAFETY: kill(2) has no memory-safety preconditions
    let rc = unsafe { libc::kill(-pgid, libc::SIGKILL) };
    if rc != 0 {
        tracing::debug!(
            pgid,
            error = %std::io::Error::last_os_error(),
            "process group already gone"
        );
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: u32) {}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProcessConfig;
    use crate::types::{AudioFormat, SourceKind};

    fn invocation() -> Invocation {
        Invocation::new(
            "https://youtu.be/abc",
            SourceKind::VideoSite,
            AudioFormat::Mp3,
            std::env::temp_dir(),
            &ProcessConfig::default(),
            None,
        )
    }

    #[test]
    fn from_path_returns_none_for_nonexistent_binary() {
        let result = which::which("nonexistent-spotdl-binary-xyz");
        assert!(result.is_err());
    }

    #[test]
    fn from_path_uses_discovered_binary() {
        if let Some(runner) = CliRunner::from_path() {
            assert!(runner.binary_path().ends_with("spotdl"));
            assert_eq!(runner.name(), "cli-spotdl");
        }
    }

    #[tokio::test]
    async fn spawn_failure_is_external_tool_error() {
        let runner = CliRunner::new(PathBuf::from("/nonexistent/spotdl-xyz"));
        let err = runner
            .run(&invocation(), Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ExternalTool(_)));
        assert!(err.to_string().contains("Failed to execute downloader"));
    }

    // `sh -c <script> <argv0> <args...>` ignores the trailing invocation args
    #[cfg(unix)]
    fn shell(script: &str) -> CliRunner {
        CliRunner::new(PathBuf::from("/bin/sh")).with_prefix_args(["-c", script, "sh"])
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn captures_exit_code_and_stderr() {
        let runner = shell("echo 'HTTP Error 429: Too Many Requests' >&2; exit 3");
        let output = runner
            .run(&invocation(), Duration::from_secs(10))
            .await
            .unwrap();
        assert_eq!(output.exit_code, Some(3));
        assert!(!output.success());
        assert_eq!(output.stderr, "HTTP Error 429: Too Many Requests");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn receives_invocation_arguments() {
        // $1 is the URL, $2 the --format flag
        let runner = shell("test \"$1\" = https://youtu.be/abc && test \"$3\" = mp3");
        let output = runner
            .run(&invocation(), Duration::from_secs(10))
            .await
            .unwrap();
        assert!(output.success());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn timeout_kills_the_process() {
        let runner = shell("exec sleep 30");
        let started = std::time::Instant::now();
        let err = runner
            .run(&invocation(), Duration::from_millis(200))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ToolTimeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    // a helper left behind by the tool is killed with it
    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn timeout_kills_helper_processes() {
        let tmp = tempfile::TempDir::new().unwrap();
        let pid_file = tmp.path().join("helper.pid");
        let script = format!("sleep 30 & echo $! > '{}'; wait", pid_file.display());
        let runner = shell(&script);

        let err = runner
            .run(&invocation(), Duration::from_millis(300))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ToolTimeout { .. }));

        let pid: u32 = std::fs::read_to_string(&pid_file)
            .unwrap()
            .trim()
            .parse()
            .unwrap();
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while process_running(pid) {
            assert!(
                std::time::Instant::now() < deadline,
                "helper process {pid} survived the timeout"
            );
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }

    // a zombie has already exited
    #[cfg(target_os = "linux")]
    fn process_running(pid: u32) -> bool {
        match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
            Ok(stat) => stat
                .rsplit_once(") ")
                .and_then(|(_, rest)| rest.chars().next())
                .is_some_and(|state| state != 'Z' && state != 'X'),
            Err(_) => false,
        }
    }
}
