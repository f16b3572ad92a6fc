//! Scripted stand-in for the external downloader

use async_trait::async_trait;
use playlist_dl::{Error, Invocation, ToolOutput, ToolRunner};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// What one scripted invocation does
#[derive(Debug, Clone)]
pub enum Step {
    /// Exit 0 after writing this many `.mp3` files into the output directory
    Succeed { files: usize },
    /// Exit 0 after writing non-media files only
    SucceedWithoutMedia,
    /// Exit with a code and standard error text
    Fail { exit_code: i32, stderr: String },
    /// Report a timeout
    Timeout,
    /// Panic inside the runner
    Panic,
}

impl Step {
    /// Failing step with exit code 1
    pub fn fail(stderr: &str) -> Self {
        Step::Fail {
            exit_code: 1,
            stderr: stderr.to_string(),
        }
    }
}

/// Fake `ToolRunner` that plays back a script of steps
///
/// Once the script is exhausted every call uses the fallback step.
pub struct ScriptedRunner {
    script: Mutex<VecDeque<Step>>,
    fallback: Step,
    hold: Duration,
    calls: AtomicU32,
    running: AtomicUsize,
    max_running: AtomicUsize,
    starts: Mutex<Vec<Instant>>,
    invocations: Mutex<Vec<Invocation>>,
}

impl ScriptedRunner {
    /// Runner that always performs `step`
    pub fn always(step: Step) -> Self {
        Self::scripted(Vec::new(), step)
    }

    /// Runner that plays `steps` in order, then `fallback`
    pub fn scripted(steps: Vec<Step>, fallback: Step) -> Self {
        Self {
            script: Mutex::new(steps.into()),
            fallback,
            hold: Duration::ZERO,
            calls: AtomicU32::new(0),
            running: AtomicUsize::new(0),
            max_running: AtomicUsize::new(0),
            starts: Mutex::new(Vec::new()),
            invocations: Mutex::new(Vec::new()),
        }
    }

    /// Make every run take at least `hold`
    pub fn with_hold(mut self, hold: Duration) -> Self {
        self.hold = hold;
        self
    }

    /// Number of invocations so far
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneous invocations observed
    pub fn max_running(&self) -> usize {
        self.max_running.load(Ordering::SeqCst)
    }

    /// Start instants of every invocation, in call order
    pub fn starts(&self) -> Vec<Instant> {
        self.starts.lock().unwrap().clone()
    }

    /// Every invocation received, in call order
    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations.lock().unwrap().clone()
    }

    fn next_step(&self) -> Step {
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

#[async_trait]
impl ToolRunner for ScriptedRunner {
    async fn run(
        &self,
        invocation: &Invocation,
        timeout: Duration,
    ) -> playlist_dl::Result<ToolOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.starts.lock().unwrap().push(Instant::now());
        self.invocations.lock().unwrap().push(invocation.clone());
        let now_running = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_running.fetch_max(now_running, Ordering::SeqCst);

        let step = self.next_step();
        if !self.hold.is_zero() {
            tokio::time::sleep(self.hold).await;
        }

        let result = match step {
            Step::Succeed { files } => {
                std::fs::create_dir_all(&invocation.output_dir).unwrap();
                for i in 0..files {
                    let path = invocation.output_dir.join(format!("track_{i:02}.mp3"));
                    std::fs::write(path, format!("audio {i}")).unwrap();
                }
                Ok(ToolOutput {
                    exit_code: Some(0),
                    stderr: String::new(),
                })
            }
            Step::SucceedWithoutMedia => {
                std::fs::create_dir_all(&invocation.output_dir).unwrap();
                std::fs::write(invocation.output_dir.join("log.txt"), "nothing").unwrap();
                Ok(ToolOutput {
                    exit_code: Some(0),
                    stderr: String::new(),
                })
            }
            Step::Fail { exit_code, stderr } => Ok(ToolOutput {
                exit_code: Some(exit_code),
                stderr,
            }),
            Step::Timeout => Err(Error::ToolTimeout { timeout }),
            Step::Panic => {
                self.running.fetch_sub(1, Ordering::SeqCst);
                panic!("scripted runner panic");
            }
        };

        self.running.fetch_sub(1, Ordering::SeqCst);
        result
    }

    fn is_available(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}
