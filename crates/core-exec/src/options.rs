//! Executor configuration block.

use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

/// Everything the executor needs to know about one run. Built by the caller
/// (CLI flags over config-file defaults) and immutable afterwards.
#[derive(Debug, Clone, Default)]
pub struct ExecOptions {
    /// Max concurrent children; 0 means the host parallelism count.
    pub jobs: usize,
    /// Sleep between successive dispatches, serialized on the dispatcher.
    pub delay: Option<Duration>,
    /// Per-child wall clock limit.
    pub timeout: Option<Duration>,
    /// Total attempts per row = max(1, retries).
    pub retries: u32,
    /// Run the whole source sequence this many times, resetting in between.
    pub repeat: u32,
    /// Print composed argvs instead of spawning.
    pub dry: bool,
    /// Route through `$SHELL -c` instead of direct exec.
    pub shell: bool,
    /// Propagate the parent's environment to children.
    pub env: bool,
    /// Discard child stdout/stderr.
    pub quiet: bool,
    /// Capture child output to a temp file and replay it serialized.
    pub defer: bool,
    /// Print each argv on its first attempt.
    pub verbose: bool,
    /// Child working directory.
    pub working_dir: Option<PathBuf>,
    /// Where deferred capture files are created.
    pub temp_dir: Option<PathBuf>,
}

impl ExecOptions {
    pub fn attempts(&self) -> u32 {
        self.retries.max(1)
    }

    pub fn passes(&self) -> u32 {
        self.repeat.max(1)
    }

    pub fn effective_jobs(&self) -> usize {
        if self.jobs == 0 {
            thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1)
        } else {
            self.jobs
        }
    }

    /// A timeout of zero means no timeout.
    pub fn effective_timeout(&self) -> Option<Duration> {
        self.timeout.filter(|t| !t.is_zero())
    }
}
