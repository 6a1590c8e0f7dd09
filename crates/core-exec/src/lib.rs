//! Bounded-concurrency execution of expanded rows.
//!
//! The [`Executor`] drains a source, renders each tuple through the template,
//! and schedules one child process per row under a semaphore, with optional
//! delay, timeout, retries, and serialized deferred output. A shared
//! [`CancelToken`] propagates SIGINT/SIGTERM to the dispatcher and every
//! running child.

mod cancel;
mod command;
mod executor;
mod options;
mod sink;

pub use cancel::{CancelToken, spawn_signal_listener};
pub use executor::Executor;
pub use options::ExecOptions;
pub use sink::{OutputSinks, TAG_STDERR, TAG_STDOUT};

use std::process::ExitStatus;
use std::time::Duration;

use thiserror::Error;

/// Runtime failures of a run. Parse errors never reach this type; they are
/// raised by the source and template crates before anything spawns.
#[derive(Debug, Error)]
pub enum ExecError {
    /// A placeholder resolved outside the tuple. Fatal: cancels the run.
    #[error(transparent)]
    Expand(#[from] core_template::ExpandError),
    /// The child could not be started. Subject to retry.
    #[error("spawn {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    /// The child ran and failed. Subject to retry.
    #[error("command exited with {status}")]
    ChildFailed { status: ExitStatus },
    /// The child outlived its wall clock limit and was killed. Subject to
    /// retry.
    #[error("command timed out after {0:?}")]
    TimedOut(Duration),
    /// An external signal stopped the run. Returned only when no
    /// substantive error was captured first.
    #[error("cancelled")]
    Cancelled,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ExecError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ExecError::Cancelled)
    }
}
