//! Dispatcher and worker loops.

use std::process::Stdio;
use std::sync::Arc;

use core_source::Source;
use core_template::Template;
use tokio::process::Child;
use tokio::sync::{Mutex as AsyncMutex, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::cancel::CancelToken;
use crate::sink::{ChildLog, OutputSinks, TAG_STDERR, TAG_STDOUT, pump};
use crate::{ExecError, ExecOptions, command};

/// Runs every row of a source through a template under the configured
/// constraints. The sinks, cancel token, and replay mutex are collaborators
/// owned here and shared with every worker.
pub struct Executor {
    options: ExecOptions,
    sinks: OutputSinks,
    cancel: CancelToken,
    replay_lock: Arc<AsyncMutex<()>>,
}

impl Executor {
    pub fn new(options: ExecOptions) -> Self {
        Self::with_sinks(options, OutputSinks::standard(), CancelToken::new())
    }

    /// Construct with explicit output sinks and cancel token. Tests inject
    /// buffers here; the binary shares one token with its signal listener.
    pub fn with_sinks(options: ExecOptions, sinks: OutputSinks, cancel: CancelToken) -> Self {
        Self {
            options,
            sinks,
            cancel,
            replay_lock: Arc::new(AsyncMutex::new(())),
        }
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Drain the source once per configured pass, joining all workers
    /// between passes. Returns the first substantive error; `Cancelled`
    /// only when nothing else went wrong.
    pub async fn run(
        &self,
        template: &Template,
        source: &mut (dyn Source + Send),
    ) -> Result<(), ExecError> {
        let passes = self.options.passes();
        for pass in 0..passes {
            self.run_pass(template, source, pass).await?;
            if pass + 1 >= passes {
                break;
            }
            if !source.restartable() {
                debug!(target: "exec.dispatch", pass, "source_not_restartable_stopping_repeats");
                break;
            }
            source.reset();
        }
        Ok(())
    }

    async fn run_pass(
        &self,
        template: &Template,
        source: &mut (dyn Source + Send),
        pass: u32,
    ) -> Result<(), ExecError> {
        let jobs = self.options.effective_jobs();
        let semaphore = Arc::new(Semaphore::new(jobs));
        let mut handles: Vec<JoinHandle<Result<(), ExecError>>> = Vec::new();
        let mut collector = ErrorCollector::default();
        let mut row: u64 = 0;

        debug!(target: "exec.dispatch", pass, jobs, dry = self.options.dry, "pass_started");

        while let Some(tuple) = source.next() {
            if self.cancel.is_cancelled() {
                collector.record(ExecError::Cancelled);
                break;
            }
            let argv = match template.render(&tuple) {
                Ok(argv) => argv,
                Err(err) => {
                    // A bad placeholder is fatal for the whole run.
                    self.cancel.cancel();
                    collector.record(err.into());
                    break;
                }
            };
            if self.options.dry {
                if let Err(err) = self.sinks.print_line(&argv.join(" ")) {
                    collector.record(err.into());
                    break;
                }
                row += 1;
                continue;
            }
            if let Some(delay) = self.options.delay {
                tokio::time::sleep(delay).await;
            }
            let permit = tokio::select! {
                permit = semaphore.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
                _ = self.cancel.cancelled() => {
                    collector.record(ExecError::Cancelled);
                    break;
                }
            };
            debug!(target: "exec.dispatch", pass, row, argv = ?argv, "row_dispatched");
            let worker = Worker {
                row,
                argv,
                options: self.options.clone(),
                sinks: self.sinks.clone(),
                cancel: self.cancel.clone(),
                replay_lock: self.replay_lock.clone(),
            };
            handles.push(tokio::spawn(worker.run(permit)));
            row += 1;
        }

        for handle in handles {
            match handle.await {
                Ok(result) => collector.record_result(result),
                Err(err) => error!(target: "exec.worker", ?err, "worker_join_failed"),
            }
        }
        debug!(target: "exec.dispatch", pass, rows = row, "pass_finished");
        collector.finish()
    }
}

/// Retains the first substantive error; cancellation supersedes nothing.
#[derive(Default)]
struct ErrorCollector {
    substantive: Option<ExecError>,
    cancelled: bool,
}

impl ErrorCollector {
    fn record(&mut self, err: ExecError) {
        if err.is_cancelled() {
            self.cancelled = true;
            return;
        }
        if self.substantive.is_none() {
            self.substantive = Some(err);
        } else {
            debug!(target: "exec.dispatch", %err, "error_superseded_by_earlier_report");
        }
    }

    fn record_result(&mut self, result: Result<(), ExecError>) {
        if let Err(err) = result {
            self.record(err);
        }
    }

    fn finish(self) -> Result<(), ExecError> {
        match self.substantive {
            Some(err) => Err(err),
            None if self.cancelled => Err(ExecError::Cancelled),
            None => Ok(()),
        }
    }
}

enum WaitOutcome {
    Exited(std::io::Result<std::process::ExitStatus>),
    Cancelled,
    TimedOut,
}

struct Worker {
    row: u64,
    argv: Vec<String>,
    options: ExecOptions,
    sinks: OutputSinks,
    cancel: CancelToken,
    replay_lock: Arc<AsyncMutex<()>>,
}

impl Worker {
    async fn run(self, permit: OwnedSemaphorePermit) -> Result<(), ExecError> {
        // Held for the worker's whole life; released on every exit path.
        let _permit = permit;
        let attempts = self.options.attempts();
        let mut last = None;
        for attempt in 0..attempts {
            if self.cancel.is_cancelled() {
                return Err(ExecError::Cancelled);
            }
            if self.options.verbose && attempt == 0 {
                if let Err(err) = self.sinks.print_line(&self.argv.join(" ")) {
                    warn!(target: "exec.worker", row = self.row, ?err, "verbose_print_failed");
                }
            }
            match self.attempt(attempt).await {
                Ok(()) => return Ok(()),
                Err(err) if err.is_cancelled() => return Err(err),
                Err(err) => {
                    warn!(
                        target: "exec.worker",
                        row = self.row,
                        attempt,
                        %err,
                        "attempt_failed"
                    );
                    last = Some(err);
                }
            }
        }
        Err(last.expect("the attempt loop runs at least once"))
    }

    async fn attempt(&self, attempt: u32) -> Result<(), ExecError> {
        let log = if self.options.defer && !self.options.quiet {
            Some(ChildLog::create(self.options.temp_dir.as_deref())?)
        } else {
            None
        };

        let mut command = command::build(&self.argv, &self.options);
        if self.options.quiet {
            command.stdout(Stdio::null()).stderr(Stdio::null());
        } else if log.is_some() {
            command.stdout(Stdio::piped()).stderr(Stdio::piped());
        } else {
            command.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        }

        let mut child = command.spawn().map_err(|source| ExecError::Spawn {
            command: self.argv[0].clone(),
            source,
        })?;
        debug!(
            target: "exec.worker",
            row = self.row,
            attempt,
            pid = child.id(),
            "child_spawned"
        );

        let mut pumps = Vec::new();
        if let Some(log) = &log {
            let handle = log.shared_handle()?;
            if let Some(stdout) = child.stdout.take() {
                pumps.push(tokio::spawn(pump(stdout, TAG_STDOUT, handle.clone())));
            }
            if let Some(stderr) = child.stderr.take() {
                pumps.push(tokio::spawn(pump(stderr, TAG_STDERR, handle)));
            }
        }

        let outcome = self.wait_for_exit(&mut child).await;
        for handle in pumps {
            let _ = handle.await;
        }
        // Replay whatever was captured, even for failed or killed children,
        // so partial output is not lost. The temp file is removed on drop.
        if let Some(log) = log {
            log.replay(&self.sinks, &self.replay_lock).await;
        }

        match outcome {
            WaitOutcome::Exited(Ok(status)) if status.success() => Ok(()),
            WaitOutcome::Exited(Ok(status)) => Err(ExecError::ChildFailed { status }),
            WaitOutcome::Exited(Err(err)) => Err(ExecError::Io(err)),
            WaitOutcome::Cancelled => Err(ExecError::Cancelled),
            WaitOutcome::TimedOut => Err(ExecError::TimedOut(
                self.options
                    .effective_timeout()
                    .expect("timeout outcome requires a timeout"),
            )),
        }
    }

    async fn wait_for_exit(&self, child: &mut Child) -> WaitOutcome {
        let outcome = tokio::select! {
            status = child.wait() => WaitOutcome::Exited(status),
            _ = self.cancel.cancelled() => WaitOutcome::Cancelled,
            _ = sleep_or_never(self.options.effective_timeout()) => WaitOutcome::TimedOut,
        };
        if !matches!(outcome, WaitOutcome::Exited(_)) {
            if let Err(err) = child.start_kill() {
                warn!(target: "exec.worker", row = self.row, ?err, "kill_failed");
            }
            let _ = child.wait().await;
        }
        outcome
    }
}

async fn sleep_or_never(timeout: Option<std::time::Duration>) {
    match timeout {
        Some(timeout) => tokio::time::sleep(timeout).await,
        None => std::future::pending().await,
    }
}
