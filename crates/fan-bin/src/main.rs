//! Fanout entrypoint: run a command template over argument sources in
//! parallel.

mod plan;

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Once;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use core_exec::{ExecOptions, Executor, spawn_signal_listener};
use core_source::{Source, StdinSource};
use core_template::Template;
use plan::{Invocation, SourcePlan, split_invocation};
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// CLI arguments.
#[derive(Parser, Debug)]
#[command(
    name = "fanout",
    version,
    about = "Run a command template over argument sources with bounded concurrency"
)]
struct Args {
    /// Sleep between successive dispatches, e.g. "150ms".
    #[arg(long, value_parser = core_config::parse_duration)]
    delay: Option<Duration>,
    /// Per-child wall clock limit, e.g. "30s"; 0 disables it.
    #[arg(long, value_parser = core_config::parse_duration)]
    timeout: Option<Duration>,
    /// Max concurrent children; 0 means the host parallelism count.
    #[arg(long)]
    jobs: Option<usize>,
    /// Total attempts per row.
    #[arg(long)]
    retries: Option<u32>,
    /// Run the whole source sequence this many times.
    #[arg(long)]
    repeat: Option<u32>,
    /// Discard child stdout/stderr.
    #[arg(long)]
    quiet: bool,
    /// Copy the parent environment to children.
    #[arg(long)]
    env: bool,
    /// Print composed argvs instead of executing them.
    #[arg(long)]
    dry: bool,
    /// Route each row through `$SHELL -c`.
    #[arg(long)]
    shell: bool,
    /// Shuffle the values inside each source leaf.
    #[arg(long)]
    shuffle: bool,
    /// Keep blank lines when reading values from standard input.
    #[arg(long = "keep-empty")]
    keep_empty: bool,
    /// Capture child output and replay it without interleaving.
    #[arg(long)]
    defer: bool,
    /// Print each argv on its first attempt.
    #[arg(long)]
    verbose: bool,
    /// Child working directory.
    #[arg(long)]
    working: Option<PathBuf>,
    /// Temp directory for deferred capture files.
    #[arg(long)]
    temp: Option<PathBuf>,
    /// Configuration file path (overrides discovery of `fanout.toml`).
    #[arg(long = "config")]
    config: Option<PathBuf>,
    /// Append diagnostics to this file instead of stderr.
    #[arg(long = "log-file")]
    log_file: Option<PathBuf>,
    /// COMMAND [ARG ...] [ (::: | :::+) VALUE ... ]*
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
    words: Vec<String>,
}

struct AppStartup {
    log_guard: Option<WorkerGuard>,
}

impl AppStartup {
    fn new() -> Self {
        Self { log_guard: None }
    }

    fn configure_logging(&mut self, log_file: Option<&Path>) -> Result<()> {
        let filter = EnvFilter::from_default_env();
        let result = match log_file {
            Some(path) => {
                let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
                let name = path.file_name().context("log file path has no file name")?;
                let appender =
                    tracing_appender::rolling::never(dir.unwrap_or(Path::new(".")), name);
                let (writer, guard) = tracing_appender::non_blocking(appender);
                let result = tracing_subscriber::fmt()
                    .with_env_filter(filter)
                    .with_writer(writer)
                    .try_init();
                if result.is_ok() {
                    self.log_guard = Some(guard);
                }
                result
            }
            None => tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(io::stderr)
                .try_init(),
        };
        if result.is_err() {
            // Global subscriber already installed; keep it.
        }
        Ok(())
    }

    fn install_panic_hook() {
        static HOOK: Once = Once::new();
        HOOK.call_once(|| {
            let default_panic = std::panic::take_hook();
            std::panic::set_hook(Box::new(move |info| {
                tracing::error!(target: "runtime.panic", ?info, "panic");
                default_panic(info);
            }));
        });
    }
}

fn exec_options(args: &Args, config: &core_config::Config) -> ExecOptions {
    let file = &config.file;
    ExecOptions {
        jobs: core_config::effective_jobs(args.jobs.unwrap_or(file.limits.jobs)),
        delay: args.delay.or(file.timing.delay),
        timeout: args.timeout.or(file.timing.timeout),
        retries: args.retries.unwrap_or(file.limits.retries),
        repeat: args.repeat.unwrap_or(file.limits.repeat),
        dry: args.dry,
        shell: args.shell || file.run.shell,
        env: args.env || file.run.env,
        quiet: args.quiet || file.output.quiet,
        defer: args.defer || file.output.defer,
        verbose: args.verbose,
        working_dir: args.working.clone().or_else(|| file.run.working.clone()),
        temp_dir: args.temp.clone().or_else(|| file.output.temp.clone()),
    }
}

fn build_source(
    source: &SourcePlan,
    shuffle: bool,
    keep_empty: bool,
) -> Result<Box<dyn Source + Send>> {
    match source {
        SourcePlan::Stdin => Ok(Box::new(StdinSource::stdin(keep_empty))),
        SourcePlan::Expression(words) => {
            let parsed = if shuffle {
                core_source::parse_shuffled(words, &mut rand::thread_rng())?
            } else {
                core_source::parse(words)?
            };
            Ok(parsed)
        }
    }
}

fn compile_templates(invocation: &Invocation) -> Result<Vec<Template>> {
    invocation
        .templates
        .iter()
        .map(|argv| Template::parse(argv).with_context(|| format!("template {argv:?}")))
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut startup = AppStartup::new();
    startup.configure_logging(args.log_file.as_deref())?;
    AppStartup::install_panic_hook();
    info!(target: "runtime", "startup");

    let config = core_config::load_from(args.config.clone())?;
    let options = exec_options(&args, &config);
    let invocation = split_invocation(&args.words)?;
    let templates = compile_templates(&invocation)?;
    let mut source = build_source(&invocation.source, args.shuffle, args.keep_empty)?;

    info!(
        target: "runtime.startup",
        templates = templates.len(),
        width = source.width(),
        jobs = options.jobs,
        dry = options.dry,
        "bootstrap_complete"
    );

    let executor = Executor::new(options);
    let signals = spawn_signal_listener(executor.cancel_token());

    let mut outcome = Ok(());
    for (index, template) in templates.iter().enumerate() {
        if let Err(err) = executor.run(template, source.as_mut()).await {
            outcome = Err(err);
            break;
        }
        if index + 1 < templates.len() {
            if !source.restartable() {
                warn!(
                    target: "runtime",
                    remaining = templates.len() - index - 1,
                    "source_not_restartable_skipping_remaining_templates"
                );
                break;
            }
            source.reset();
        }
    }
    signals.abort();

    match outcome {
        Ok(()) => {
            info!(target: "runtime", "shutdown");
            Ok(())
        }
        Err(err) => {
            error!(target: "runtime", %err, "run_failed");
            Err(err.into())
        }
    }
}
