//! Output multiplexing: direct parent streams and deferred capture/replay.
//!
//! Deferred mode writes every child line into a per-child temp log, prefixed
//! with one tag byte (`<` stdout, `>` stderr). After the child exits the log
//! is replayed under a global mutex so each child's output lands as one
//! contiguous block; the tag is stripped and lines are terminated with CRLF.
//! The tag format assumes line-oriented text; binary child output is not
//! preserved.

use std::fs::File;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use tempfile::NamedTempFile;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::Mutex as AsyncMutex;
use tracing::warn;

/// Tag byte for captured stdout lines.
pub const TAG_STDOUT: u8 = b'<';
/// Tag byte for captured stderr lines.
pub const TAG_STDERR: u8 = b'>';

/// The parent's output streams, injectable so dry-run, verbose, and replay
/// output can be observed in tests. Cloning shares the underlying writers.
#[derive(Clone)]
pub struct OutputSinks {
    stdout: Arc<Mutex<Box<dyn Write + Send>>>,
    stderr: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl OutputSinks {
    /// The process's real stdout and stderr.
    pub fn standard() -> Self {
        Self::new(Box::new(io::stdout()), Box::new(io::stderr()))
    }

    pub fn new(stdout: Box<dyn Write + Send>, stderr: Box<dyn Write + Send>) -> Self {
        Self {
            stdout: Arc::new(Mutex::new(stdout)),
            stderr: Arc::new(Mutex::new(stderr)),
        }
    }

    /// One line to parent stdout. Used by dry-run and verbose printing.
    pub fn print_line(&self, line: &str) -> io::Result<()> {
        let mut out = lock(&self.stdout);
        writeln!(out, "{line}")?;
        out.flush()
    }

    fn replay_line(&self, tag: u8, line: &[u8]) -> io::Result<()> {
        let sink = if tag == TAG_STDOUT {
            &self.stdout
        } else {
            &self.stderr
        };
        let mut out = lock(sink);
        out.write_all(line)?;
        out.write_all(b"\r\n")
    }

    fn flush(&self) -> io::Result<()> {
        lock(&self.stdout).flush()?;
        lock(&self.stderr).flush()
    }
}

fn lock<'a>(
    sink: &'a Arc<Mutex<Box<dyn Write + Send>>>,
) -> MutexGuard<'a, Box<dyn Write + Send>> {
    sink.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// One child's append-only capture log, removed from disk on drop.
pub(crate) struct ChildLog {
    file: NamedTempFile,
}

impl ChildLog {
    pub(crate) fn create(temp_dir: Option<&Path>) -> io::Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("fanout_").suffix(".log");
        let file = match temp_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        Ok(Self { file })
    }

    /// A shared append handle for the pump tasks.
    pub(crate) fn shared_handle(&self) -> io::Result<Arc<Mutex<File>>> {
        Ok(Arc::new(Mutex::new(self.file.as_file().try_clone()?)))
    }

    /// Replay the captured lines as one contiguous block. I/O failures are
    /// logged as warnings; replay never fails the row.
    pub(crate) async fn replay(self, sinks: &OutputSinks, replay_lock: &AsyncMutex<()>) {
        let _serialized = replay_lock.lock().await;
        if let Err(err) = self.replay_lines(sinks) {
            warn!(target: "exec.replay", ?err, "replay_failed");
        }
    }

    fn replay_lines(&self, sinks: &OutputSinks) -> io::Result<()> {
        let reader = io::BufReader::new(self.file.reopen()?);
        for line in reader.split(b'\n') {
            let line = line?;
            // A lone tag byte is a blank child line; skip it.
            if line.len() <= 1 {
                continue;
            }
            sinks.replay_line(line[0], &line[1..])?;
        }
        sinks.flush()
    }
}

/// Copy one child stream into the shared log, one tagged line at a time.
pub(crate) async fn pump<R>(reader: R, tag: u8, log: Arc<Mutex<File>>)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let mut buf = Vec::with_capacity(line.len() + 2);
                buf.push(tag);
                buf.extend_from_slice(line.as_bytes());
                buf.push(b'\n');
                let mut file = log.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                if let Err(err) = file.write_all(&buf) {
                    warn!(target: "exec.replay", ?err, "capture_write_failed");
                    break;
                }
            }
            Ok(None) => break,
            Err(err) => {
                warn!(target: "exec.replay", ?err, "capture_read_failed");
                break;
            }
        }
    }
}
