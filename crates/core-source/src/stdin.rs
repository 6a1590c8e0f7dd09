//! Standard input as a degenerate one-column source.

use std::io::{self, BufRead};

use crate::{Source, Tuple};

/// One-column source fed from a line reader, lazily.
///
/// One-shot by contract: `reset` is a no-op and once exhausted the cursor
/// stays exhausted, so `restartable` answers false. Blank lines are dropped
/// unless `keep_empty` is set, in which case they come through as empty
/// values.
pub struct StdinSource<R> {
    reader: R,
    keep_empty: bool,
    exhausted: bool,
}

impl StdinSource<io::BufReader<io::Stdin>> {
    /// Read lines from the process's standard input.
    pub fn stdin(keep_empty: bool) -> Self {
        Self::from_reader(io::BufReader::new(io::stdin()), keep_empty)
    }
}

impl<R: BufRead> StdinSource<R> {
    /// Read lines from any buffered reader. Used by tests and pipes.
    pub fn from_reader(reader: R, keep_empty: bool) -> Self {
        Self {
            reader,
            keep_empty,
            exhausted: false,
        }
    }
}

impl<R: BufRead> Source for StdinSource<R> {
    fn next(&mut self) -> Option<Tuple> {
        if self.exhausted {
            return None;
        }
        loop {
            let mut line = String::new();
            match self.reader.read_line(&mut line) {
                Ok(0) => {
                    self.exhausted = true;
                    return None;
                }
                Ok(_) => {}
                Err(err) => {
                    tracing::warn!(target: "source.stdin", ?err, "read_line_failed");
                    self.exhausted = true;
                    return None;
                }
            }
            if line.ends_with('\n') {
                line.pop();
                if line.ends_with('\r') {
                    line.pop();
                }
            }
            if line.is_empty() && !self.keep_empty {
                continue;
            }
            return Some(vec![line]);
        }
    }

    fn done(&self) -> bool {
        self.exhausted
    }

    fn reset(&mut self) {
        // One-shot: rewinding standard input is not possible.
    }

    fn restartable(&self) -> bool {
        false
    }

    fn width(&self) -> usize {
        1
    }
}
