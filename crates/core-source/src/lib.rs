//! Lazy argument-source algebra.
//!
//! A [`Source`] is a restartable cursor over tuples of strings. Leaves are
//! literal value lists ([`Singleton`]) or standard input ([`StdinSource`]);
//! the operators [`Link`] (positional zip) and [`Combine`] (Cartesian
//! product) compose them into wider cursors. [`parse`] builds a tree from a
//! trailing `VALUES ( ::: | :::+ ) VALUES ...` word list.

mod cursor;
mod parse;
mod stdin;

pub use cursor::{Combine, Link, Singleton};
pub use parse::{is_operator, parse, parse_shuffled, COMBINE_MARKER, LINK_MARKER};
pub use stdin::StdinSource;

use thiserror::Error;

/// One row of values produced by a [`Source`].
pub type Tuple = Vec<String>;

/// Errors raised while building a source tree from the trailing word list.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// An operator token had no right-hand values.
    #[error("unexpected marker {0:?}")]
    UnexpectedMarker(String),
}

/// A restartable lazy cursor of string tuples.
///
/// `done` turns true before `next` would return `None`, so callers may rely
/// on either signal. `reset` rewinds to the initial sequence except when a
/// [`StdinSource`] sits somewhere in the tree; `restartable` reports whether
/// a reset actually replays the sequence.
pub trait Source {
    /// Yield the next tuple, or `None` at end of stream.
    fn next(&mut self) -> Option<Tuple>;

    /// End-of-stream predicate.
    fn done(&self) -> bool;

    /// Rewind to the initial state. A no-op for one-shot sources.
    fn reset(&mut self);

    /// Whether `reset` replays the identical sequence.
    fn restartable(&self) -> bool {
        true
    }

    /// Number of values per tuple. Fixed for the lifetime of the tree.
    fn width(&self) -> usize;
}

impl<S: Source + ?Sized> Source for Box<S> {
    fn next(&mut self) -> Option<Tuple> {
        (**self).next()
    }

    fn done(&self) -> bool {
        (**self).done()
    }

    fn reset(&mut self) {
        (**self).reset()
    }

    fn restartable(&self) -> bool {
        (**self).restartable()
    }

    fn width(&self) -> usize {
        (**self).width()
    }
}

/// Drain a source into a vector. Callers that care about laziness iterate
/// with `next` instead.
pub fn collect(source: &mut dyn Source) -> Vec<Tuple> {
    let mut out = Vec::new();
    while let Some(tuple) = source.next() {
        out.push(tuple);
    }
    out
}
