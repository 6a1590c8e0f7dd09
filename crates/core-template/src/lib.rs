//! Command templates compiled once, expanded per tuple.
//!
//! A template is a command name plus one [`WordProgram`] per argv element.
//! Each word is a sequence of [`Fragment`]s: literal runs and indexed
//! placeholders with an optional [`Action`]. Compilation happens once per
//! invocation; [`Template::render`] evaluates the programs against a tuple
//! and returns a fresh argv.

mod parse;
pub mod split;
mod transform;

pub use split::{SplitError, split, split_with};
pub use transform::Transform;

use thiserror::Error;

/// Errors raised while compiling a template word.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("empty template")]
    Empty,
    #[error("unterminated placeholder in {0:?}")]
    UnterminatedPlaceholder(String),
    #[error("invalid placeholder index {index:?} in {word:?}")]
    InvalidIndex { index: String, word: String },
    #[error("unknown action: {0}")]
    UnknownAction(String),
}

/// Errors raised while expanding a compiled template against a tuple.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExpandError {
    /// A placeholder resolved outside the tuple. Never silently empty.
    #[error("index {index} out of range for a tuple of width {width}")]
    IndexOutOfRange { index: i64, width: usize },
}

/// What a placeholder does to the value it selects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// One of the named transforms (`{1:upper}`).
    Transform(Transform),
    /// Trim the cutset from the left (`{1#cutset}`).
    TrimLeft(String),
    /// Trim the cutset from the right (`{1%cutset}`).
    TrimRight(String),
}

impl Action {
    fn apply(&self, value: &str) -> String {
        match self {
            Action::Transform(transform) => transform.apply(value),
            Action::TrimLeft(cutset) => value
                .trim_start_matches(|c: char| cutset.contains(c))
                .to_string(),
            Action::TrimRight(cutset) => value
                .trim_end_matches(|c: char| cutset.contains(c))
                .to_string(),
        }
    }
}

/// One component of a word program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    Literal(String),
    /// Index is 1-based; negative counts from the right. Auto-assigned
    /// indices are already resolved at parse time, so zero never survives
    /// compilation.
    Placeholder { index: i64, action: Option<Action> },
}

/// The program producing one argv element from a tuple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordProgram {
    fragments: Vec<Fragment>,
}

impl WordProgram {
    pub(crate) fn new(fragments: Vec<Fragment>) -> Self {
        Self { fragments }
    }

    pub fn has_placeholder(&self) -> bool {
        self.fragments
            .iter()
            .any(|f| matches!(f, Fragment::Placeholder { .. }))
    }

    /// Concatenate every fragment's string form for the given tuple.
    pub fn eval(&self, tuple: &[String]) -> Result<String, ExpandError> {
        let mut out = String::new();
        for fragment in &self.fragments {
            match fragment {
                Fragment::Literal(text) => out.push_str(text),
                Fragment::Placeholder { index, action } => {
                    let value = resolve(*index, tuple)?;
                    match action {
                        Some(action) => out.push_str(&action.apply(value)),
                        None => out.push_str(value),
                    }
                }
            }
        }
        Ok(out)
    }
}

fn resolve(index: i64, tuple: &[String]) -> Result<&String, ExpandError> {
    let width = tuple.len();
    let pos = if index < 0 {
        width as i64 + index
    } else {
        index - 1
    };
    if pos < 0 || pos >= width as i64 {
        return Err(ExpandError::IndexOutOfRange { index, width });
    }
    Ok(&tuple[pos as usize])
}

/// A compiled command template: the command name (never expanded) and the
/// word programs for its arguments. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    command: String,
    words: Vec<WordProgram>,
    has_placeholders: bool,
}

impl Template {
    /// Compile a template from an argv prefix. The first element is the
    /// command name; the rest are parsed as word programs sharing one
    /// auto-index counter.
    pub fn parse(argv: &[String]) -> Result<Self, TemplateError> {
        let (command, rest) = argv.split_first().ok_or(TemplateError::Empty)?;
        let mut parser = parse::WordParser::new();
        let words = rest
            .iter()
            .map(|word| parser.parse_word(word))
            .collect::<Result<Vec<_>, _>>()?;
        let has_placeholders = words.iter().any(WordProgram::has_placeholder);
        tracing::trace!(
            target: "template.parse",
            command = command.as_str(),
            words = words.len(),
            placeholders = has_placeholders,
            "template_compiled"
        );
        Ok(Self {
            command: command.clone(),
            words,
            has_placeholders,
        })
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn has_placeholders(&self) -> bool {
        self.has_placeholders
    }

    /// Produce the argv for one tuple: the command, every evaluated word,
    /// and, only when the template holds no placeholder at all, the whole
    /// tuple appended at the end.
    pub fn render(&self, tuple: &[String]) -> Result<Vec<String>, ExpandError> {
        let mut argv = Vec::with_capacity(1 + self.words.len() + tuple.len());
        argv.push(self.command.clone());
        for word in &self.words {
            argv.push(word.eval(tuple)?);
        }
        if !self.has_placeholders {
            argv.extend(tuple.iter().cloned());
        }
        Ok(argv)
    }
}
