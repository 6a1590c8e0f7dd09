//! Shell-style splitting of a quoted template string.
//!
//! Used when the operator list precedes the template, so the whole command
//! arrives as one argv element. Rules: space and tab separate words; single
//! quotes are fully literal; double quotes are literal except `$name` /
//! `${name}` expansion and a backslash-guarded closing quote (the backslash
//! itself is kept); unquoted `$name` expands; a backslash outside quotes
//! escapes the next byte literally. The environment is injected as a lookup
//! so the function stays pure.

use std::iter::Peekable;
use std::str::Chars;

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SplitError {
    #[error("unterminated single quote")]
    UnterminatedSingleQuote,
    #[error("unterminated double quote")]
    UnterminatedDoubleQuote,
}

/// Split against the process environment.
pub fn split(input: &str) -> Result<Vec<String>, SplitError> {
    split_with(input, |name| std::env::var(name).ok())
}

/// Split with an explicit variable lookup. Unset variables expand to the
/// empty string.
pub fn split_with<F>(input: &str, lookup: F) -> Result<Vec<String>, SplitError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut words = Vec::new();
    let mut word = String::new();
    let mut started = false;
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            ' ' | '\t' => {
                if started {
                    words.push(std::mem::take(&mut word));
                    started = false;
                }
            }
            '\'' => {
                started = true;
                scan_strong(&mut chars, &mut word)?;
            }
            '"' => {
                started = true;
                scan_weak(&mut chars, &mut word, &lookup)?;
            }
            '\\' => {
                started = true;
                match chars.next() {
                    Some(escaped) => word.push(escaped),
                    None => word.push('\\'),
                }
            }
            '$' => {
                started = true;
                word.push_str(&scan_variable(&mut chars, &lookup));
            }
            _ => {
                started = true;
                word.push(ch);
            }
        }
    }
    if started {
        words.push(word);
    }
    Ok(words)
}

/// Single quotes: everything through the closing quote, no escapes.
fn scan_strong(chars: &mut Peekable<Chars>, word: &mut String) -> Result<(), SplitError> {
    loop {
        match chars.next() {
            Some('\'') => return Ok(()),
            Some(ch) => word.push(ch),
            None => return Err(SplitError::UnterminatedSingleQuote),
        }
    }
}

/// Double quotes: variables expand, a backslash guards the closing quote and
/// is itself kept.
fn scan_weak<F>(
    chars: &mut Peekable<Chars>,
    word: &mut String,
    lookup: &F,
) -> Result<(), SplitError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut prev = '\0';
    loop {
        let ch = chars.next().ok_or(SplitError::UnterminatedDoubleQuote)?;
        if ch == '"' && prev != '\\' {
            return Ok(());
        }
        if ch == '$' {
            word.push_str(&scan_variable(chars, lookup));
            continue;
        }
        word.push(ch);
        prev = ch;
    }
}

/// `$name` or `${name}`. A `$` not followed by a name stays literal.
fn scan_variable<F>(chars: &mut Peekable<Chars>, lookup: &F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let mut name = String::new();
    if chars.peek() == Some(&'{') {
        chars.next();
        while let Some(&ch) = chars.peek() {
            chars.next();
            if ch == '}' {
                break;
            }
            name.push(ch);
        }
        return lookup(&name).unwrap_or_default();
    }
    while let Some(&ch) = chars.peek() {
        if ch.is_alphanumeric() || ch == '_' {
            name.push(ch);
            chars.next();
        } else {
            break;
        }
    }
    if name.is_empty() {
        return "$".to_string();
    }
    lookup(&name).unwrap_or_default()
}
