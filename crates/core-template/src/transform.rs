//! The closed set of named value transforms.

use rand::seq::SliceRandom;
use uuid::Uuid;

use crate::TemplateError;

/// A pure `str -> String` function selected by name in a placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    Lower,
    Upper,
    Title,
    Trim,
    Length,
    Basename,
    Dirname,
    Ext,
    Random,
    UuidUrl,
    UuidDns,
}

impl Transform {
    /// Resolve an action name, case-insensitively. The empty name is the
    /// identity and maps to `None`; anything unrecognized is an error.
    pub fn parse(name: &str) -> Result<Option<Self>, TemplateError> {
        let transform = match name.to_ascii_lowercase().as_str() {
            "" => return Ok(None),
            "lower" => Self::Lower,
            "upper" => Self::Upper,
            "title" => Self::Title,
            "trim" => Self::Trim,
            "len" | "length" => Self::Length,
            "base" | "basename" => Self::Basename,
            "dir" | "dirname" => Self::Dirname,
            "ext" => Self::Ext,
            "rand" | "random" => Self::Random,
            "uuid+url" => Self::UuidUrl,
            "uuid+dns" => Self::UuidDns,
            _ => return Err(TemplateError::UnknownAction(name.to_string())),
        };
        Ok(Some(transform))
    }

    pub fn apply(&self, value: &str) -> String {
        match self {
            Self::Lower => value.to_ascii_lowercase(),
            Self::Upper => value.to_ascii_uppercase(),
            Self::Title => title(value),
            Self::Trim => value.trim().to_string(),
            Self::Length => value.len().to_string(),
            Self::Basename => basename(value),
            Self::Dirname => dirname(value),
            Self::Ext => extension(value),
            Self::Random => scramble(value),
            Self::UuidUrl => Uuid::new_v5(&Uuid::NAMESPACE_URL, value.as_bytes()).to_string(),
            Self::UuidDns => Uuid::new_v5(&Uuid::NAMESPACE_DNS, value.as_bytes()).to_string(),
        }
    }
}

/// Capitalize the letter after every non-letter boundary.
fn title(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut boundary = true;
    for ch in value.chars() {
        if ch.is_alphabetic() {
            if boundary {
                out.extend(ch.to_uppercase());
            } else {
                out.push(ch);
            }
            boundary = false;
        } else {
            out.push(ch);
            boundary = true;
        }
    }
    out
}

/// Random byte permutation. Multi-byte sequences are not preserved; invalid
/// UTF-8 after the shuffle is replaced lossily.
fn scramble(value: &str) -> String {
    let mut bytes = value.as_bytes().to_vec();
    bytes.shuffle(&mut rand::thread_rng());
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Final path component. The empty path is `.`, the root stays `/`, and
/// trailing slashes are ignored.
fn basename(path: &str) -> String {
    if path.is_empty() {
        return ".".to_string();
    }
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return "/".to_string();
    }
    match trimmed.rfind('/') {
        Some(at) => trimmed[at + 1..].to_string(),
        None => trimmed.to_string(),
    }
}

/// Parent path component. A bare file name yields `.`.
fn dirname(path: &str) -> String {
    match path.rfind('/') {
        None => ".".to_string(),
        Some(at) => {
            let dir = path[..at].trim_end_matches('/');
            if dir.is_empty() {
                "/".to_string()
            } else {
                dir.to_string()
            }
        }
    }
}

/// File extension including the dot, or empty when the final component has
/// none.
fn extension(path: &str) -> String {
    for (at, ch) in path.char_indices().rev() {
        match ch {
            '/' => break,
            '.' => return path[at..].to_string(),
            _ => {}
        }
    }
    String::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn case_folding_is_ascii() {
        assert_eq!(Transform::Upper.apply("foo bar"), "FOO BAR");
        assert_eq!(Transform::Lower.apply("FOO Bar"), "foo bar");
    }

    #[test]
    fn title_capitalizes_word_boundaries() {
        assert_eq!(Transform::Title.apply("foo bar"), "Foo Bar");
        assert_eq!(Transform::Title.apply("foo-bar baz"), "Foo-Bar Baz");
        assert_eq!(Transform::Title.apply(""), "");
    }

    #[test]
    fn trim_strips_surrounding_whitespace() {
        assert_eq!(Transform::Trim.apply("  foobar  "), "foobar");
    }

    #[test]
    fn length_is_the_byte_count() {
        assert_eq!(Transform::Length.apply("foo"), "3");
        assert_eq!(Transform::Length.apply(""), "0");
    }

    #[test]
    fn path_components_match_slash_semantics() {
        assert_eq!(Transform::Basename.apply("/tmp/foobar.lst"), "foobar.lst");
        assert_eq!(Transform::Dirname.apply("/tmp/foobar.lst"), "/tmp");
        assert_eq!(Transform::Ext.apply("/tmp/foobar.lst"), ".lst");

        assert_eq!(Transform::Basename.apply(""), ".");
        assert_eq!(Transform::Basename.apply("/"), "/");
        assert_eq!(Transform::Basename.apply("dir/"), "dir");
        assert_eq!(Transform::Dirname.apply("plain"), ".");
        assert_eq!(Transform::Dirname.apply("/plain"), "/");
        assert_eq!(Transform::Ext.apply("/tmp.d/noext"), "");
    }

    #[test]
    fn scramble_permutes_bytes() {
        let scrambled = Transform::Random.apply("abcdef");
        let mut bytes: Vec<u8> = scrambled.into_bytes();
        bytes.sort_unstable();
        assert_eq!(bytes, b"abcdef");
    }

    #[test]
    fn uuid_transforms_are_stable_v5_names() {
        let url = Transform::UuidUrl.apply("example");
        assert_eq!(url, Transform::UuidUrl.apply("example"));
        let dns = Transform::UuidDns.apply("example");
        assert_ne!(url, dns);
        assert_eq!(url.len(), 36);
    }

    #[test]
    fn parse_accepts_aliases_and_rejects_unknowns() {
        assert_eq!(Transform::parse("LEN"), Ok(Some(Transform::Length)));
        assert_eq!(Transform::parse("basename"), Ok(Some(Transform::Basename)));
        assert_eq!(Transform::parse("uuid+url"), Ok(Some(Transform::UuidUrl)));
        assert_eq!(Transform::parse(""), Ok(None));
        assert_eq!(
            Transform::parse("nope"),
            Err(TemplateError::UnknownAction("nope".to_string()))
        );
    }
}
