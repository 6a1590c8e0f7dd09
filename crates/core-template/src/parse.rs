//! Word-program compilation.
//!
//! Grammar inside one word: literal runs interleaved with brace
//! placeholders whose body is an optional signed index followed by an
//! optional `:action`, `#cutset`, or `%cutset`. `${` escapes a literal brace
//! (the `$` is dropped). A missing or zero index takes the next slot from a
//! counter shared across the whole template.

use crate::{Action, Fragment, TemplateError, Transform, WordProgram};

pub(crate) struct WordParser {
    auto: i64,
}

impl WordParser {
    pub(crate) fn new() -> Self {
        Self { auto: 1 }
    }

    fn next_auto(&mut self) -> i64 {
        let index = self.auto;
        self.auto += 1;
        index
    }

    pub(crate) fn parse_word(&mut self, word: &str) -> Result<WordProgram, TemplateError> {
        let mut fragments = Vec::new();
        let mut literal = String::new();
        let mut pos = 0;
        while let Some(ch) = word[pos..].chars().next() {
            if ch == '$' && word[pos + 1..].starts_with('{') {
                literal.push('{');
                pos += 2;
            } else if ch == '{' {
                if !literal.is_empty() {
                    fragments.push(Fragment::Literal(std::mem::take(&mut literal)));
                }
                let close = word[pos..]
                    .find('}')
                    .ok_or_else(|| TemplateError::UnterminatedPlaceholder(word.to_string()))?
                    + pos;
                fragments.push(self.parse_placeholder(&word[pos + 1..close], word)?);
                pos = close + 1;
            } else {
                literal.push(ch);
                pos += ch.len_utf8();
            }
        }
        if !literal.is_empty() {
            fragments.push(Fragment::Literal(literal));
        }
        Ok(WordProgram::new(fragments))
    }

    fn parse_placeholder(&mut self, body: &str, word: &str) -> Result<Fragment, TemplateError> {
        let (index_part, action_part) = match body.find([':', '#', '%']) {
            Some(at) => (&body[..at], Some((body.as_bytes()[at], &body[at + 1..]))),
            None => (body, None),
        };

        let index = if index_part.is_empty() {
            self.next_auto()
        } else {
            let parsed: i64 =
                index_part
                    .parse()
                    .map_err(|_| TemplateError::InvalidIndex {
                        index: index_part.to_string(),
                        word: word.to_string(),
                    })?;
            if parsed == 0 { self.next_auto() } else { parsed }
        };

        let action = match action_part {
            None => None,
            Some((b':', name)) => Transform::parse(name)?.map(Action::Transform),
            Some((b'#', cutset)) => Some(Action::TrimLeft(cutset.to_string())),
            Some((b'%', cutset)) => Some(Action::TrimRight(cutset.to_string())),
            Some(_) => unreachable!("find() only matches the three action markers"),
        };

        Ok(Fragment::Placeholder { index, action })
    }
}
