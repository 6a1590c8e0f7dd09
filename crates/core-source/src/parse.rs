//! Precedence-climbing parser for the trailing operator expression.
//!
//! The grammar has exactly two infix operators over runs of plain words:
//! `:::` (combine, lower binding power) and `:::+` (link, higher binding
//! power). Equal powers associate left; `link` binds tighter, so
//! `A B ::: C D :::+ E F` parses as `Combine(A B, Link(C D, E F))`.

use rand::RngCore;
use rand::seq::SliceRandom;

use crate::cursor::{Combine, Link, Singleton};
use crate::{Source, SourceError};

/// Cartesian-product operator token.
pub const COMBINE_MARKER: &str = ":::";
/// Positional-zip operator token.
pub const LINK_MARKER: &str = ":::+";

const BIND_LOWEST: u8 = 0;
const BIND_COMBINE: u8 = 1;
const BIND_LINK: u8 = 2;

/// Whether a word is one of the two operator tokens.
pub fn is_operator(word: &str) -> bool {
    word == COMBINE_MARKER || word == LINK_MARKER
}

fn binding_power(word: &str) -> u8 {
    match word {
        LINK_MARKER => BIND_LINK,
        COMBINE_MARKER => BIND_COMBINE,
        _ => BIND_LOWEST,
    }
}

/// A parsed source tree, boxed for uniform composition.
pub type BoxedSource = Box<dyn Source + Send>;

/// Parse a trailing word list into a source tree.
pub fn parse(words: &[String]) -> Result<BoxedSource, SourceError> {
    Parser::new(words, None).parse()
}

/// Parse with each value run Fisher–Yates-shuffled before enumeration.
/// Only the leaves are permuted; the operator tree is untouched.
pub fn parse_shuffled(words: &[String], rng: &mut dyn RngCore) -> Result<BoxedSource, SourceError> {
    Parser::new(words, Some(rng)).parse()
}

struct Parser<'a> {
    words: &'a [String],
    pos: usize,
    shuffle: Option<&'a mut dyn RngCore>,
}

impl<'a> Parser<'a> {
    fn new(words: &'a [String], shuffle: Option<&'a mut dyn RngCore>) -> Self {
        Self {
            words,
            pos: 0,
            shuffle,
        }
    }

    fn parse(mut self) -> Result<BoxedSource, SourceError> {
        let source = self.parse_expr(BIND_LOWEST)?;
        tracing::debug!(
            target: "source.parse",
            words = self.words.len(),
            width = source.width(),
            "source_expression_parsed"
        );
        Ok(source)
    }

    fn parse_expr(&mut self, min_bp: u8) -> Result<BoxedSource, SourceError> {
        let mut left: BoxedSource = Box::new(self.parse_values());
        while !self.is_done() && min_bp < binding_power(self.peek()) {
            left = self.parse_binding(left)?;
        }
        Ok(left)
    }

    fn parse_values(&mut self) -> Singleton {
        let mut values = Vec::new();
        while !self.is_done() && !is_operator(self.peek()) {
            values.push(self.advance().to_string());
        }
        let mut leaf = Singleton::new(values);
        if let Some(rng) = self.shuffle.as_deref_mut() {
            leaf.values_mut().shuffle(rng);
        }
        leaf
    }

    fn parse_binding(&mut self, left: BoxedSource) -> Result<BoxedSource, SourceError> {
        let marker = self.advance().to_string();
        if self.is_done() {
            return Err(SourceError::UnexpectedMarker(marker));
        }
        let right = self.parse_expr(binding_power(&marker))?;
        Ok(match marker.as_str() {
            LINK_MARKER => Box::new(Link::new(left, right)),
            _ => Box::new(Combine::new(left, right)),
        })
    }

    fn is_done(&self) -> bool {
        self.pos >= self.words.len()
    }

    fn peek(&self) -> &str {
        &self.words[self.pos]
    }

    fn advance(&mut self) -> &str {
        let word = &self.words[self.pos];
        self.pos += 1;
        word
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Tuple, collect};
    use pretty_assertions::assert_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn words(expr: &str) -> Vec<String> {
        expr.split_whitespace().map(str::to_string).collect()
    }

    fn drain(expr: &str) -> Vec<Tuple> {
        let mut src = parse(&words(expr)).expect("parse");
        collect(src.as_mut())
    }

    fn tuples(rows: &[&[&str]]) -> Vec<Tuple> {
        rows.iter()
            .map(|row| row.iter().map(|v| v.to_string()).collect())
            .collect()
    }

    #[test]
    fn single_run_is_one_column() {
        assert_eq!(drain("A B C"), tuples(&[&["A"], &["B"], &["C"]]));
    }

    #[test]
    fn combine_is_the_cartesian_product() {
        assert_eq!(
            drain("A B ::: C D"),
            tuples(&[&["A", "C"], &["A", "D"], &["B", "C"], &["B", "D"]])
        );
    }

    #[test]
    fn link_is_the_positional_zip() {
        assert_eq!(drain("A B :::+ C D"), tuples(&[&["A", "C"], &["B", "D"]]));
    }

    #[test]
    fn link_discards_the_longer_tail() {
        assert_eq!(drain("1 2 :::+ A B C"), tuples(&[&["1", "A"], &["2", "B"]]));
    }

    #[test]
    fn link_binds_tighter_than_combine() {
        assert_eq!(
            drain("a b c :::+ 1 2 3 ::: X Y :::+ 11 22"),
            tuples(&[
                &["a", "1", "X", "11"],
                &["a", "1", "Y", "22"],
                &["b", "2", "X", "11"],
                &["b", "2", "Y", "22"],
                &["c", "3", "X", "11"],
                &["c", "3", "Y", "22"],
            ])
        );
    }

    #[test]
    fn chained_combines_cover_every_pair() {
        assert_eq!(
            drain("A ::: B ::: C D"),
            tuples(&[&["A", "B", "C"], &["A", "B", "D"]])
        );
    }

    #[test]
    fn empty_word_list_yields_nothing() {
        assert_eq!(drain(""), Vec::<Tuple>::new());
    }

    #[test]
    fn trailing_operator_is_rejected() {
        for expr in ["A B :::", "A ::: B :::+", ":::"] {
            let err = match parse(&words(expr)) {
                Err(err) => err,
                Ok(_) => panic!("trailing marker must fail"),
            };
            assert!(matches!(err, SourceError::UnexpectedMarker(_)), "{expr}");
        }
    }

    #[test]
    fn parsed_tree_is_restartable() {
        let mut src = parse(&words("A B ::: C D")).expect("parse");
        assert!(src.restartable());
        let first = collect(src.as_mut());
        src.reset();
        assert_eq!(collect(src.as_mut()), first);
    }

    #[test]
    fn shuffle_permutes_values_but_not_the_tree() {
        let list = words("a b c d e f g h ::: 1 2");
        let mut rng = StdRng::seed_from_u64(7);
        let mut src = parse_shuffled(&list, &mut rng).expect("parse");
        assert_eq!(src.width(), 2);
        let rows = collect(src.as_mut());
        assert_eq!(rows.len(), 16);

        // Same multiset of left values, each paired with both right values.
        let mut lefts: Vec<String> = rows.iter().step_by(2).map(|t| t[0].clone()).collect();
        lefts.sort();
        assert_eq!(lefts, words("a b c d e f g h"));
        for pair in rows.chunks(2) {
            assert_eq!(pair[0][0], pair[1][0]);
            let mut rights: Vec<&str> = pair.iter().map(|t| t[1].as_str()).collect();
            rights.sort();
            assert_eq!(rights, ["1", "2"]);
        }
    }

    #[test]
    fn shuffle_with_fixed_seed_is_deterministic() {
        let list = words("a b c d e f ::: x y");
        let mut first_rng = StdRng::seed_from_u64(42);
        let mut second_rng = StdRng::seed_from_u64(42);
        let mut first = parse_shuffled(&list, &mut first_rng).expect("parse");
        let mut second = parse_shuffled(&list, &mut second_rng).expect("parse");
        assert_eq!(collect(first.as_mut()), collect(second.as_mut()));
    }
}
