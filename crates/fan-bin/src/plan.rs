//! Splitting one invocation into template argvs and a source plan.
//!
//! Three shapes are accepted:
//! * `COMMAND ARG ...` with no operator anywhere: the whole tail is the
//!   template and values come from standard input, one per line.
//! * `COMMAND ARG ... ::: VALUES ...`: the words before the first operator
//!   are the template argv; everything after it is the source expression.
//! * `::: "CMD ARGS" ... ::: VALUES ...`: a leading operator introduces one
//!   or more quoted command templates, each tokenized by the shell-style
//!   splitter; the operator after them starts the source expression. The
//!   templates run sequentially over the same source.

use anyhow::{Result, bail};
use core_source::is_operator;
use core_template::split;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourcePlan {
    /// No operator appeared: read one-column tuples from standard input.
    Stdin,
    /// The words after the first top-level operator.
    Expression(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// One argv prefix per command template, ready for template compilation.
    pub templates: Vec<Vec<String>>,
    pub source: SourcePlan,
}

pub fn split_invocation(words: &[String]) -> Result<Invocation> {
    let Some(first) = words.first() else {
        bail!("not enough arguments given");
    };

    if is_operator(first) {
        return split_quoted_templates(&words[1..]);
    }

    match words.iter().position(|w| is_operator(w.as_str())) {
        Some(at) => Ok(Invocation {
            templates: vec![words[..at].to_vec()],
            source: SourcePlan::Expression(words[at + 1..].to_vec()),
        }),
        None => Ok(Invocation {
            templates: vec![words.to_vec()],
            source: SourcePlan::Stdin,
        }),
    }
}

fn split_quoted_templates(words: &[String]) -> Result<Invocation> {
    let mut templates = Vec::new();
    let mut at = 0;
    while at < words.len() && !is_operator(&words[at]) {
        let argv = split(&words[at])?;
        if argv.is_empty() {
            bail!("empty command template {:?}", words[at]);
        }
        templates.push(argv);
        at += 1;
    }
    if templates.is_empty() {
        bail!("no command template before the value list");
    }
    if at >= words.len() {
        bail!("no values after the template list");
    }
    // Skip the operator that terminated the template list.
    Ok(Invocation {
        templates,
        source: SourcePlan::Expression(words[at + 1..].to_vec()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn words(line: &str) -> Vec<String> {
        line.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn no_operator_means_stdin() {
        let invocation = split_invocation(&words("echo {1}")).unwrap();
        assert_eq!(invocation.templates, vec![words("echo {1}")]);
        assert_eq!(invocation.source, SourcePlan::Stdin);
    }

    #[test]
    fn first_operator_splits_template_from_values() {
        let invocation = split_invocation(&words("echo {1} {2} ::: A B ::: C D")).unwrap();
        assert_eq!(invocation.templates, vec![words("echo {1} {2}")]);
        assert_eq!(
            invocation.source,
            SourcePlan::Expression(words("A B ::: C D"))
        );
    }

    #[test]
    fn link_operator_also_splits() {
        let invocation = split_invocation(&words("echo :::+ A B")).unwrap();
        assert_eq!(invocation.templates, vec![words("echo")]);
        assert_eq!(invocation.source, SourcePlan::Expression(words("A B")));
    }

    #[test]
    fn leading_operator_takes_quoted_templates() {
        let args = vec![
            ":::".to_string(),
            "echo {1}".to_string(),
            "printf %s {1}".to_string(),
            ":::".to_string(),
            "A".to_string(),
            "B".to_string(),
        ];
        let invocation = split_invocation(&args).unwrap();
        assert_eq!(
            invocation.templates,
            vec![words("echo {1}"), words("printf %s {1}")]
        );
        assert_eq!(invocation.source, SourcePlan::Expression(words("A B")));
    }

    #[test]
    fn quoted_templates_honor_quoting() {
        let args = vec![
            ":::".to_string(),
            r#"sh -c 'echo {1}'"#.to_string(),
            ":::".to_string(),
            "A".to_string(),
        ];
        let invocation = split_invocation(&args).unwrap();
        assert_eq!(
            invocation.templates,
            vec![vec![
                "sh".to_string(),
                "-c".to_string(),
                "echo {1}".to_string()
            ]]
        );
    }

    #[test]
    fn empty_invocation_is_rejected() {
        assert!(split_invocation(&[]).is_err());
    }

    #[test]
    fn leading_operator_without_values_is_rejected() {
        assert!(split_invocation(&words("::: echo")).is_err());
        assert!(split_invocation(&words("::: ::: A")).is_err());
    }
}
