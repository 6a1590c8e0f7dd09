//! Table-driven expansion scenarios over a fixed tuple.

use core_template::{ExpandError, Template, TemplateError};
use pretty_assertions::assert_eq;

fn argv(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}

fn render(template: &[&str], tuple: &[&str]) -> Result<String, ExpandError> {
    let template = Template::parse(&argv(template)).expect("template must compile");
    let values = argv(tuple);
    Ok(template.render(&values)?.join(" "))
}

const TUPLE: &[&str] = &["foo", "bar", "FOOBAR", "  foobar  ", "/tmp/foobar.lst"];

#[test]
fn positional_indices_select_values() {
    let cases: &[(&[&str], &str)] = &[
        (&["echo", "{1}", "{2:}"], "echo foo bar"),
        (&["echo", "{2:}", "{1}"], "echo bar foo"),
        (&["echo", "{1}-{2:}", "{1}"], "echo foo-bar foo"),
        (
            &["echo", "welcome {1:upper}! good luck {4:trim}!"],
            "echo welcome FOO! good luck foobar!",
        ),
        (
            &["echo", "{1:upper}", "{3:lower}", "{1:len}", "{4:trim}"],
            "echo FOO foobar 3 foobar",
        ),
    ];
    for (template, want) in cases {
        assert_eq!(render(template, TUPLE).unwrap(), *want, "{template:?}");
    }
}

#[test]
fn negative_indices_count_from_the_right() {
    assert_eq!(
        render(&["echo", "{-1:upper}", "{-2:title}"], &["foo", "bar"]).unwrap(),
        "echo BAR Foo"
    );
    // {-1} on any non-empty tuple is {n} for n = width.
    assert_eq!(
        render(&["echo", "{-1}", "{5}"], TUPLE).unwrap(),
        "echo /tmp/foobar.lst /tmp/foobar.lst"
    );
}

#[test]
fn path_transforms_decompose_a_path() {
    assert_eq!(
        render(&["echo", "{5:base}", "{5:dir}", "{5:ext}"], TUPLE).unwrap(),
        "echo foobar.lst /tmp .lst"
    );
}

#[test]
fn cutsets_trim_from_either_end() {
    assert_eq!(
        render(&["echo", "{3#FOO}", "{3%BAR}"], TUPLE).unwrap(),
        "echo BAR FOO"
    );
}

#[test]
fn auto_slots_walk_the_tuple_left_to_right() {
    assert_eq!(
        render(&["echo", "{}", "{}", "{}"], &["a", "b", "c"]).unwrap(),
        "echo a b c"
    );
    assert_eq!(
        render(&["echo", "{2}", "{}"], &["a", "b"]).unwrap(),
        "echo b a"
    );
}

#[test]
fn no_placeholders_appends_the_whole_tuple() {
    assert_eq!(
        render(&["echo", "-n"], &["a", "b"]).unwrap(),
        "echo -n a b"
    );
}

#[test]
fn any_placeholder_suppresses_the_implicit_append() {
    assert_eq!(render(&["echo", "{1}"], &["a", "b"]).unwrap(), "echo a");
}

#[test]
fn escaped_braces_are_literal() {
    assert_eq!(
        render(&["echo", "${1} and {1}"], &["x"]).unwrap(),
        "echo {1} and x"
    );
}

#[test]
fn out_of_range_is_reported_not_blanked() {
    let template = Template::parse(&argv(&["echo", "{9}"])).unwrap();
    assert_eq!(
        template.render(&argv(&["a"])).unwrap_err(),
        ExpandError::IndexOutOfRange { index: 9, width: 1 }
    );
}

#[test]
fn template_parse_errors_surface_at_setup() {
    assert!(matches!(
        Template::parse(&argv(&["echo", "{1"])).unwrap_err(),
        TemplateError::UnterminatedPlaceholder(_)
    ));
    assert!(matches!(
        Template::parse(&argv(&["echo", "{1:bogus}"])).unwrap_err(),
        TemplateError::UnknownAction(_)
    ));
}
