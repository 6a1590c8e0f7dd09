//! Cross-combinator properties of the source algebra.

use core_source::{Combine, Link, Singleton, Source, collect, parse};
use pretty_assertions::assert_eq;

fn column(values: &[&str]) -> Singleton {
    Singleton::new(values.iter().copied())
}

#[test]
fn singleton_yields_exactly_its_values_and_restores_on_reset() {
    let values = ["v0", "v1", "v2", "v3"];
    let mut src = column(&values);
    let rows = collect(&mut src);
    assert_eq!(rows.len(), values.len());
    for (row, value) in rows.iter().zip(values) {
        assert_eq!(row.as_slice(), [value.to_string()]);
    }
    assert!(src.done());
    src.reset();
    assert_eq!(collect(&mut src), rows);
}

#[test]
fn link_length_is_the_minimum_and_width_the_sum() {
    let cases: &[(&[&str], &[&str])] = &[
        (&["a", "b", "c"], &["x"]),
        (&["a"], &["x", "y", "z"]),
        (&["a", "b"], &["x", "y"]),
        (&[], &["x", "y"]),
    ];
    for (left, right) in cases {
        let mut src = Link::new(column(left), column(right));
        assert_eq!(src.width(), 2);
        let rows = collect(&mut src);
        assert_eq!(rows.len(), left.len().min(right.len()));
        for row in &rows {
            assert_eq!(row.len(), 2);
        }
    }
}

#[test]
fn combine_length_is_the_product_in_row_major_order() {
    let left = ["a", "b", "c"];
    let right = ["x", "y"];
    let mut src = Combine::new(column(&left), column(&right));
    let rows = collect(&mut src);
    assert_eq!(rows.len(), left.len() * right.len());
    for (k, row) in rows.iter().enumerate() {
        let i = k / right.len();
        let j = k % right.len();
        assert_eq!(row.as_slice(), [left[i].to_string(), right[j].to_string()]);
    }
}

#[test]
fn nested_products_compose() {
    // (A B ::: 1 2) ::: x, where widths add and lengths multiply.
    let inner = Combine::new(column(&["A", "B"]), column(&["1", "2"]));
    let mut src = Combine::new(inner, column(&["x"]));
    assert_eq!(src.width(), 3);
    let rows = collect(&mut src);
    assert_eq!(rows.len(), 4);
    assert_eq!(rows[0].as_slice(), ["A", "1", "x"].map(String::from));
    assert_eq!(rows[3].as_slice(), ["B", "2", "x"].map(String::from));
}

#[test]
fn parsed_expression_matches_the_hand_built_tree() {
    let words: Vec<String> = "A B C :::+ 1 2 3 ::: X Y :::+ 11 22"
        .split_whitespace()
        .map(str::to_string)
        .collect();
    let mut parsed = parse(&words).expect("parse");

    let mut built = Combine::new(
        Link::new(column(&["A", "B", "C"]), column(&["1", "2", "3"])),
        Link::new(column(&["X", "Y"]), column(&["11", "22"])),
    );

    assert_eq!(parsed.width(), built.width());
    assert_eq!(collect(parsed.as_mut()), collect(&mut built));
}
