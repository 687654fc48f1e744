//! Parsing the calculator from scratch.

use std::rc::Rc;

use mend::{init_tracing, CacheStats, ParseConfig};
use pretty_assertions::assert_eq;

use crate::common::{document, errors, eval, parse, parse_with, parser, render};

// === Precedence ===

#[test]
fn multiplication_binds_tighter() {
    let tree = parse("1+2*3");
    assert_eq!(render(&tree), "(1 + (2 * 3))");
    assert_eq!(eval(&tree), 7.0);
}

#[test]
fn parentheses_override_precedence() {
    let tree = parse("(1+2)*3");
    assert_eq!(render(&tree), "((1 + 2) * 3)");
    assert_eq!(eval(&tree), 9.0);
}

#[test]
fn operators_associate_left() {
    assert_eq!(render(&parse("8-3-2")), "((8 - 3) - 2)");
    assert_eq!(eval(&parse("8/4/2")), 1.0);
    assert_eq!(render(&parse("1*2+3*4")), "((1 * 2) + (3 * 4))");
}

#[test]
fn deep_nesting_parses() {
    let text = format!("{}7{}", "(".repeat(300), ")".repeat(300));
    let tree = parse(&text);
    assert_eq!(eval(&tree), 7.0);
    assert_eq!(tree.len, 601);
}

// === Skip tokens ===

#[test]
fn whitespace_does_not_change_the_tree() {
    let spaced = parse("  1 + 2  ");
    let tight = parse("1+2");
    assert_eq!(render(&spaced), render(&tight));
    assert_eq!(eval(&spaced), 3.0);
    assert_eq!(spaced.len, 9);
    assert_eq!(tight.len, 3);
}

#[test]
fn newlines_are_skipped_too() {
    assert_eq!(eval(&parse("2\n*\n(3 +\t4)")), 14.0);
}

// === Failures ===

#[test]
fn missing_operand_is_an_error_node() {
    let tree = parse("1 +");
    assert_eq!(errors(&tree), vec!["expected a number".to_string()]);
    assert!(eval(&tree).is_nan());
    assert_eq!(tree.len, 3);
}

#[test]
fn unclosed_group_is_an_error_node() {
    let tree = parse("(1 + 2");
    assert!(tree.is_error());
    assert_eq!(errors(&tree), vec!["expected `)`".to_string()]);
}

#[test]
fn foreign_errors_become_error_nodes() {
    let tree = parse("99999999999 + 1");
    assert!(tree.is_error());
    assert_eq!(
        errors(&tree),
        vec!["rule `atom` failed: number too large to fit in target type".to_string()]
    );
}

#[test]
fn parse_stops_before_unexpected_input() {
    let tree = parse("1 ) 2");
    assert_eq!(eval(&tree), 1.0);
    assert_eq!(tree.len, 2);
    assert!(errors(&tree).is_empty());
}

#[test]
fn depth_limit_becomes_an_error_node() {
    let shallow = parser().with_config(ParseConfig::default().with_max_depth(1));
    let tree = parse_with(&shallow, "((1))");
    assert_eq!(
        errors(&tree),
        vec!["rule `atom` exceeded the maximum nesting depth of 1".to_string()]
    );

    let tree = parse_with(&shallow, "1");
    assert!(tree.is_error());
}

// === Caching ===

#[test]
fn reparsing_unchanged_text_reuses_the_tree() {
    init_tracing();
    let mut doc = document("(1 + 2) * 3 - 4 / 2");
    let first = doc.parse();
    doc.parser().reset_stats();
    let second = doc.parse();

    assert!(Rc::ptr_eq(&first, &second));
    assert_eq!(
        doc.parser().stats(),
        CacheStats {
            hits: 1,
            misses: 0,
            invalidations: 0,
        }
    );
    assert_eq!(eval(&second), 7.0);
}

#[test]
fn cached_parse_equals_fresh_parse() {
    let text = "1 + 2 * (3 - 4) / 5";
    let parser = parser();
    let first = parse_with(&parser, text);
    let second = parse_with(&parser, text);
    assert_eq!(first, second);
    assert_eq!(first, parse(text));
}

#[test]
fn tracing_can_be_initialized_repeatedly() {
    init_tracing();
    init_tracing();
    assert_eq!(eval(&parse("6 / 3")), 2.0);
}
