#![allow(clippy::unwrap_used, clippy::expect_used)]

use pretty_assertions::assert_eq;

use super::{compile, PatternError};
use crate::{matches_exact, matches_prefix, Input, StrInput};

fn exact(pattern: &str, text: &str) -> bool {
    matches_exact(&compile(pattern).unwrap(), &mut StrInput::new(text))
}

fn error(pattern: &str) -> (usize, String) {
    let PatternError { position, reason } = compile(pattern).unwrap_err();
    (position, reason)
}

// === Compiled behavior ===

#[test]
fn bounded_repeat() {
    assert!(exact("a{3,4}", "aaa"));
    assert!(exact("a{3,4}", "aaaa"));
    assert!(!exact("a{3,4}", "aa"));
    assert!(!exact("a{3,4}", "aaaaa"));
}

#[test]
fn character_class() {
    for text in ["a", "b", "c"] {
        assert!(exact("[a-c]", text));
    }
    assert!(!exact("[a-c]", "d"));
}

#[test]
fn union_and_plus() {
    assert!(exact("a|b", "a"));
    assert!(exact("a|b", "b"));
    assert!(!exact("a|b", "c"));
    assert!(exact("a+", "aaaa"));
    assert!(!exact("a+", ""));
}

#[test]
fn digits_prefix() {
    let code = compile("[0-9]+").unwrap();
    let mut input = StrInput::new("123x");
    assert!(matches_prefix(&code, &mut input));
    assert_eq!(input.position(), 3);
}

#[test]
fn postfix_on_last_char() {
    assert!(exact("ab*", "a"));
    assert!(exact("ab*", "abbb"));
    assert!(!exact("ab*", "abab"));
    assert!(exact("(ab)*", "abab"));
}

#[test]
fn open_ended_repeats() {
    assert!(exact("a{,2}", ""));
    assert!(exact("a{,2}", "aa"));
    assert!(!exact("a{,2}", "aaa"));
    assert!(exact("a{2,}", "aaaaa"));
    assert!(!exact("a{2,}", "a"));
    assert!(exact("a{2}", "aa"));
}

#[test]
fn escaped_specials() {
    assert!(exact("x%*", "x*"));
    assert!(!exact("x%*", "xx"));
    assert!(exact("[%]%-]+", "]-]"));
}

#[test]
fn identifier_pattern() {
    let pattern = "[a-zA-Z_][a-zA-Z0-9_]*";
    assert!(exact(pattern, "snake_case9"));
    assert!(!exact(pattern, "9lives"));
}

// === Errors ===

#[test]
fn errors_carry_position_and_reason() {
    assert_eq!(error(""), (0, "expected a literal".to_string()));
    assert_eq!(error("a|"), (2, "expected a literal".to_string()));
    assert_eq!(error("a)"), (1, "unexpected `)`".to_string()));
    assert_eq!(error("(a"), (2, "expected `)`".to_string()));
    assert_eq!(
        error("[c-a]"),
        (4, "character range `c-a` is inverted".to_string())
    );
    assert_eq!(
        error("a{2,1}"),
        (6, "repetition lower bound 2 exceeds upper bound 1".to_string())
    );
    assert_eq!(error("ab{2"), (4, "expected `}`".to_string()));
}

#[test]
fn repetition_size_is_bounded() {
    assert!(exact("a{1000}", &"a".repeat(1000)));
    assert_eq!(
        error("a{100000000}"),
        (
            12,
            "repetition count 100000000 exceeds the limit of 1000".to_string()
        )
    );
    let nested = compile("((a{1000}){1000}){1000}").unwrap_err();
    assert_eq!(nested.reason, "pattern expands to more than 65536 instructions");
}

#[test]
fn error_display() {
    assert_eq!(
        compile("a)").unwrap_err().to_string(),
        "invalid pattern at 1: unexpected `)`"
    );
}
