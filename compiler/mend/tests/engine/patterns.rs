//! Compiled patterns as tokens.

use mend::pattern::{matches_exact, StrInput};
use mend::{compile, PatternError};
use pretty_assertions::assert_eq;

use crate::common::{document, eval};

#[test]
fn identifier_pattern_matches_whole_words() {
    let ident = compile("[a-z_][a-z0-9_]*").unwrap();
    assert!(matches_exact(&ident, &mut StrInput::new("snake_case2")));
    assert!(!matches_exact(&ident, &mut StrInput::new("2bad")));
    assert!(!matches_exact(&ident, &mut StrInput::new("has space")));
}

#[test]
fn bad_pattern_reports_reason() {
    let error: PatternError = compile("[0-9").unwrap_err();
    assert_eq!(error.reason, "unterminated character class");
    assert!(error.to_string().starts_with("invalid pattern at "));
}

#[test]
fn number_token_reads_across_edited_leaves() {
    let mut doc = document("12 + 3");
    assert_eq!(eval(&doc.parse()), 15.0);

    doc.replace(1, 1, "99").unwrap();
    assert_eq!(doc.text(), "1992 + 3");
    assert_eq!(eval(&doc.parse()), 1995.0);
}
