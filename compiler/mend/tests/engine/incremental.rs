//! Editing a calculator document and reparsing.

use std::rc::Rc;

use mend::Parsed;
use pretty_assertions::assert_eq;

use crate::common::{document, eval, parse, render, Calc, Expr};

fn operands(tree: &Parsed<Calc>) -> (Parsed<Calc>, Parsed<Calc>) {
    match &tree.node {
        Expr::Binary { left, right, .. } => (Rc::clone(left), Rc::clone(right)),
        other => panic!("expected a binary node, got {other:?}"),
    }
}

#[test]
fn inserting_an_operand_reparses() {
    let mut doc = document("1 + 3");
    assert_eq!(eval(&doc.parse()), 4.0);

    doc.replace(3, 3, " 2 +").unwrap();
    assert_eq!(doc.text(), "1 + 2 + 3");
    let tree = doc.parse();
    assert_eq!(eval(&tree), 6.0);
    assert_eq!(render(&tree), "((1 + 2) + 3)");
    assert_eq!(tree, parse("1 + 2 + 3"));
}

#[test]
fn untouched_group_is_reused() {
    let mut doc = document("(1 + 2 + 3) + (4 + 4)");
    let before = doc.parse();
    assert_eq!(eval(&before), 14.0);
    let (_, right_before) = operands(&before);

    doc.replace(6, 6, " + 5").unwrap();
    doc.parser().reset_stats();
    let after = doc.parse();

    assert_eq!(doc.text(), "(1 + 2 + 5 + 3) + (4 + 4)");
    assert_eq!(eval(&after), 19.0);
    assert!(doc.parser().stats().hits > 0);

    let (_, right_after) = operands(&after);
    assert!(Rc::ptr_eq(&right_before, &right_after));
    assert_eq!(right_after.range(), (17, 25));
}

#[test]
fn deleting_an_operator_merges_operands() {
    let mut doc = document("12 * 3");
    doc.parse();
    doc.replace(2, 5, "").unwrap();
    let tree = doc.parse();
    assert_eq!(doc.text(), "123");
    assert_eq!(eval(&tree), 123.0);
}

#[test]
fn broken_input_recovers_after_a_fix() {
    let mut doc = document("(1 + 2");
    assert!(doc.parse().is_error());

    doc.replace(6, 6, ") * 2").unwrap();
    let tree = doc.parse();
    assert!(!tree.is_error());
    assert_eq!(eval(&tree), 6.0);
}

#[test]
fn sequence_of_edits_matches_fresh_parses() {
    let edits: &[(usize, usize, &str)] = &[
        (0, 0, "("),
        (2, 2, " + 1)"),
        (7, 7, " * 2"),
        (0, 1, ""),
        (4, 5, "-"),
    ];
    let mut doc = document("5 / 5");
    doc.parse();
    for &(start, end, text) in edits {
        doc.replace(start, end, text).unwrap();
        let incremental = doc.parse();
        let fresh = parse(&doc.text());
        assert_eq!(incremental, fresh, "after editing to {:?}", doc.text());
    }
}

#[test]
fn several_edits_before_one_parse() {
    let mut doc = document("1 + 2");
    doc.parse();
    doc.replace(0, 1, "(7").unwrap();
    doc.replace(6, 6, ") * 3").unwrap();
    doc.replace(1, 2, "8").unwrap();
    assert_eq!(doc.text(), "(8 + 2) * 3");
    // The first and last edits overlap and merge into one pending range.
    assert_eq!(doc.pending_edits().len(), 2);

    let tree = doc.parse();
    assert_eq!(tree, parse("(8 + 2) * 3"));
    assert_eq!(eval(&tree), 30.0);
}

#[test]
fn repeated_edits_keep_the_cache_bounded() {
    let mut doc = document("1 + 2 * (3 + 4)");
    doc.parse();
    for _ in 0..100 {
        doc.replace(0, 1, "12").unwrap();
        doc.parse();
        doc.replace(0, 2, "1").unwrap();
        doc.parse();
    }
    assert_eq!(eval(&doc.parse()), 15.0);

    let mut fresh = document(&doc.text());
    fresh.parse();
    let cached = doc.parser().cached_nodes();
    let baseline = fresh.parser().cached_nodes();
    assert!(cached <= 2 * baseline, "{cached} cached nodes, {baseline} after a fresh parse");
    let cursors = doc.rope().buffer().live_cursors();
    let fresh_cursors = fresh.rope().buffer().live_cursors();
    assert!(
        cursors <= 2 * fresh_cursors,
        "{cursors} live cursors, {fresh_cursors} after a fresh parse"
    );
}

mod proptest_incremental {
    use proptest::prelude::*;

    use crate::common::{document, eval, parse, render};

    /// Fully parenthesized expression text and its value.
    fn expression() -> impl Strategy<Value = (String, f64)> {
        let leaf = (0_u32..100).prop_map(|n| (n.to_string(), f64::from(n)));
        leaf.prop_recursive(4, 32, 2, |inner| {
            (inner.clone(), prop::sample::select(vec!['+', '-', '*']), inner).prop_map(
                |((left, a), op, (right, b))| {
                    let value = match op {
                        '+' => a + b,
                        '-' => a - b,
                        _ => a * b,
                    };
                    (format!("({left} {op} {right})"), value)
                },
            )
        })
    }

    proptest! {
        #[test]
        fn parenthesized_expressions_evaluate((text, value) in expression()) {
            let tree = parse(&text);
            prop_assert_eq!(eval(&tree), value);
            prop_assert_eq!(tree.len, text.chars().count());
        }

        #[test]
        fn edits_reparse_like_fresh_text(
            (text, _) in expression(),
            at in any::<prop::sample::Index>(),
            width in 0_usize..4,
            insert in "[0-9+*() -]{0,4}",
        ) {
            let len = text.chars().count();
            let start = at.index(len + 1);
            let end = (start + width).min(len);

            let mut doc = document(&text);
            doc.parse();
            doc.replace(start, end, &insert).unwrap();
            let incremental = doc.parse();
            let fresh = parse(&doc.text());
            prop_assert_eq!(&incremental, &fresh);
            prop_assert_eq!(render(&incremental), render(&fresh));
        }

        #[test]
        fn edit_sequences_reparse_like_fresh_text(
            (text, _) in expression(),
            edits in prop::collection::vec(
                (
                    any::<prop::sample::Index>(),
                    0_usize..4,
                    "[0-9+*() -]{0,4}",
                    any::<bool>(),
                ),
                1..6,
            ),
        ) {
            let mut doc = document(&text);
            doc.parse();
            for (at, width, insert, reparse) in edits {
                let len = doc.text().chars().count();
                let start = at.index(len + 1);
                let end = (start + width).min(len);
                doc.replace(start, end, &insert).unwrap();
                if reparse {
                    let incremental = doc.parse();
                    prop_assert_eq!(&incremental, &parse(&doc.text()));
                }
            }
            let incremental = doc.parse();
            let fresh = parse(&doc.text());
            prop_assert_eq!(&incremental, &fresh);
            prop_assert_eq!(render(&incremental), render(&fresh));
        }
    }
}
