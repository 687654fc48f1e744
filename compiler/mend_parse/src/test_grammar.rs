//! A small bracketed word-list grammar shared by the unit tests.
//!
//! ```text
//! items := item*
//! item  := word | '[' items ']' | '#' word | '!' | '?'
//! ```
//!
//! `#` without a word is a lexer failure, `!` panics and `?` propagates a
//! foreign error, so every failure channel can be exercised.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::LazyLock;

use crate::{
    eq_state, hash_state, token, Abort, Document, Fault, Grammar, Parselet, Parsed, Parser, Rule,
    Token,
};

pub(crate) enum Words {}

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Node {
    Word(String),
    Group(Vec<Parsed<Words>>),
    Error(String),
}

impl Grammar for Words {
    type Node = Node;
    type State = ();
    type Skip = char;

    fn error_message(message: String) -> Node {
        Node::Error(message)
    }

    fn lexer_error(position: usize) -> Node {
        Node::Error(format!("lexer error at {position}"))
    }

    fn unhandled_error(fault: &Fault) -> Node {
        Node::Error(format!("internal: {fault}"))
    }

    fn is_error(node: &Node) -> bool {
        matches!(node, Node::Error(_))
    }
}

fn char_token(c: char) -> Token<char> {
    token(move |lx| match lx.next_char() {
        Some(found) if found == c => Ok(found),
        _ => Err(lx.err(format!("expected '{c}'"))),
    })
}

pub(crate) static WS: LazyLock<Token<char>> = LazyLock::new(|| {
    token(|lx| match lx.next_char() {
        Some(c @ (' ' | '\n')) => Ok(c),
        _ => Err(lx.err("expected whitespace")),
    })
});

static WORD: LazyLock<Token<String>> = LazyLock::new(|| {
    token(|lx| {
        let mut word = String::new();
        while let Some(c) = lx.next_char() {
            if !c.is_alphanumeric() {
                lx.prev(1);
                break;
            }
            word.push(c);
        }
        if word.is_empty() {
            Err(lx.err("expected a word"))
        } else {
            Ok(word)
        }
    })
});

static TAG: LazyLock<Token<String>> = LazyLock::new(|| {
    token(|lx| {
        if lx.next_char() != Some('#') {
            return Err(lx.err("expected '#'"));
        }
        let mut tag = String::from("#");
        while lx.peek().is_some_and(char::is_alphanumeric) {
            tag.extend(lx.next_char());
        }
        if tag.len() == 1 {
            Err(lx.fail())
        } else {
            Ok(tag)
        }
    })
});

static OPEN: LazyLock<Token<char>> = LazyLock::new(|| char_token('['));
static CLOSE: LazyLock<Token<char>> = LazyLock::new(|| char_token(']'));
static HASH: LazyLock<Token<char>> = LazyLock::new(|| char_token('#'));
static BANG: LazyLock<Token<char>> = LazyLock::new(|| char_token('!'));
static QUESTION: LazyLock<Token<char>> = LazyLock::new(|| char_token('?'));

pub(crate) static ITEMS: Parselet<Words> = Parselet::new("items", items, hash_state, eq_state);
pub(crate) static ITEM: Parselet<Words> = Parselet::new("item", item, hash_state, eq_state);

fn items(p: &mut Rule<'_, Words>) -> Result<Node, Abort> {
    let mut items = Vec::new();
    while !p.cursor().is_at_end() && !p.is_next(&CLOSE) {
        let item = p.parse(&ITEM, ());
        let stuck = item.len == 0;
        items.push(item);
        if stuck {
            break;
        }
    }
    Ok(Node::Group(items))
}

fn item(p: &mut Rule<'_, Words>) -> Result<Node, Abort> {
    if p.is_next(&OPEN) {
        p.lex(&OPEN)?;
        let inner = p.parse(&ITEMS, ());
        p.lex(&CLOSE)?;
        return Ok(p.adopt(&inner));
    }
    if p.is_next(&HASH) {
        return Ok(Node::Word(p.lex(&TAG)?));
    }
    if p.is_next(&BANG) {
        p.lex(&BANG)?;
        panic!("bang");
    }
    if p.is_next(&QUESTION) {
        p.lex(&QUESTION)?;
        let number: u32 = "not a number".parse()?;
        return Ok(Node::Word(number.to_string()));
    }
    Ok(Node::Word(p.lex(&WORD)?))
}

pub(crate) fn parser() -> Parser<Words> {
    Parser::new((), &ITEMS, vec![WS.clone()])
}

pub(crate) fn document(text: &str) -> Document<Words> {
    Document::new(text, parser())
}

/// Compact rendering of a tree: words as-is, groups in brackets, errors as
/// `<error>`.
pub(crate) fn shape(node: &Parsed<Words>) -> String {
    match &node.node {
        Node::Word(word) => word.clone(),
        Node::Group(items) => {
            let inner: Vec<String> = items.iter().map(shape).collect();
            format!("[{}]", inner.join(" "))
        }
        Node::Error(_) => "<error>".to_string(),
    }
}

/// Every node of a tree, depth first.
pub(crate) fn walk(node: &Parsed<Words>, out: &mut Vec<Parsed<Words>>) {
    out.push(node.clone());
    if let Node::Group(items) = &node.node {
        for item in items {
            walk(item, out);
        }
    }
}
