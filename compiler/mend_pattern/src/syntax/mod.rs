//! The pattern language, parsed by the engine it builds tokens for.
//!
//! ```text
//! pattern := pattern '|' pattern              binding power 1
//!          | pattern pattern                  binding power 2
//!          | pattern ('*' | '+' | '?')        binding power 3
//!          | pattern '{' m? (',' n?)? '}'     binding power 3
//!          | '(' pattern ')'
//!          | '[' (c | c '-' c)* ']'
//!          | literal
//! ```
//!
//! `%` escapes the next character. A literal run directly followed by a
//! postfix operator gives up its last character, so `ab*` repeats only `b`.

use std::rc::Rc;
use std::sync::LazyLock;

use mend_parse::{
    hash_state, parser_from_lexer, token, Abort, Fault, Grammar, Lexer, Parselet, Parsed, Rule,
    Token,
};
use mend_rope::Rope;
use tracing::trace;

use crate::{kleene, match_token, range, str, union};

/// Characters with a meaning outside character classes.
const SPECIAL: &str = "|*?+{}()[]";

/// Characters that start a postfix operator.
const POSTFIX: &str = "*+?{";

/// Largest count accepted in `{m,n}`.
pub const MAX_REPEAT: usize = 1000;

/// Grammar of the pattern language.
pub enum PatternSyntax {}

/// A node of a parsed pattern.
#[derive(Clone, Debug, PartialEq)]
pub enum PatternNode {
    Literal(String),
    /// Inclusive character range inside a class.
    Range(char, char),
    /// `[...]`: any one of the items.
    Class(Vec<Parsed<PatternSyntax>>),
    Union(Vec<Parsed<PatternSyntax>>),
    Concat(Vec<Parsed<PatternSyntax>>),
    Star(Parsed<PatternSyntax>),
    Plus(Parsed<PatternSyntax>),
    Optional(Parsed<PatternSyntax>),
    /// `{m}`, `{m,}`, `{,n}` or `{m,n}`.
    Repeat {
        lo: Option<usize>,
        hi: Option<usize>,
        operand: Parsed<PatternSyntax>,
    },
    Error(String),
}

/// Parse state: an operand slot bounded by a binding power, or an operator
/// slot continuing from `left`.
#[derive(Clone, Debug)]
pub enum PatternState {
    Operand(u8),
    Operator {
        binding_power: u8,
        left: Parsed<PatternSyntax>,
    },
}

impl Grammar for PatternSyntax {
    type Node = PatternNode;
    type State = PatternState;
    type Skip = ();

    fn error_message(message: String) -> PatternNode {
        PatternNode::Error(message)
    }

    fn lexer_error(position: usize) -> PatternNode {
        PatternNode::Error(format!("no token matched at {position}"))
    }

    fn unhandled_error(fault: &Fault) -> PatternNode {
        PatternNode::Error(fault.to_string())
    }

    fn is_error(node: &PatternNode) -> bool {
        matches!(node, PatternNode::Error(_))
    }
}

fn hash_pattern_state(state: &PatternState) -> u64 {
    match state {
        PatternState::Operand(binding_power) => hash_state(&(0_u8, *binding_power)),
        PatternState::Operator {
            binding_power,
            left,
        } => hash_state(&(1_u8, *binding_power, left.id)),
    }
}

fn eq_pattern_state(a: &PatternState, b: &PatternState) -> bool {
    match (a, b) {
        (PatternState::Operand(a), PatternState::Operand(b)) => a == b,
        (
            PatternState::Operator {
                binding_power: a,
                left: left_a,
            },
            PatternState::Operator {
                binding_power: b,
                left: left_b,
            },
        ) => a == b && Rc::ptr_eq(left_a, left_b),
        _ => false,
    }
}

// Tokens

fn symbol(text: &'static str) -> Token<String> {
    match_token(str(text), |matched| matched, format!("expected `{text}`"))
}

static BAR: LazyLock<Token<String>> = LazyLock::new(|| symbol("|"));
static OPEN_PAREN: LazyLock<Token<String>> = LazyLock::new(|| symbol("("));
static CLOSE_PAREN: LazyLock<Token<String>> = LazyLock::new(|| symbol(")"));
static OPEN_SQUARE: LazyLock<Token<String>> = LazyLock::new(|| symbol("["));
static CLOSE_SQUARE: LazyLock<Token<String>> = LazyLock::new(|| symbol("]"));
static OPEN_CURLY: LazyLock<Token<String>> = LazyLock::new(|| symbol("{"));
static CLOSE_CURLY: LazyLock<Token<String>> = LazyLock::new(|| symbol("}"));
static DASH: LazyLock<Token<String>> = LazyLock::new(|| symbol("-"));
static COMMA: LazyLock<Token<String>> = LazyLock::new(|| symbol(","));

static POSTFIX_OP: LazyLock<Token<String>> = LazyLock::new(|| {
    match_token(
        union([str("*"), str("+"), str("?")]),
        |matched| matched,
        "expected `*`, `+` or `?`",
    )
});

/// Possibly empty run of decimal digits.
static DIGITS: LazyLock<Token<String>> = LazyLock::new(|| {
    match_token(kleene(range('0', '9')), |matched| matched, "expected a number")
});

static LITERAL: LazyLock<Token<String>> = LazyLock::new(|| {
    token(|lx| {
        let mut text = String::new();
        let mut last_width = 0;
        while let Some(c) = lx.peek() {
            if SPECIAL.contains(c) {
                break;
            }
            lx.next_char();
            if c == '%' {
                let escaped = lx.next_char().ok_or_else(|| lx.err("dangling escape `%`"))?;
                text.push(escaped);
                last_width = 2;
            } else {
                text.push(c);
                last_width = 1;
            }
        }
        if text.is_empty() {
            return Err(lx.err("expected a literal"));
        }
        if text.chars().nth(1).is_some() && lx.peek().is_some_and(|c| POSTFIX.contains(c)) {
            lx.prev(last_width);
            text.pop();
        }
        Ok(text)
    })
});

static CLASS_CHAR: LazyLock<Token<char>> = LazyLock::new(|| {
    token(|lx| match lx.next_char() {
        Some('%') => lx.next_char().ok_or_else(|| lx.err("dangling escape `%`")),
        Some(']') => Err(lx.err("expected a class character")),
        Some(c) => Ok(c),
        None => Err(lx.err("unterminated character class")),
    })
});

// Rules

static PATTERN: Parselet<PatternSyntax> =
    Parselet::new("pattern", pattern, hash_pattern_state, eq_pattern_state);
static OPERAND: Parselet<PatternSyntax> =
    Parselet::new("operand", operand, hash_pattern_state, eq_pattern_state);
static OPERATOR: Parselet<PatternSyntax> =
    Parselet::new("operator", operator, hash_pattern_state, eq_pattern_state);
static CLASS_ITEM: Parselet<PatternSyntax> =
    Parselet::new("class item", class_item, hash_pattern_state, eq_pattern_state);

/// Binding-power loop: an operand, then operators for as long as they bind
/// tighter than the caller.
fn pattern(p: &mut Rule<'_, PatternSyntax>) -> Result<PatternNode, Abort> {
    let PatternState::Operand(binding_power) = *p.state() else {
        return Err(p.err("pattern rule needs an operand state"));
    };
    let mut left = p.parse(&OPERAND, PatternState::Operand(0));
    if p.is_err(&left) {
        return Ok(p.adopt(&left));
    }
    loop {
        let saved = p.snapshot();
        let next = p.parse(
            &OPERATOR,
            PatternState::Operator {
                binding_power,
                left: Rc::clone(&left),
            },
        );
        if p.is_err(&next) {
            // An operator that consumed input is malformed, not absent.
            if next.len > 0 {
                return Ok(p.adopt(&next));
            }
            p.restore(saved);
            break;
        }
        left = next;
    }
    Ok(p.adopt(&left))
}

fn operand(p: &mut Rule<'_, PatternSyntax>) -> Result<PatternNode, Abort> {
    if p.is_next(&OPEN_PAREN) {
        p.lex(&OPEN_PAREN)?;
        let inner = p.parse(&PATTERN, PatternState::Operand(0));
        if !p.is_err(&inner) {
            p.lex(&CLOSE_PAREN)?;
        }
        return Ok(p.adopt(&inner));
    }
    if p.is_next(&OPEN_SQUARE) {
        p.lex(&OPEN_SQUARE)?;
        return class(p);
    }
    Ok(PatternNode::Literal(p.lex(&LITERAL)?))
}

fn class(p: &mut Rule<'_, PatternSyntax>) -> Result<PatternNode, Abort> {
    let mut items = Vec::new();
    while !p.is_next(&CLOSE_SQUARE) {
        let item = p.parse(&CLASS_ITEM, PatternState::Operand(0));
        if p.is_err(&item) {
            return Ok(p.adopt(&item));
        }
        items.push(item);
    }
    p.lex(&CLOSE_SQUARE)?;
    Ok(PatternNode::Class(items))
}

fn class_item(p: &mut Rule<'_, PatternSyntax>) -> Result<PatternNode, Abort> {
    let lo = p.lex(&CLASS_CHAR)?;
    if !p.is_next(&DASH) {
        return Ok(PatternNode::Literal(lo.to_string()));
    }
    p.lex(&DASH)?;
    let hi = p.lex(&CLASS_CHAR)?;
    if lo > hi {
        return Err(p.err(format!("character range `{lo}-{hi}` is inverted")));
    }
    Ok(PatternNode::Range(lo, hi))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Operator {
    Union,
    Concat,
    Postfix,
    Repeat,
}

impl Operator {
    fn binding_power(self) -> u8 {
        match self {
            Operator::Union => 1,
            Operator::Concat => 2,
            Operator::Postfix | Operator::Repeat => 3,
        }
    }

    /// The operator starting at the rule's position, if any. Juxtaposition
    /// counts as concatenation.
    fn peek(p: &Rule<'_, PatternSyntax>) -> Option<Operator> {
        if p.is_next(&BAR) {
            Some(Operator::Union)
        } else if p.is_next(&POSTFIX_OP) {
            Some(Operator::Postfix)
        } else if p.is_next(&OPEN_CURLY) {
            Some(Operator::Repeat)
        } else if p.is_next(&OPEN_PAREN) || p.is_next(&OPEN_SQUARE) || p.is_next(&LITERAL) {
            Some(Operator::Concat)
        } else {
            None
        }
    }
}

/// Operands of a variadic `op` node: `left`'s own operands when it is
/// already an `op` node, then `right`.
fn flatten(
    op: Operator,
    left: &Parsed<PatternSyntax>,
    right: Parsed<PatternSyntax>,
) -> Vec<Parsed<PatternSyntax>> {
    let mut operands = match (op, &left.node) {
        (Operator::Union, PatternNode::Union(operands))
        | (Operator::Concat, PatternNode::Concat(operands)) => operands.clone(),
        _ => vec![Rc::clone(left)],
    };
    operands.push(right);
    operands
}

fn operator(p: &mut Rule<'_, PatternSyntax>) -> Result<PatternNode, Abort> {
    let PatternState::Operator {
        binding_power,
        left,
    } = p.state().clone()
    else {
        return Err(p.err("operator rule needs a left operand"));
    };
    let Some(op) = Operator::peek(p) else {
        return Err(p.err("expected an operator"));
    };
    if op.binding_power() <= binding_power {
        return Err(p.err("operator binds too loosely"));
    }
    trace!(?op, at = p.position(), "pattern operator");

    match op {
        Operator::Union => {
            p.lex(&BAR)?;
            let right = p.parse(&PATTERN, PatternState::Operand(op.binding_power()));
            Ok(PatternNode::Union(flatten(op, &left, right)))
        }
        Operator::Concat => {
            let right = p.parse(&PATTERN, PatternState::Operand(op.binding_power()));
            Ok(PatternNode::Concat(flatten(op, &left, right)))
        }
        Operator::Postfix => match p.lex(&POSTFIX_OP)?.as_str() {
            "*" => Ok(PatternNode::Star(left)),
            "+" => Ok(PatternNode::Plus(left)),
            _ => Ok(PatternNode::Optional(left)),
        },
        Operator::Repeat => {
            p.lex(&OPEN_CURLY)?;
            let lo = count(&p.lex(&DIGITS)?)?;
            let hi = if p.is_next(&COMMA) {
                p.lex(&COMMA)?;
                count(&p.lex(&DIGITS)?)?
            } else {
                lo
            };
            p.lex(&CLOSE_CURLY)?;
            if let Some(largest) = lo.max(hi).filter(|&largest| largest > MAX_REPEAT) {
                return Err(p.err(format!(
                    "repetition count {largest} exceeds the limit of {MAX_REPEAT}"
                )));
            }
            match (lo, hi) {
                (None, None) => Err(p.err("expected a repetition count")),
                (Some(lo), Some(hi)) if lo > hi => Err(p.err(format!(
                    "repetition lower bound {lo} exceeds upper bound {hi}"
                ))),
                _ => Ok(PatternNode::Repeat {
                    lo,
                    hi,
                    operand: left,
                }),
            }
        }
    }
}

fn count(digits: &str) -> Result<Option<usize>, Abort> {
    if digits.is_empty() {
        return Ok(None);
    }
    Ok(Some(digits.parse()?))
}

/// Parse `pattern` into a syntax tree. Syntax errors are error nodes.
pub fn parse_pattern(pattern: &str) -> Parsed<PatternSyntax> {
    let rope = Rope::new(pattern);
    parser_from_lexer(
        &Lexer::from_rope(&rope),
        PatternState::Operand(0),
        &PATTERN,
        Vec::new(),
    )
    .exec(&|_, _| false)
}
