//! A four-function calculator.
//!
//! ```text
//! expr := expr ('+' | '-') expr     binding power 1
//!       | expr ('*' | '/') expr     binding power 2
//!       | '(' expr ')'
//!       | number
//! ```
//!
//! Operators are left-associative. Numbers are lexed by a compiled pattern;
//! a number too large for `u32` propagates its parse error out of the rule.

use std::rc::Rc;
use std::sync::LazyLock;

use mend::{
    compile, hash_state, match_token, token, Abort, Document, Fault, Grammar, Lexer, Parselet,
    Parsed, Parser, Rope, Rule, Token,
};

pub enum Calc {}

#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Number(f64),
    Binary {
        op: char,
        left: Parsed<Calc>,
        right: Parsed<Calc>,
    },
    Error(String),
}

/// An operand bounded by a binding power, or an operator continuing `left`.
#[derive(Clone, Debug)]
pub enum Slot {
    Operand(u8),
    Operator { binding_power: u8, left: Parsed<Calc> },
}

impl Grammar for Calc {
    type Node = Expr;
    type State = Slot;
    type Skip = char;

    fn error_message(message: String) -> Expr {
        Expr::Error(message)
    }

    fn lexer_error(position: usize) -> Expr {
        Expr::Error(format!("unexpected input at {position}"))
    }

    fn unhandled_error(fault: &Fault) -> Expr {
        Expr::Error(fault.to_string())
    }

    fn is_error(node: &Expr) -> bool {
        matches!(node, Expr::Error(_))
    }
}

fn hash_slot(slot: &Slot) -> u64 {
    match slot {
        Slot::Operand(binding_power) => hash_state(&(0_u8, *binding_power)),
        Slot::Operator {
            binding_power,
            left,
        } => hash_state(&(1_u8, *binding_power, left.id)),
    }
}

fn eq_slot(a: &Slot, b: &Slot) -> bool {
    match (a, b) {
        (Slot::Operand(a), Slot::Operand(b)) => a == b,
        (
            Slot::Operator {
                binding_power: a,
                left: left_a,
            },
            Slot::Operator {
                binding_power: b,
                left: left_b,
            },
        ) => a == b && Rc::ptr_eq(left_a, left_b),
        _ => false,
    }
}

fn char_token(c: char) -> Token<char> {
    token(move |lx| match lx.next_char() {
        Some(found) if found == c => Ok(found),
        _ => Err(lx.err(format!("expected `{c}`"))),
    })
}

static WHITESPACE: LazyLock<Token<char>> = LazyLock::new(|| {
    token(|lx| match lx.next_char() {
        Some(c) if c.is_whitespace() => Ok(c),
        _ => Err(lx.err("expected whitespace")),
    })
});

static OPEN: LazyLock<Token<char>> = LazyLock::new(|| char_token('('));
static CLOSE: LazyLock<Token<char>> = LazyLock::new(|| char_token(')'));

static OPERATOR: LazyLock<Token<char>> = LazyLock::new(|| {
    let code = compile("[-+*/]").expect("operator pattern compiles");
    match_token(
        code,
        |matched| matched.chars().next().unwrap_or('+'),
        "expected an operator",
    )
});

static NUMBER: LazyLock<Token<String>> = LazyLock::new(|| {
    let code = compile("[0-9]+").expect("number pattern compiles");
    match_token(code, |matched| matched, "expected a number")
});

static EXPRESSION: Parselet<Calc> = Parselet::new("expression", expression, hash_slot, eq_slot);
static ATOM: Parselet<Calc> = Parselet::new("atom", atom, hash_slot, eq_slot);
static INFIX: Parselet<Calc> = Parselet::new("infix", infix, hash_slot, eq_slot);

fn binding_power(op: char) -> u8 {
    match op {
        '+' | '-' => 1,
        _ => 2,
    }
}

fn expression(p: &mut Rule<'_, Calc>) -> Result<Expr, Abort> {
    let Slot::Operand(binding_power) = *p.state() else {
        return Err(p.err("expression needs an operand slot"));
    };
    let mut left = p.parse(&ATOM, Slot::Operand(0));
    if p.is_err(&left) {
        return Ok(p.adopt(&left));
    }
    loop {
        let saved = p.snapshot();
        let next = p.parse(
            &INFIX,
            Slot::Operator {
                binding_power,
                left: Rc::clone(&left),
            },
        );
        if p.is_err(&next) {
            p.restore(saved);
            break;
        }
        left = next;
    }
    Ok(p.adopt(&left))
}

fn atom(p: &mut Rule<'_, Calc>) -> Result<Expr, Abort> {
    if p.is_next(&OPEN) {
        p.lex(&OPEN)?;
        let inner = p.parse(&EXPRESSION, Slot::Operand(0));
        p.lex(&CLOSE)?;
        return Ok(p.adopt(&inner));
    }
    let digits = p.lex(&NUMBER)?;
    let value: u32 = digits.parse()?;
    Ok(Expr::Number(f64::from(value)))
}

fn infix(p: &mut Rule<'_, Calc>) -> Result<Expr, Abort> {
    let Slot::Operator {
        binding_power: floor,
        left,
    } = p.state().clone()
    else {
        return Err(p.err("infix needs a left operand"));
    };
    let op = p.lex(&OPERATOR)?;
    let power = binding_power(op);
    if power <= floor {
        return Err(p.err("operator binds too loosely"));
    }
    let right = p.parse(&EXPRESSION, Slot::Operand(power));
    Ok(Expr::Binary { op, left, right })
}

pub fn parser() -> Parser<Calc> {
    Parser::new(Slot::Operand(0), &EXPRESSION, vec![WHITESPACE.clone()])
}

pub fn document(text: &str) -> Document<Calc> {
    Document::new(text, parser())
}

/// Parse `text` once with `parser`.
pub fn parse_with(parser: &Parser<Calc>, text: &str) -> Parsed<Calc> {
    let rope = Rope::new(text);
    parser.snapshot(&Lexer::from_rope(&rope)).exec(&|_, _| false)
}

pub fn parse(text: &str) -> Parsed<Calc> {
    parse_with(&parser(), text)
}

/// Value of a tree. Error nodes evaluate to NaN.
pub fn eval(node: &Parsed<Calc>) -> f64 {
    match &node.node {
        Expr::Number(value) => *value,
        Expr::Binary { op, left, right } => {
            let (left, right) = (eval(left), eval(right));
            match op {
                '+' => left + right,
                '-' => left - right,
                '*' => left * right,
                _ => left / right,
            }
        }
        Expr::Error(_) => f64::NAN,
    }
}

/// Fully parenthesized rendering of a tree.
pub fn render(node: &Parsed<Calc>) -> String {
    match &node.node {
        Expr::Number(value) => value.to_string(),
        Expr::Binary { op, left, right } => {
            format!("({} {op} {})", render(left), render(right))
        }
        Expr::Error(_) => "<error>".to_string(),
    }
}

/// Messages of every error node, depth first.
pub fn errors(node: &Parsed<Calc>) -> Vec<String> {
    match &node.node {
        Expr::Number(_) => Vec::new(),
        Expr::Binary { left, right, .. } => {
            let mut found = errors(left);
            found.extend(errors(right));
            found
        }
        Expr::Error(message) => vec![message.clone()],
    }
}
