//! Bytecode execution over a rewindable character source.

use mend_parse::{token, Token, TokenLexer};
use tracing::trace;

use crate::{Bytecode, Op};

/// A character source the matcher can rewind.
pub trait Input {
    /// Consume one character; `None` at the end.
    fn next_char(&mut self) -> Option<char>;

    /// Characters consumed so far, as an absolute position.
    fn position(&self) -> usize;

    /// Move to an earlier or later position.
    fn seek(&mut self, position: usize);
}

/// An [`Input`] over an in-memory string.
#[derive(Clone, Debug)]
pub struct StrInput {
    chars: Vec<char>,
    position: usize,
}

impl StrInput {
    pub fn new(text: &str) -> Self {
        StrInput {
            chars: text.chars().collect(),
            position: 0,
        }
    }
}

impl Input for StrInput {
    fn next_char(&mut self) -> Option<char> {
        let c = self.chars.get(self.position).copied()?;
        self.position += 1;
        Some(c)
    }

    fn position(&self) -> usize {
        self.position
    }

    fn seek(&mut self, position: usize) {
        self.position = position.min(self.chars.len());
    }
}

impl Input for TokenLexer {
    fn next_char(&mut self) -> Option<char> {
        TokenLexer::next_char(self)
    }

    fn position(&self) -> usize {
        TokenLexer::position(self)
    }

    fn seek(&mut self, position: usize) {
        let current = TokenLexer::position(self);
        if position < current {
            self.prev(current - position);
        } else {
            self.next(position - current);
        }
    }
}

struct Matcher<'a, I: ?Sized> {
    code: &'a Bytecode,
    input: &'a mut I,
}

impl<I: Input + ?Sized> Matcher<'_, I> {
    /// Run the instruction at `pc`.
    fn run(&mut self, pc: usize) -> bool {
        let Some(op) = self.code.op(pc) else {
            return false;
        };
        match op {
            Op::Char(expected) => self.input.next_char() == Some(expected),
            Op::Range(lo, hi) => self
                .input
                .next_char()
                .is_some_and(|c| (lo..=hi).contains(&c)),
            Op::KleeneStar => self.kleene(pc + 1),
            Op::UnionStart => self.union(pc + 1),
            Op::ConcatStart => self.concat(pc + 1),
            Op::UnionEnd | Op::ConcatEnd => false,
        }
    }

    fn is_end(&self, pc: usize) -> bool {
        matches!(self.code.op(pc), None | Some(Op::UnionEnd | Op::ConcatEnd))
    }

    fn concat(&mut self, mut pc: usize) -> bool {
        while !self.is_end(pc) {
            if !self.run(pc) {
                return false;
            }
            pc = self.code.skip(pc);
        }
        true
    }

    /// Alternatives are tried in order from the same position.
    fn union(&mut self, mut pc: usize) -> bool {
        let start = self.input.position();
        while !self.is_end(pc) {
            if self.run(pc) {
                return true;
            }
            self.input.seek(start);
            pc = self.code.skip(pc);
        }
        false
    }

    /// Greedy repetition. A failed attempt is rewound; an attempt that
    /// consumes nothing ends the loop.
    fn kleene(&mut self, body: usize) -> bool {
        loop {
            let before = self.input.position();
            if !self.run(body) {
                self.input.seek(before);
                return true;
            }
            if self.input.position() == before {
                return true;
            }
        }
    }
}

/// Whether `code` matches a prefix of `input`. On success `input` sits just
/// past the match.
pub fn matches_prefix<I: Input + ?Sized>(code: &Bytecode, input: &mut I) -> bool {
    Matcher { code, input }.run(0)
}

/// Whether `code` matches all of `input`.
pub fn matches_exact<I: Input + ?Sized>(code: &Bytecode, input: &mut I) -> bool {
    matches_prefix(code, input) && input.next_char().is_none()
}

/// A token that matches `code` at the lexer position and passes the matched
/// text to `on_match`. Fails with `message` when the pattern does not match.
pub fn match_token<T, F>(code: Bytecode, on_match: F, message: impl Into<String>) -> Token<T>
where
    T: 'static,
    F: Fn(String) -> T + Send + Sync + 'static,
{
    let message = message.into();
    token(move |lx| {
        let start = lx.position();
        if !matches_prefix(&code, lx) {
            trace!(at = start, %message, "pattern token failed");
            return Err(lx.err(message.clone()));
        }
        let len = lx.position() - start;
        lx.prev(len);
        Ok(on_match(lx.next(len)))
    })
}
