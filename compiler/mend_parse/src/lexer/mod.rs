//! Lexers and tokens.
//!
//! A [`Lexer`] is an immutable position in a rope. A [`Token`] is a pure
//! recognizer: it reads characters through a [`TokenLexer`] and either
//! produces a value or fails with a [`LexError`]. Tokens never see parse
//! state, so they can be shared freely (including from `static`s).

use std::fmt;
use std::sync::Arc;

use mend_rope::{Cursor, CursorMut, Rope};

use crate::LexError;

/// An immutable lexing position.
#[derive(Clone, PartialEq, Eq)]
pub struct Lexer {
    position: Cursor,
}

impl Lexer {
    pub fn new(position: Cursor) -> Self {
        Lexer { position }
    }

    /// A lexer at the first character of `rope`.
    pub fn from_rope(rope: &Rope) -> Self {
        Lexer::new(rope.start())
    }

    pub fn position(&self) -> &Cursor {
        &self.position
    }

    /// Character index of the lexer.
    pub fn index(&self) -> usize {
        self.position.index()
    }

    pub fn into_position(self) -> Cursor {
        self.position
    }
}

impl fmt::Debug for Lexer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Lexer").field(&self.position).finish()
    }
}

/// The restricted view of the input a token function works with.
pub struct TokenLexer {
    cursor: CursorMut,
}

impl TokenLexer {
    fn new(lexer: &Lexer) -> Self {
        TokenLexer {
            cursor: lexer.position.to_mut(),
        }
    }

    /// Consume up to `n` characters. Shorter than `n` at the end of input.
    pub fn next(&mut self, n: usize) -> String {
        self.cursor.read(n)
    }

    /// Consume one character.
    pub fn next_char(&mut self) -> Option<char> {
        self.cursor.next_char()
    }

    /// Look at the next character without consuming it.
    pub fn peek(&self) -> Option<char> {
        self.cursor.peek()
    }

    /// Step back `n` characters.
    pub fn prev(&mut self, n: usize) {
        self.cursor.prev(n);
    }

    /// Character index of the next unread character.
    pub fn position(&self) -> usize {
        self.cursor.index()
    }

    pub fn is_at_end(&self) -> bool {
        self.cursor.is_at_end()
    }

    /// A failure carrying `message`; return it with `Err`.
    #[allow(clippy::unused_self, reason = "mirrors `fail` so token bodies read uniformly")]
    pub fn err(&self, message: impl Into<String>) -> LexError {
        LexError::Message(message.into())
    }

    /// A failure without a message at the current position.
    pub fn fail(&self) -> LexError {
        LexError::Failed {
            position: self.position(),
        }
    }

    fn finish(self) -> Lexer {
        Lexer::new(self.cursor.into_cursor())
    }
}

type TokenFn<T> = dyn Fn(&mut TokenLexer) -> Result<T, LexError> + Send + Sync;

/// A lexical recognizer producing `T`.
///
/// Cloning shares the underlying function.
pub struct Token<T> {
    run: Arc<TokenFn<T>>,
}

/// Build a token from a recognizer function.
pub fn token<T, F>(f: F) -> Token<T>
where
    F: Fn(&mut TokenLexer) -> Result<T, LexError> + Send + Sync + 'static,
{
    Token { run: Arc::new(f) }
}

impl<T> Token<T> {
    /// Run the token at `lexer`, returning its value and the lexer past it.
    pub fn lex(&self, lexer: &Lexer) -> Result<(T, Lexer), LexError> {
        let mut input = TokenLexer::new(lexer);
        let value = (self.run)(&mut input)?;
        Ok((value, input.finish()))
    }

    /// Whether the token matches at `lexer`, without consuming anything.
    pub fn is_next(&self, lexer: &Lexer) -> bool {
        self.lex(lexer).is_ok()
    }

    /// A token producing `f` of this token's value.
    pub fn map<U, F>(&self, f: F) -> Token<U>
    where
        T: 'static,
        U: 'static,
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        let inner = Arc::clone(&self.run);
        token(move |input| inner(input).map(&f))
    }
}

impl<T> Clone for Token<T> {
    fn clone(&self) -> Self {
        Token {
            run: Arc::clone(&self.run),
        }
    }
}

impl<T> fmt::Debug for Token<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token")
    }
}

/// Try `tokens` in order at `lexer`; the first match wins.
///
/// Fails with `message` when none matches.
pub fn lex_first_match<T>(
    tokens: &[&Token<T>],
    lexer: &Lexer,
    message: &str,
) -> Result<(T, Lexer), LexError> {
    tokens
        .iter()
        .find_map(|token| token.lex(lexer).ok())
        .ok_or_else(|| LexError::Message(message.to_string()))
}
