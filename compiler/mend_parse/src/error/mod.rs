//! Failure channels of the parsing engine.
//!
//! Three kinds of failure can end a rule body early:
//!
//! - **Lexical**: a token rejected its input ([`LexError`]).
//! - **Grammar**: the rule itself gave up with a message ([`Abort::Message`]).
//! - **Internal**: a foreign error propagated with `?`, a panic, or a runaway
//!   recursion ([`Fault`]).
//!
//! None of these escape a parse. Each is turned into an error node by the
//! grammar's conversion hooks, so a parse always returns a complete tree.

use std::any::Any;
use std::error::Error;
use std::fmt;

use crate::Grammar;

/// A token failed to match.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LexError {
    /// The token rejected the input with a message.
    Message(String),
    /// The token failed without a message, at this character index.
    Failed { position: usize },
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LexError::Message(message) => f.write_str(message),
            LexError::Failed { position } => write!(f, "no token matched at {position}"),
        }
    }
}

/// Why a rule body stopped early.
///
/// Rule bodies return `Result<G::Node, Abort>`. Any `std::error::Error` can be
/// propagated with `?` and becomes an [`Abort::Internal`].
#[derive(Debug)]
pub enum Abort {
    /// Grammar failure, converted with [`Grammar::error_message`].
    Message(String),
    /// Lexer failure at a character index, converted with
    /// [`Grammar::lexer_error`].
    Lexer(usize),
    /// Foreign error, converted with [`Grammar::unhandled_error`].
    Internal(Box<dyn Error + Send + Sync>),
}

impl Abort {
    /// Turn the failure into the grammar's error node for rule `rule`.
    pub(crate) fn into_node<G: Grammar>(self, rule: &'static str) -> G::Node {
        match self {
            Abort::Message(message) => G::error_message(message),
            Abort::Lexer(position) => G::lexer_error(position),
            Abort::Internal(source) => G::unhandled_error(&Fault::Rule { rule, source }),
        }
    }
}

impl From<LexError> for Abort {
    fn from(error: LexError) -> Self {
        match error {
            LexError::Message(message) => Abort::Message(message),
            LexError::Failed { position } => Abort::Lexer(position),
        }
    }
}

impl<E> From<E> for Abort
where
    E: Error + Send + Sync + 'static,
{
    fn from(error: E) -> Self {
        Abort::Internal(Box::new(error))
    }
}

/// Internal failure of a rule, handed to [`Grammar::unhandled_error`].
#[derive(Debug, thiserror::Error)]
pub enum Fault {
    /// The rule body panicked; the panic was caught at the rule boundary.
    #[error("rule `{rule}` panicked: {message}")]
    Panic { rule: &'static str, message: String },
    /// The rule body propagated a foreign error.
    #[error("rule `{rule}` failed: {source}")]
    Rule {
        rule: &'static str,
        source: Box<dyn Error + Send + Sync>,
    },
    /// The rule would have nested deeper than the configured limit.
    #[error("rule `{rule}` exceeded the maximum nesting depth of {limit}")]
    DepthExceeded { rule: &'static str, limit: usize },
}

impl Fault {
    /// Name of the rule that failed.
    pub fn rule(&self) -> &'static str {
        match self {
            Fault::Panic { rule, .. }
            | Fault::Rule { rule, .. }
            | Fault::DepthExceeded { rule, .. } => *rule,
        }
    }
}

/// Best-effort text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
