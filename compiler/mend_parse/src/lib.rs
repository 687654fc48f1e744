//! Snapshot-based Pratt parsing engine with incremental memoization.
//!
//! A grammar is a [`Grammar`] marker type plus a set of [`Parselet`]s
//! (named rules) and [`Token`]s (lexical recognizers). Parsing runs over a
//! [`mend_rope::Rope`] through immutable [`Snapshot`]s; each rule body sees a
//! [`Rule`] facade for lexing, calling sub-rules and backtracking.
//!
//! # Incremental reuse
//!
//! Every rule invocation is memoized per parser, keyed by the rule's state
//! and its start cursor. Cursors survive edits to the rope, so after an edit
//! the next parse finds the old results at their (moved) positions and reuses
//! each one whose span does not touch an edited range. [`Document`] bundles a
//! rope, a [`Parser`] and an [`EditLog`] to drive this.
//!
//! # Failures
//!
//! A parse always yields a complete tree. Lexer failures, grammar failures,
//! foreign errors and panics inside rule bodies become error nodes through
//! the grammar's conversion hooks; see [`Abort`] and [`Fault`].

mod config;
mod document;
mod edit;
mod error;
mod grammar;
mod guard;
mod lexer;
mod memo;
mod parselet;
mod parser;
mod rule;
mod snapshot;

#[cfg(test)]
mod test_grammar;

pub use config::ParseConfig;
pub use document::Document;
pub use edit::{EditLog, EditRange};
pub use error::{Abort, Fault, LexError};
pub use grammar::{Grammar, NodeId, Parsed, Skipped, Spanned};
pub use lexer::{lex_first_match, token, Lexer, Token, TokenLexer};
pub use memo::CacheStats;
pub use parselet::{eq_state, hash_state, Parselet, RuleFn, StateEqFn, StateHashFn};
pub use parser::{parser_from_lexer, Parser};
pub use rule::Rule;
pub use snapshot::{InRange, Snapshot};
