//! Regex-like patterns for building tokens.
//!
//! Patterns compile to a small bytecode ([`Op`]) that runs against any
//! rewindable [`Input`], including the [`TokenLexer`](mend_parse::TokenLexer)
//! a token body receives. [`match_token`] wraps a compiled pattern as a
//! [`Token`](mend_parse::Token).
//!
//! The surface syntax is parsed by a grammar written on `mend_parse` itself:
//!
//! | Syntax      | Meaning                               |
//! |-------------|---------------------------------------|
//! | `abc`       | literal                               |
//! | `a\|b`      | first matching alternative            |
//! | `ab`        | concatenation by juxtaposition        |
//! | `a*` `a+`   | zero or more, one or more (greedy)    |
//! | `a?`        | optional                              |
//! | `a{m,n}`    | `{m}`, `{m,}`, `{,n}` or `{m,n}`      |
//! | `[a-cx]`    | one character from a class            |
//! | `(a)`       | grouping                              |
//! | `%*`        | escaped special character             |
//!
//! Matching is greedy without backtracking into repetitions: `a*a` never
//! matches.

mod bytecode;
mod compile;
mod matcher;
mod syntax;

pub use bytecode::{atleast, between, concat, kleene, maybe, range, repeat, str, union, Bytecode, Op};
pub use compile::{compile, PatternError, MAX_OPS};
pub use matcher::{match_token, matches_exact, matches_prefix, Input, StrInput};
pub use syntax::{parse_pattern, PatternNode, PatternState, PatternSyntax, MAX_REPEAT};
