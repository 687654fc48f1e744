//! Incremental parsing toolkit.
//!
//! - [`rope`]: persistent text with edit-stable cursors.
//! - [`parse`]: snapshot-based Pratt parsing with per-rule memoization,
//!   plus [`Document`] for edit-and-reparse loops.
//! - [`pattern`]: regex-like patterns compiled to token matchers.
//!
//! The most used items are re-exported at the crate root.

use std::sync::Once;

pub use mend_parse as parse;
pub use mend_pattern as pattern;
pub use mend_rope as rope;

pub use mend_parse::{
    eq_state, hash_state, parser_from_lexer, token, Abort, CacheStats, Document, Fault, Grammar,
    LexError, Lexer, ParseConfig, Parsed, Parselet, Parser, Rule, Snapshot, Token,
};
pub use mend_pattern::{compile, match_token, Bytecode, PatternError};
pub use mend_rope::{replace, Buffer, Cursor, Rope, RopeError};

/// Environment variable holding the log filter. `RUST_LOG` is the fallback.
pub const LOG_ENV: &str = "MEND_LOG";

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for debug output.
///
/// Call this once at startup. Safe to call multiple times.
/// Enable with `MEND_LOG=mend_parse=debug` or `MEND_LOG=mend_parse=trace`.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        // Only initialize if MEND_LOG or RUST_LOG is set
        let Ok(filter) =
            EnvFilter::try_from_env(LOG_ENV).or_else(|_| EnvFilter::try_from_default_env())
        else {
            return;
        };
        let installed = tracing_subscriber::registry()
            .with(fmt::layer().with_target(true).with_level(true))
            .with(filter)
            .try_init();
        if installed.is_err() {
            tracing::debug!("a global subscriber was already installed");
        }
    });
}
