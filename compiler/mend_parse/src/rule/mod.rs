//! The facade a rule body parses through.

use std::fmt;

use mend_rope::Cursor;

use crate::lexer::lex_first_match;
use crate::snapshot::InRange;
use crate::{Abort, Grammar, Parselet, Parsed, Skipped, Snapshot, Token};

/// Parsing handle passed to a parselet body.
///
/// Holds the current snapshot for the duration of one rule invocation.
/// Lexing and sub-rule calls advance it; [`snapshot`](Self::snapshot) and
/// [`restore`](Self::restore) provide backtracking.
pub struct Rule<'a, G: Grammar> {
    snapshot: Snapshot<G>,
    in_range: InRange<'a>,
    adopted_before: Skipped<G>,
    adopted_after: Skipped<G>,
}

impl<'a, G: Grammar> Rule<'a, G> {
    pub(crate) fn new(snapshot: Snapshot<G>, in_range: InRange<'a>) -> Self {
        Rule {
            snapshot,
            in_range,
            adopted_before: Skipped::<G>::new(),
            adopted_after: Skipped::<G>::new(),
        }
    }

    /// End position and the skip lists taken over from adopted nodes.
    pub(crate) fn finish(self) -> (Cursor, Skipped<G>, Skipped<G>) {
        (
            self.snapshot.position().clone(),
            self.adopted_before,
            self.adopted_after,
        )
    }

    /// The state this rule was invoked with.
    pub fn state(&self) -> &G::State {
        self.snapshot.state()
    }

    /// Current character index.
    pub fn position(&self) -> usize {
        self.snapshot.index()
    }

    pub fn cursor(&self) -> &Cursor {
        self.snapshot.position()
    }

    /// Lex `token` and advance past it.
    pub fn lex<T>(&mut self, token: &Token<T>) -> Result<T, Abort> {
        let (value, next) = self.snapshot.lex(token)?;
        self.snapshot = next;
        Ok(value)
    }

    /// Whether `token` matches next. Consumes nothing.
    pub fn is_next<T>(&self, token: &Token<T>) -> bool {
        token.is_next(&self.snapshot.lexer())
    }

    /// Lex the first of `tokens` that matches, or fail with `message`.
    pub fn lex_first_match<T>(&mut self, tokens: &[&Token<T>], message: &str) -> Result<T, Abort> {
        let (value, lexer) = lex_first_match(tokens, &self.snapshot.lexer(), message)?;
        self.snapshot = self.snapshot.at(lexer.into_position());
        Ok(value)
    }

    /// Invoke a sub-rule and advance past its node.
    ///
    /// Failures inside the sub-rule come back as an error node; check with
    /// [`is_err`](Self::is_err).
    pub fn parse(&mut self, parselet: &'static Parselet<G>, state: G::State) -> Parsed<G> {
        let (node, next) = self.snapshot.parse(parselet, state, self.in_range);
        self.snapshot = next;
        node
    }

    /// A grammar failure with `message`; return it with `Err`.
    #[allow(clippy::unused_self, reason = "keeps failures spelled `p.err(..)` in rule bodies")]
    pub fn err(&self, message: impl Into<String>) -> Abort {
        Abort::Message(message.into())
    }

    #[allow(clippy::unused_self, reason = "keeps node checks spelled `p.is_err(..)` in rule bodies")]
    pub fn is_err(&self, node: &Parsed<G>) -> bool {
        G::is_error(&node.node)
    }

    /// The current position, for a later [`restore`](Self::restore).
    pub fn snapshot(&self) -> Snapshot<G> {
        self.snapshot.clone()
    }

    /// Rewind to an earlier snapshot of this invocation.
    pub fn restore(&mut self, snapshot: Snapshot<G>) {
        self.snapshot = snapshot;
    }

    /// Return a sub-rule's node as this rule's own result.
    ///
    /// The sub-node's skip lists are carried over to the node this rule
    /// produces.
    pub fn adopt(&mut self, node: &Parsed<G>) -> G::Node {
        self.adopted_before.extend(node.skipped_before.iter().cloned());
        self.adopted_after.extend(node.skipped_after.iter().cloned());
        node.node.clone()
    }
}

impl<G: Grammar> fmt::Debug for Rule<'_, G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("snapshot", &self.snapshot)
            .finish_non_exhaustive()
    }
}
