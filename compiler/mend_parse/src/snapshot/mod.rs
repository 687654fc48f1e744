//! Immutable parser snapshots.
//!
//! A [`Snapshot`] is everything a rule needs to continue parsing: the input
//! position, the parse state, the active rule, the skip tokens and the
//! parser root. Snapshots are never mutated. Lexing or parsing returns a new
//! snapshot and leaves the old one usable, which is what makes
//! backtracking a plain assignment (see [`Rule::restore`](crate::Rule::restore)).

use std::fmt;
use std::rc::Rc;

use mend_rope::Cursor;
use tracing::{debug, trace};

use crate::parser::Root;
use crate::{Grammar, LexError, Lexer, Parselet, Parsed, Rule, Skipped, Spanned, Token};

/// Predicate telling whether a cached span `[start, end)` touches an edit.
pub type InRange<'a> = &'a dyn Fn(&Cursor, &Cursor) -> bool;

pub struct Snapshot<G: Grammar> {
    position: Cursor,
    state: G::State,
    parselet: &'static Parselet<G>,
    skip: Rc<[Token<G::Skip>]>,
    root: Rc<Root<G>>,
}

impl<G: Grammar> Snapshot<G> {
    pub(crate) fn new(
        position: Cursor,
        state: G::State,
        parselet: &'static Parselet<G>,
        skip: Rc<[Token<G::Skip>]>,
        root: Rc<Root<G>>,
    ) -> Self {
        Snapshot {
            position,
            state,
            parselet,
            skip,
            root,
        }
    }

    pub fn position(&self) -> &Cursor {
        &self.position
    }

    /// Character index of the snapshot.
    pub fn index(&self) -> usize {
        self.position.index()
    }

    pub fn state(&self) -> &G::State {
        &self.state
    }

    pub fn parselet(&self) -> &'static Parselet<G> {
        self.parselet
    }

    pub fn lexer(&self) -> Lexer {
        Lexer::new(self.position.clone())
    }

    /// The same snapshot at another position.
    pub(crate) fn at(&self, position: Cursor) -> Self {
        Snapshot {
            position,
            state: self.state.clone(),
            parselet: self.parselet,
            skip: Rc::clone(&self.skip),
            root: Rc::clone(&self.root),
        }
    }

    /// Lex `token` here, returning its value and the snapshot past it.
    pub fn lex<T>(&self, token: &Token<T>) -> Result<(T, Snapshot<G>), LexError> {
        let (value, lexer) = token.lex(&self.lexer())?;
        Ok((value, self.at(lexer.into_position())))
    }

    /// Consume skip tokens starting at `from`.
    ///
    /// Each round tries every skip token in order and keeps the first match.
    /// Stops when no token matches or a match consumed nothing.
    fn skip_from(&self, from: &Cursor) -> (Skipped<G>, Cursor) {
        let mut skipped = Skipped::<G>::new();
        let mut lexer = Lexer::new(from.clone());
        'rounds: loop {
            for token in self.skip.iter() {
                if let Ok((value, next)) = token.lex(&lexer) {
                    if next == lexer {
                        break 'rounds;
                    }
                    trace!(from = lexer.index(), to = next.index(), "skipped token");
                    skipped.push(value);
                    lexer = next;
                    continue 'rounds;
                }
            }
            break;
        }
        (skipped, lexer.into_position())
    }

    /// Invoke `parselet` with `state` at this snapshot's position.
    ///
    /// A cached node is reused when `in_range` says its span does not touch
    /// an edit. Otherwise leading skip tokens are consumed, the rule body
    /// runs, trailing skip tokens are consumed, and the result is cached.
    ///
    /// The returned snapshot keeps this snapshot's own state and rule and sits
    /// past the node.
    pub fn parse(
        &self,
        parselet: &'static Parselet<G>,
        state: G::State,
        in_range: InRange<'_>,
    ) -> (Parsed<G>, Snapshot<G>) {
        let start = self.position.clone();
        if let Some((node, end)) = self.root.recall(parselet, &state, &start, in_range) {
            return (node, self.at(end));
        }

        let (mut skipped_before, body_start) = self.skip_from(&start);
        let inner = Snapshot {
            position: body_start,
            state: state.clone(),
            parselet,
            skip: Rc::clone(&self.skip),
            root: Rc::clone(&self.root),
        };
        let mut rule = Rule::new(inner, in_range);
        let node = self.root.run(parselet, &mut rule);
        let (body_end, adopted_before, mut skipped_after) = rule.finish();
        skipped_before.extend(adopted_before);

        let (trailing, end) = self.skip_from(&body_end);
        skipped_after.extend(trailing);

        let len = end.index().saturating_sub(start.index());
        let parsed: Parsed<G> = Rc::new(Spanned {
            node,
            start: start.clone(),
            end: end.clone(),
            len,
            id: self.root.fresh_id(),
            skipped_before,
            skipped_after,
        });
        trace!(
            rule = parselet.name,
            start = start.index(),
            len,
            id = parsed.id.raw(),
            error = parsed.is_error(),
            "parsed node"
        );
        self.root
            .store(parselet, state, start, Rc::clone(&parsed), end.clone());
        (parsed, self.at(end))
    }

    /// Run this snapshot's own rule with its own state; the top-level entry.
    pub fn exec(&self, in_range: InRange<'_>) -> Parsed<G> {
        debug!(rule = self.parselet.name, at = self.index(), "parse started");
        let (node, _) = self.parse(self.parselet, self.state.clone(), in_range);
        debug!(
            rule = self.parselet.name,
            len = node.len,
            error = node.is_error(),
            "parse finished"
        );
        node
    }
}

impl<G: Grammar> Clone for Snapshot<G> {
    fn clone(&self) -> Self {
        self.at(self.position.clone())
    }
}

impl<G: Grammar> fmt::Debug for Snapshot<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Snapshot")
            .field("position", &self.position)
            .field("state", &self.state)
            .field("parselet", &self.parselet.name)
            .finish_non_exhaustive()
    }
}
