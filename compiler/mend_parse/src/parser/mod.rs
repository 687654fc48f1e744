//! The parser root: caches, node ids, configuration and statistics.
//!
//! A [`Parser`] is created once per document and mints [`Snapshot`]s. Every
//! snapshot holds a handle to the same root, so all rule invocations of all
//! parses share one set of memo caches. Dropping the parser and its
//! snapshots drops the caches.
//!
//! Between [`Parser::begin_sweep`] and [`Parser::sweep`] the root counts a
//! generation: every stored or reused node is stamped with it, and the span
//! of every reused node is recorded. The sweep then drops cached nodes the
//! parse neither reached nor reused a parent of.

use std::cell::{Cell, RefCell};
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use mend_rope::Cursor;
use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use crate::error::panic_message;
use crate::guard::{ensure_sufficient_stack, DepthGuard};
use crate::memo::MemoCache;
use crate::parselet::ParseletKey;
use crate::snapshot::InRange;
use crate::{CacheStats, Fault, Grammar, Lexer, NodeId, ParseConfig, Parselet, Parsed, Rule, Snapshot, Token};

/// State shared by every snapshot of one parser.
pub(crate) struct Root<G: Grammar> {
    next_id: Cell<u64>,
    depth: Cell<usize>,
    config: Cell<ParseConfig>,
    stats: Cell<CacheStats>,
    caches: RefCell<FxHashMap<ParseletKey, MemoCache<G>>>,
    generation: Cell<u64>,
    reused: RefCell<Option<Vec<(usize, usize)>>>,
}

impl<G: Grammar> Root<G> {
    fn new(config: ParseConfig) -> Self {
        Root {
            next_id: Cell::new(0),
            depth: Cell::new(0),
            config: Cell::new(config),
            stats: Cell::new(CacheStats::default()),
            caches: RefCell::new(FxHashMap::default()),
            generation: Cell::new(0),
            reused: RefCell::new(None),
        }
    }

    pub(crate) fn fresh_id(&self) -> NodeId {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        NodeId::new(id)
    }

    fn count(&self, update: impl FnOnce(&mut CacheStats)) {
        let mut stats = self.stats.get();
        update(&mut stats);
        self.stats.set(stats);
    }

    /// A reusable cached result for `parselet` at `start`.
    ///
    /// An entry overlapping a pending edit, or whose end was cut out of the
    /// document, is dropped instead.
    pub(crate) fn recall(
        &self,
        parselet: &'static Parselet<G>,
        state: &G::State,
        start: &Cursor,
        in_range: &dyn Fn(&Cursor, &Cursor) -> bool,
    ) -> Option<(Parsed<G>, Cursor)> {
        let cached = self
            .caches
            .borrow_mut()
            .get_mut(&parselet.key())
            .and_then(|cache| cache.get(parselet, state, start, self.generation.get()));
        let Some((node, end)) = cached else {
            trace!(rule = parselet.name, at = start.index(), "cache miss");
            self.count(|stats| stats.misses += 1);
            return None;
        };

        if !start.same_document(&end) || in_range(start, &end) {
            debug!(
                rule = parselet.name,
                start = start.index(),
                end = end.index(),
                "invalidated cached node"
            );
            if let Some(cache) = self.caches.borrow_mut().get_mut(&parselet.key()) {
                cache.remove(parselet, state, start);
            }
            self.count(|stats| stats.invalidations += 1);
            return None;
        }

        trace!(rule = parselet.name, at = start.index(), id = node.id.raw(), "cache hit");
        self.count(|stats| stats.hits += 1);
        if let Some(reused) = self.reused.borrow_mut().as_mut() {
            reused.push((start.index(), end.index()));
        }
        Some((node, end))
    }

    pub(crate) fn store(
        &self,
        parselet: &'static Parselet<G>,
        state: G::State,
        start: Cursor,
        node: Parsed<G>,
        end: Cursor,
    ) {
        self.caches
            .borrow_mut()
            .entry(parselet.key())
            .or_default()
            .insert(parselet, state, start, node, end, self.generation.get());
    }

    /// Run a rule body behind the depth limit, stack growth and a panic
    /// boundary. Every failure becomes an error node.
    pub(crate) fn run(&self, parselet: &'static Parselet<G>, rule: &mut Rule<'_, G>) -> G::Node {
        let limit = self.config.get().max_depth;
        let Some(_level) = DepthGuard::enter(&self.depth, limit) else {
            debug!(rule = parselet.name, limit, "rule nesting limit reached");
            return G::unhandled_error(&Fault::DepthExceeded {
                rule: parselet.name,
                limit,
            });
        };

        let outcome = ensure_sufficient_stack(|| {
            panic::catch_unwind(AssertUnwindSafe(|| (parselet.body)(rule)))
        });
        match outcome {
            Ok(Ok(node)) => node,
            Ok(Err(abort)) => abort.into_node::<G>(parselet.name),
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                debug!(rule = parselet.name, %message, "rule panicked");
                G::unhandled_error(&Fault::Panic {
                    rule: parselet.name,
                    message,
                })
            }
        }
    }
}

/// Owner of the memo caches and entry point for parsing.
pub struct Parser<G: Grammar> {
    root: Rc<Root<G>>,
    state: G::State,
    parselet: &'static Parselet<G>,
    skip: Rc<[Token<G::Skip>]>,
}

impl<G: Grammar> Parser<G> {
    /// A parser starting every parse at `parselet` with `state`, eliding
    /// `skip_tokens` around rule invocations.
    pub fn new(
        state: G::State,
        parselet: &'static Parselet<G>,
        skip_tokens: Vec<Token<G::Skip>>,
    ) -> Self {
        Parser {
            root: Rc::new(Root::new(ParseConfig::default())),
            state,
            parselet,
            skip: skip_tokens.into(),
        }
    }

    #[must_use]
    pub fn with_config(self, config: ParseConfig) -> Self {
        self.root.config.set(config);
        self
    }

    pub fn config(&self) -> ParseConfig {
        self.root.config.get()
    }

    /// A snapshot at `lexer`'s position carrying the initial state and rule.
    pub fn snapshot(&self, lexer: &Lexer) -> Snapshot<G> {
        Snapshot::new(
            lexer.position().clone(),
            self.state.clone(),
            self.parselet,
            Rc::clone(&self.skip),
            Rc::clone(&self.root),
        )
    }

    pub fn stats(&self) -> CacheStats {
        self.root.stats.get()
    }

    pub fn reset_stats(&self) {
        self.root.stats.set(CacheStats::default());
    }

    /// Number of cached nodes across all rules.
    pub fn cached_nodes(&self) -> usize {
        self.root.caches.borrow().values().map(MemoCache::len).sum()
    }

    /// Drop every cached node whose span `is_stale` flags, whether or not a
    /// later parse would visit it. Each counts as an invalidation.
    pub fn evict(&self, is_stale: InRange<'_>) -> usize {
        let evicted: usize = self
            .root
            .caches
            .borrow_mut()
            .values_mut()
            .map(|cache| cache.evict(is_stale))
            .sum();
        self.root.count(|stats| stats.invalidations += evicted);
        debug!(evicted, "evicted cached nodes");
        evicted
    }

    /// Start a generation. Parses until the next [`sweep`](Self::sweep)
    /// mark the cached nodes they reach.
    pub fn begin_sweep(&self) {
        self.root.generation.set(self.root.generation.get() + 1);
        *self.root.reused.borrow_mut() = Some(Vec::new());
    }

    /// Drop cached nodes that no parse since [`begin_sweep`](Self::begin_sweep)
    /// stored or reused, keeping those that start inside a reused node's
    /// span. Returns
    /// how many were dropped. Without a prior `begin_sweep` nothing is
    /// dropped.
    pub fn sweep(&self) -> usize {
        let Some(mut spans) = self.root.reused.borrow_mut().take() else {
            return 0;
        };
        spans.sort_unstable();
        let mut covered: Vec<(usize, usize)> = Vec::with_capacity(spans.len());
        for (start, end) in spans {
            match covered.last_mut() {
                Some(last) if start < last.1 => last.1 = last.1.max(end),
                _ => covered.push((start, end)),
            }
        }
        // A node starting at a reused span's end belongs to whatever follows
        // it, so only strictly interior starts are covered.
        let inside_reused = |start: &Cursor, end: &Cursor| {
            let (start, end) = (start.index(), end.index());
            let after = covered.partition_point(|&(lo, _)| lo <= start);
            after > 0 && {
                let hi = covered[after - 1].1;
                start < hi && end <= hi
            }
        };

        let generation = self.root.generation.get();
        let dropped: usize = self
            .root
            .caches
            .borrow_mut()
            .values_mut()
            .map(|cache| cache.sweep(generation, &inside_reused))
            .sum();
        debug!(generation, dropped, kept = self.cached_nodes(), "swept parse cache");
        dropped
    }

    /// Forget every cached node.
    pub fn clear_cache(&self) {
        self.root.caches.borrow_mut().clear();
        debug!("cleared parse cache");
    }
}

/// One-shot construction: a fresh parser's snapshot at `lexer`.
pub fn parser_from_lexer<G: Grammar>(
    lexer: &Lexer,
    state: G::State,
    parselet: &'static Parselet<G>,
    skip_tokens: Vec<Token<G::Skip>>,
) -> Snapshot<G> {
    Parser::new(state, parselet, skip_tokens).snapshot(lexer)
}
