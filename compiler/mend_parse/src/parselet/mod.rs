//! Parselets: named grammar rules.

use std::fmt;
use std::hash::{Hash, Hasher};

use rustc_hash::FxHasher;

use crate::{Abort, Grammar, Rule};

/// Body of a rule: builds a node from the input through the [`Rule`] facade.
pub type RuleFn<G> = fn(&mut Rule<'_, G>) -> Result<<G as Grammar>::Node, Abort>;

/// Hash of a parse state, used to bucket cache entries.
pub type StateHashFn<G> = fn(&<G as Grammar>::State) -> u64;

/// Equality of parse states, used within a cache bucket.
pub type StateEqFn<G> = fn(&<G as Grammar>::State, &<G as Grammar>::State) -> bool;

/// A named grammar rule.
///
/// Parselets are plain data built by a `const fn`, so rules that refer to
/// each other can be declared as `static`s:
///
/// ```ignore
/// static EXPR: Parselet<Calc> = Parselet::new("expr", expr, hash_state, eq_state);
/// ```
///
/// A parselet is identified by its address; each `static` gets its own
/// memo cache.
pub struct Parselet<G: Grammar> {
    pub name: &'static str,
    pub body: RuleFn<G>,
    pub hash: StateHashFn<G>,
    pub eq: StateEqFn<G>,
}

impl<G: Grammar> Parselet<G> {
    pub const fn new(
        name: &'static str,
        body: RuleFn<G>,
        hash: StateHashFn<G>,
        eq: StateEqFn<G>,
    ) -> Self {
        Parselet {
            name,
            body,
            hash,
            eq,
        }
    }

    pub(crate) fn key(&'static self) -> ParseletKey {
        ParseletKey(std::ptr::from_ref(self) as usize)
    }
}

impl<G: Grammar> fmt::Debug for Parselet<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Parselet").field(&self.name).finish()
    }
}

/// Identity of a parselet inside the parser's cache table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct ParseletKey(usize);

/// Hash any `Hash` state with `FxHasher`. Suitable as a parselet's `hash`.
pub fn hash_state<S: Hash>(state: &S) -> u64 {
    let mut hasher = FxHasher::default();
    state.hash(&mut hasher);
    hasher.finish()
}

/// Compare states with `PartialEq`. Suitable as a parselet's `eq`.
pub fn eq_state<S: PartialEq>(a: &S, b: &S) -> bool {
    a == b
}
