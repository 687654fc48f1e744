//! Memoized rule results.
//!
//! Each parselet owns one [`MemoCache`] per parser. The cache is a hash table
//! over parse states with chained buckets: `hash` picks the chain, `eq`
//! picks the bucket within it. A bucket maps a start position to the node
//! the rule produced there and the cursor just past it.
//!
//! Positions are stored as edit-stable cursors and indexed by
//! [`CursorKey`]. Splitting a leaf moves cursors to new leaves and bumps the
//! buffer revision; a bucket indexed under an older revision rebuilds its key
//! index from the stored cursors before answering.
//!
//! Entries carry the generation that last stored or reused them. A sweep
//! drops entries older than the current generation, so states keyed by nodes
//! that later parses replaced do not pile up.

use mend_rope::{Cursor, CursorKey};
use rustc_hash::FxHashMap;

use crate::{Grammar, Parselet, Parsed};

/// Reuse counters of one parser.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Cached nodes reused verbatim.
    pub hits: usize,
    /// Rule invocations with no cached node at their position.
    pub misses: usize,
    /// Cached nodes discarded because they overlapped an edit.
    pub invalidations: usize,
}

impl CacheStats {
    /// Rule bodies actually executed.
    pub fn executions(&self) -> usize {
        self.misses + self.invalidations
    }
}

struct Entry<G: Grammar> {
    start: Cursor,
    node: Parsed<G>,
    end: Cursor,
    generation: u64,
}

struct Bucket<G: Grammar> {
    state: G::State,
    revision: u64,
    index: FxHashMap<CursorKey, usize>,
    entries: Vec<Option<Entry<G>>>,
    free: Vec<usize>,
}

impl<G: Grammar> Bucket<G> {
    fn new(state: G::State, revision: u64) -> Self {
        Bucket {
            state,
            revision,
            index: FxHashMap::default(),
            entries: Vec::new(),
            free: Vec::new(),
        }
    }

    /// Rebuild the key index if cursors may have moved since it was built.
    fn refresh(&mut self, revision: u64) {
        if self.revision == revision {
            return;
        }
        self.revision = revision;
        self.index.clear();
        for (slot, entry) in self.entries.iter().enumerate() {
            if let Some(entry) = entry {
                self.index.insert(entry.start.key(), slot);
            }
        }
    }

    fn slot(&mut self, start: &Cursor) -> Option<usize> {
        self.refresh(start.revision());
        let slot = *self.index.get(&start.key())?;
        match &self.entries[slot] {
            Some(entry) if entry.start == *start => Some(slot),
            _ => None,
        }
    }
}

/// Cached results of one parselet.
pub(crate) struct MemoCache<G: Grammar> {
    chains: FxHashMap<u64, Vec<Bucket<G>>>,
}

impl<G: Grammar> Default for MemoCache<G> {
    fn default() -> Self {
        MemoCache {
            chains: FxHashMap::default(),
        }
    }
}

impl<G: Grammar> MemoCache<G> {
    fn bucket(&mut self, parselet: &Parselet<G>, state: &G::State) -> Option<&mut Bucket<G>> {
        let hash = (parselet.hash)(state);
        self.chains
            .get_mut(&hash)?
            .iter_mut()
            .find(|bucket| (parselet.eq)(&bucket.state, state))
    }

    /// The node cached for `state` at `start`, with its end cursor.
    ///
    /// A found entry is stamped with `generation`.
    pub(crate) fn get(
        &mut self,
        parselet: &Parselet<G>,
        state: &G::State,
        start: &Cursor,
        generation: u64,
    ) -> Option<(Parsed<G>, Cursor)> {
        let bucket = self.bucket(parselet, state)?;
        let slot = bucket.slot(start)?;
        let entry = bucket.entries[slot].as_mut()?;
        entry.generation = generation;
        Some((entry.node.clone(), entry.end.clone()))
    }

    /// Drop the node cached for `state` at `start`. Returns whether one existed.
    pub(crate) fn remove(
        &mut self,
        parselet: &Parselet<G>,
        state: &G::State,
        start: &Cursor,
    ) -> bool {
        let Some(bucket) = self.bucket(parselet, state) else {
            return false;
        };
        let Some(slot) = bucket.slot(start) else {
            return false;
        };
        bucket.index.remove(&start.key());
        bucket.entries[slot] = None;
        bucket.free.push(slot);
        true
    }

    /// Cache `node` for `state` at `start`, replacing any previous entry.
    pub(crate) fn insert(
        &mut self,
        parselet: &Parselet<G>,
        state: G::State,
        start: Cursor,
        node: Parsed<G>,
        end: Cursor,
        generation: u64,
    ) {
        let revision = start.revision();
        let hash = (parselet.hash)(&state);
        let chain = self.chains.entry(hash).or_default();
        let position = match chain
            .iter()
            .position(|bucket| (parselet.eq)(&bucket.state, &state))
        {
            Some(position) => position,
            None => {
                chain.push(Bucket::new(state, revision));
                chain.len() - 1
            }
        };
        let bucket = &mut chain[position];
        bucket.refresh(revision);

        let key = start.key();
        let entry = Some(Entry {
            start,
            node,
            end,
            generation,
        });
        if let Some(&slot) = bucket.index.get(&key) {
            bucket.entries[slot] = entry;
        } else if let Some(slot) = bucket.free.pop() {
            bucket.entries[slot] = entry;
            bucket.index.insert(key, slot);
        } else {
            bucket.entries.push(entry);
            bucket.index.insert(key, bucket.entries.len() - 1);
        }
    }

    /// Drop every entry whose span `is_stale` flags. Returns how many.
    pub(crate) fn evict(&mut self, is_stale: &dyn Fn(&Cursor, &Cursor) -> bool) -> usize {
        self.drop_where(|entry| is_stale(&entry.start, &entry.end))
    }

    /// Drop entries not stamped with `generation`, except those whose span
    /// `keep` accepts. Returns how many were dropped.
    pub(crate) fn sweep(
        &mut self,
        generation: u64,
        keep: &dyn Fn(&Cursor, &Cursor) -> bool,
    ) -> usize {
        self.drop_where(|entry| entry.generation != generation && !keep(&entry.start, &entry.end))
    }

    /// Drop matching entries, then buckets and chains left empty. An empty
    /// bucket still owns its state and the nodes that state refers to.
    fn drop_where(&mut self, mut doomed: impl FnMut(&Entry<G>) -> bool) -> usize {
        let mut dropped = 0;
        for bucket in self.chains.values_mut().flatten() {
            for (slot, entry) in bucket.entries.iter_mut().enumerate() {
                if entry.as_ref().is_some_and(&mut doomed) {
                    *entry = None;
                    bucket.free.push(slot);
                    dropped += 1;
                }
            }
            let entries = &bucket.entries;
            bucket.index.retain(|_, slot| entries[*slot].is_some());
        }
        for chain in self.chains.values_mut() {
            chain.retain(|bucket| bucket.entries.iter().any(Option::is_some));
        }
        self.chains.retain(|_, chain| !chain.is_empty());
        dropped
    }

    /// Number of live entries across all states.
    pub(crate) fn len(&self) -> usize {
        self.chains
            .values()
            .flatten()
            .map(|bucket| bucket.entries.iter().flatten().count())
            .sum()
    }
}
