//! Pending edit ranges between parses.
//!
//! The log stores, in current document coordinates, the ranges written by
//! edits since the last parse. Recording an edit moves ranges after it by
//! the edit's length change and merges ranges it touches, so the log always
//! describes the current text.

use tracing::trace;

/// A half-open range `[start, end)` of inserted text in current coordinates.
/// Pure deletions are empty ranges at the deletion point.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EditRange {
    pub start: usize,
    pub end: usize,
}

impl EditRange {
    /// Whether `[start, end]` comes within `margin` characters of this range.
    pub fn touches(&self, start: usize, end: usize, margin: usize) -> bool {
        self.start <= end.saturating_add(margin) && self.end.saturating_add(margin) >= start
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EditLog {
    ranges: Vec<EditRange>,
}

/// Move `index` by the change in length of an edit ending at `removed_end`.
fn shift(index: usize, removed_end: usize, inserted_end: usize) -> usize {
    index - removed_end + inserted_end
}

impl EditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `[start, removed_end)` was replaced by `inserted` characters.
    pub fn record(&mut self, start: usize, removed_end: usize, inserted: usize) {
        let inserted_end = start + inserted;
        let mut merged = EditRange {
            start,
            end: inserted_end,
        };

        let mut kept = Vec::with_capacity(self.ranges.len() + 1);
        for range in self.ranges.drain(..) {
            if range.end < start {
                kept.push(range);
            } else if range.start > removed_end {
                kept.push(EditRange {
                    start: shift(range.start, removed_end, inserted_end),
                    end: shift(range.end, removed_end, inserted_end),
                });
            } else {
                merged.start = merged.start.min(range.start);
                if range.end > removed_end {
                    merged.end = merged.end.max(shift(range.end, removed_end, inserted_end));
                }
            }
        }
        kept.push(merged);
        kept.sort_unstable_by_key(|range| range.start);
        self.ranges = kept;
        trace!(start, removed_end, inserted, pending = self.ranges.len(), "recorded edit");
    }

    /// Whether the span `[start, end]` touches any pending edit.
    pub fn overlaps(&self, start: usize, end: usize, margin: usize) -> bool {
        self.ranges.iter().any(|range| range.touches(start, end, margin))
    }

    pub fn ranges(&self) -> &[EditRange] {
        &self.ranges
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn clear(&mut self) {
        self.ranges.clear();
    }
}
