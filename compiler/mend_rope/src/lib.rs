//! Persistent rope buffer for incremental parsing.
//!
//! A [`Rope`] is a binary tree of text chunks living in a shared [`Buffer`]
//! arena. Concatenation is O(1) and never copies leaf text; splitting copies
//! at most one leaf. Every edit builds new branches instead of mutating the
//! old ones, so an older [`Rope`] handle keeps reading its own text.
//!
//! # Cursors
//!
//! A [`Cursor`] names a leaf and an offset inside it. Leaves remember the
//! cursors anchored to them (by arena slot id, never by ownership), so when a
//! leaf is split the cursors inside it are moved to the matching half. A
//! cursor therefore keeps pointing at the same character after the document
//! around it was edited, which is what lets cached parse results be found
//! again after a [`replace`].
//!
//! Dropping a cursor frees its anchor slot.
//!
//! # Units
//!
//! All indices and lengths count Unicode scalar values (`char`s), not bytes.

mod buffer;
mod cursor;
mod rope;

pub use buffer::Buffer;
pub use cursor::{Cursor, CursorKey, CursorMut};
pub use rope::{replace, Replaced, Rope};

/// Errors produced by rope operations given an invalid index or range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RopeError {
    /// An index past the end of the rope.
    #[error("index {index} is out of bounds for a rope of length {len}")]
    OutOfBounds { index: usize, len: usize },
    /// A range whose start lies after its end.
    #[error("range start {start} is past its end {end}")]
    InvertedRange { start: usize, end: usize },
}
