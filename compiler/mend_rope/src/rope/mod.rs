//! Rope handles and the range-replace edit.

use std::fmt;

use tracing::debug;

use crate::buffer::{Buffer, NodeIdx};
use crate::{Cursor, RopeError};

/// A persistent text sequence stored in a [`Buffer`].
///
/// Cloning a rope copies a handle, not text. Operations return new ropes and
/// leave `self` readable.
#[derive(Clone)]
pub struct Rope {
    buffer: Buffer,
    root: NodeIdx,
}

/// Result of [`replace`].
#[derive(Clone, Debug)]
pub struct Replaced {
    /// The document after the edit.
    pub replaced: Rope,
    /// The characters that were cut out.
    pub removed: Rope,
}

impl Rope {
    /// A rope holding `text` in a fresh buffer.
    pub fn new(text: &str) -> Self {
        Buffer::new().rope(text)
    }

    pub(crate) fn from_root(buffer: Buffer, root: NodeIdx) -> Self {
        Rope { buffer, root }
    }

    pub fn buffer(&self) -> &Buffer {
        &self.buffer
    }

    pub fn len(&self) -> usize {
        self.buffer.arena().borrow().len(self.root)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The full text, concatenated from the leaves.
    pub fn text(&self) -> String {
        let mut out = String::with_capacity(self.len());
        self.buffer.arena().borrow().collect(self.root, &mut out);
        out
    }

    /// Character at `index`, or `None` past the end.
    pub fn at(&self, index: usize) -> Option<char> {
        self.buffer.arena().borrow().at(self.root, index)
    }

    /// Text of each leaf, left to right.
    pub fn leaves(&self) -> Vec<String> {
        let arena = self.buffer.arena().borrow();
        arena
            .leaves(self.root)
            .into_iter()
            .map(|leaf| arena.leaf_text(leaf).iter().collect())
            .collect()
    }

    /// Split into `[0, index)` and `[index, len)`.
    ///
    /// Cursors inside the split leaf move to whichever half now holds their
    /// character. Both halves become standalone roots.
    ///
    /// A superseded version (one whose nodes a newer rope has taken over) is
    /// split from a copy of its text, so the newer rope's cursors and links
    /// are left alone.
    pub fn split(&self, index: usize) -> Result<(Rope, Rope), RopeError> {
        let len = self.len();
        if index > len {
            return Err(RopeError::OutOfBounds { index, len });
        }
        let owned = self.buffer.arena().borrow().owns_path(self.root, index);
        if !owned {
            debug!(index, len, "splitting a copy of a superseded rope");
            return self.buffer.rope(&self.text()).split(index);
        }
        let (left, right) = if index == 0 {
            (self.buffer.rope("").root, self.root)
        } else if index == len {
            (self.root, self.buffer.rope("").root)
        } else {
            self.buffer.arena().borrow_mut().split(self.root, index)
        };
        let mut arena = self.buffer.arena().borrow_mut();
        arena.set_parent(left, None);
        arena.set_parent(right, None);
        drop(arena);
        Ok((
            Rope::from_root(self.buffer.clone(), left),
            Rope::from_root(self.buffer.clone(), right),
        ))
    }

    /// `self` followed by `other`.
    ///
    /// Ropes from the same buffer are joined under a new branch without
    /// copying. Text from a foreign buffer is copied into this one.
    pub fn concat(&self, other: &Rope) -> Rope {
        let other = self.adopt(other);
        if other.is_empty() {
            return self.clone();
        }
        if self.is_empty() {
            return other;
        }
        let root = self.buffer.arena().borrow_mut().branch(self.root, other.root);
        Rope::from_root(self.buffer.clone(), root)
    }

    /// `other` as a rope of this buffer that can be placed next to `self`.
    fn adopt(&self, other: &Rope) -> Rope {
        if self.buffer.same(&other.buffer) && self.root != other.root {
            other.clone()
        } else {
            self.buffer.rope(&other.text())
        }
    }

    /// A cursor at the first character.
    pub fn start(&self) -> Cursor {
        let (leaf, offset) = self.buffer.arena().borrow().locate(self.root, 0);
        Cursor::at_leaf(&self.buffer, leaf, offset)
    }

    /// A cursor at `index`. `index == len` gives the end-of-document cursor.
    pub fn cursor(&self, index: usize) -> Result<Cursor, RopeError> {
        let len = self.len();
        if index > len {
            return Err(RopeError::OutOfBounds { index, len });
        }
        let (leaf, offset) = self.buffer.arena().borrow().locate(self.root, index);
        Ok(Cursor::at_leaf(&self.buffer, leaf, offset))
    }
}

impl fmt::Display for Rope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}

impl fmt::Debug for Rope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Rope").field(&self.text()).finish()
    }
}

/// Replace the characters in `[start, end)` of `rope` with `replacement`.
///
/// Cursors into `rope` outside the range keep pointing at their character in
/// the new document. Cursors inside the removed range follow the removed
/// rope.
pub fn replace(
    rope: &Rope,
    start: usize,
    end: usize,
    replacement: &Rope,
) -> Result<Replaced, RopeError> {
    if start > end {
        return Err(RopeError::InvertedRange { start, end });
    }
    let len = rope.len();
    if end > len {
        return Err(RopeError::OutOfBounds { index: end, len });
    }
    let (left, rest) = rope.split(start)?;
    let (removed, right) = rest.split(end - start)?;
    let replaced = left.concat(replacement).concat(&right);
    debug!(
        start,
        end,
        inserted = replacement.len(),
        len = replaced.len(),
        "replaced rope range"
    );
    Ok(Replaced { replaced, removed })
}
