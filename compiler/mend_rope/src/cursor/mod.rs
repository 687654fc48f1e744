//! Edit-stable positions in a rope.
//!
//! A cursor is an anchor slot in the [`Buffer`] arena. The arena moves the
//! anchor whenever the leaf it sits in is split, so a cursor created before an
//! edit still names the same character afterwards.
//!
//! Positions are kept canonical: a cursor sitting at the end of a leaf is
//! moved to the start of the next non-empty leaf. Two cursors at the same
//! logical position of the current document therefore compare equal and
//! produce the same [`CursorKey`].

use std::fmt;

use crate::buffer::{AnchorId, Arena, Buffer, NodeIdx};

/// Hashable identity of a cursor position, valid for one buffer revision.
///
/// Splits can move cursors to new leaves; when [`Buffer::revision`] changes,
/// previously computed keys must be recomputed from their cursors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CursorKey {
    buffer: usize,
    leaf: u32,
    offset: usize,
}

/// An immutable, edit-stable position in a rope.
///
/// Cloning registers a new anchor at the same position. Dropping releases it.
pub struct Cursor {
    buffer: Buffer,
    anchor: AnchorId,
}

/// Advance `(leaf, offset)` past empty tails so the position is canonical.
fn settle(arena: &Arena, mut leaf: NodeIdx, mut offset: usize) -> (NodeIdx, usize) {
    while offset >= arena.len(leaf) {
        match arena.next_leaf(leaf) {
            Some(next) => {
                leaf = next;
                offset = 0;
            }
            None => return (leaf, arena.len(leaf)),
        }
    }
    (leaf, offset)
}

/// Move forward `n` characters, appending what was passed over to `out`.
fn forward(
    arena: &Arena,
    mut leaf: NodeIdx,
    mut offset: usize,
    n: usize,
    mut out: Option<&mut String>,
) -> (NodeIdx, usize) {
    let mut remaining = n;
    loop {
        let text = arena.leaf_text(leaf);
        let take = remaining.min(text.len().saturating_sub(offset));
        if let Some(out) = out.as_deref_mut() {
            out.extend(&text[offset..offset + take]);
        }
        offset += take;
        remaining -= take;
        if remaining == 0 {
            return settle(arena, leaf, offset);
        }
        match arena.next_leaf(leaf) {
            Some(next) => {
                leaf = next;
                offset = 0;
            }
            None => return (leaf, text.len()),
        }
    }
}

/// Move back `n` characters, stopping at the start of the document.
fn backward(arena: &Arena, mut leaf: NodeIdx, mut offset: usize, n: usize) -> (NodeIdx, usize) {
    let mut remaining = n;
    while remaining > 0 {
        if offset >= remaining {
            offset -= remaining;
            remaining = 0;
        } else {
            remaining -= offset;
            match arena.prev_leaf(leaf) {
                Some(prev) => {
                    leaf = prev;
                    offset = arena.len(prev);
                }
                None => {
                    offset = 0;
                    break;
                }
            }
        }
    }
    settle(arena, leaf, offset)
}

impl Cursor {
    /// Anchor a cursor at `offset` within `leaf`, canonicalising the position.
    pub(crate) fn at_leaf(buffer: &Buffer, leaf: NodeIdx, offset: usize) -> Self {
        let (leaf, offset) = settle(&buffer.arena().borrow(), leaf, offset);
        let anchor = buffer.arena().borrow_mut().anchor(leaf, offset);
        Cursor {
            buffer: buffer.clone(),
            anchor,
        }
    }

    fn position(&self) -> (NodeIdx, usize) {
        let arena = self.buffer.arena().borrow();
        let anchor = arena.anchor_of(self.anchor);
        settle(&arena, anchor.leaf, anchor.offset)
    }

    /// The buffer this cursor lives in.
    pub fn buffer(&self) -> &Buffer {
        &self.buffer
    }

    /// Read up to `n` characters, returning them and the cursor past them.
    ///
    /// Reading stops early at the end of the document; the returned string
    /// is then shorter than `n`.
    pub fn read(&self, n: usize) -> (String, Cursor) {
        let (leaf, offset) = self.position();
        let mut out = String::new();
        let (leaf, offset) = forward(&self.buffer.arena().borrow(), leaf, offset, n, Some(&mut out));
        (out, Cursor::at_leaf(&self.buffer, leaf, offset))
    }

    /// A cursor `n` characters back, clamped at the start of the document.
    pub fn prev(&self, n: usize) -> Cursor {
        let (leaf, offset) = self.position();
        let (leaf, offset) = backward(&self.buffer.arena().borrow(), leaf, offset, n);
        Cursor::at_leaf(&self.buffer, leaf, offset)
    }

    /// The character under the cursor, if any.
    pub fn peek(&self) -> Option<char> {
        let (leaf, offset) = self.position();
        self.buffer.arena().borrow().leaf_text(leaf).get(offset).copied()
    }

    /// Absolute character index in the newest document containing this cursor.
    pub fn index(&self) -> usize {
        let (leaf, offset) = self.position();
        self.buffer.arena().borrow().index_of(leaf, offset)
    }

    pub fn is_at_end(&self) -> bool {
        self.peek().is_none()
    }

    /// Whether both cursors sit in the same (newest) document tree.
    ///
    /// False when one of them was cut out by an edit and now belongs to the
    /// removed section.
    pub fn same_document(&self, other: &Cursor) -> bool {
        if !self.buffer.same(&other.buffer) {
            return false;
        }
        let (leaf, _) = self.position();
        let (other_leaf, _) = other.position();
        let arena = self.buffer.arena().borrow();
        arena.root_of(leaf) == arena.root_of(other_leaf)
    }

    pub fn key(&self) -> CursorKey {
        let (leaf, offset) = self.position();
        CursorKey {
            buffer: self.buffer.id(),
            leaf: leaf.raw(),
            offset,
        }
    }

    /// Buffer revision the current [`key`](Self::key) is valid for.
    pub fn revision(&self) -> u64 {
        self.buffer.revision()
    }

    /// A mutable cursor starting at this position.
    pub fn to_mut(&self) -> CursorMut {
        CursorMut {
            cursor: self.clone(),
        }
    }
}

impl Clone for Cursor {
    fn clone(&self) -> Self {
        let (leaf, offset) = self.position();
        let anchor = self.buffer.arena().borrow_mut().anchor(leaf, offset);
        Cursor {
            buffer: self.buffer.clone(),
            anchor,
        }
    }
}

impl Drop for Cursor {
    fn drop(&mut self) {
        if let Ok(mut arena) = self.buffer.arena().try_borrow_mut() {
            arena.release(self.anchor);
        }
    }
}

impl PartialEq for Cursor {
    fn eq(&self, other: &Self) -> bool {
        self.buffer.same(&other.buffer) && self.position() == other.position()
    }
}

impl Eq for Cursor {}

impl fmt::Debug for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.buffer.arena().try_borrow() {
            Ok(arena) => {
                let anchor = arena.anchor_of(self.anchor);
                let (leaf, offset) = settle(&arena, anchor.leaf, anchor.offset);
                f.debug_struct("Cursor")
                    .field("index", &arena.index_of(leaf, offset))
                    .field("leaf", &leaf.raw())
                    .field("offset", &offset)
                    .finish()
            }
            Err(_) => f.write_str("Cursor { <borrowed> }"),
        }
    }
}

/// A cursor that moves in place.
///
/// Used by lexers that consume input character by character without
/// allocating a new anchor per step.
#[derive(Clone, PartialEq, Eq)]
pub struct CursorMut {
    cursor: Cursor,
}

impl CursorMut {
    fn seat(&mut self, leaf: NodeIdx, offset: usize) {
        self.cursor
            .buffer
            .arena()
            .borrow_mut()
            .move_anchor(self.cursor.anchor, leaf, offset);
    }

    /// Read up to `n` characters and move past them.
    pub fn read(&mut self, n: usize) -> String {
        let (leaf, offset) = self.cursor.position();
        let mut out = String::new();
        let (leaf, offset) = forward(
            &self.cursor.buffer.arena().borrow(),
            leaf,
            offset,
            n,
            Some(&mut out),
        );
        self.seat(leaf, offset);
        out
    }

    /// Consume a single character.
    pub fn next_char(&mut self) -> Option<char> {
        let c = self.cursor.peek()?;
        let (leaf, offset) = self.cursor.position();
        let (leaf, offset) = forward(&self.cursor.buffer.arena().borrow(), leaf, offset, 1, None);
        self.seat(leaf, offset);
        Some(c)
    }

    /// Move back `n` characters, clamped at the start of the document.
    pub fn prev(&mut self, n: usize) {
        let (leaf, offset) = self.cursor.position();
        let (leaf, offset) = backward(&self.cursor.buffer.arena().borrow(), leaf, offset, n);
        self.seat(leaf, offset);
    }

    pub fn peek(&self) -> Option<char> {
        self.cursor.peek()
    }

    pub fn index(&self) -> usize {
        self.cursor.index()
    }

    pub fn is_at_end(&self) -> bool {
        self.cursor.is_at_end()
    }

    /// Borrow the current position as an immutable cursor.
    pub fn as_cursor(&self) -> &Cursor {
        &self.cursor
    }

    /// Freeze into an immutable cursor.
    pub fn into_cursor(self) -> Cursor {
        self.cursor
    }
}

impl fmt::Debug for CursorMut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CursorMut").field(&self.cursor).finish()
    }
}
