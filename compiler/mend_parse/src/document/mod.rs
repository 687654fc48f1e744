//! A living document: text, parser and pending edits kept together.

use mend_rope::{replace, Buffer, Cursor, Rope, RopeError};
use tracing::debug;

use crate::{EditLog, EditRange, Grammar, Lexer, Parsed, Parser};

/// An editable text that re-parses incrementally.
///
/// Edits go through [`replace`](Self::replace), which updates the rope and
/// records the touched range. [`parse`](Self::parse) then re-runs the
/// parser, reusing every cached node that does not touch a recorded range.
pub struct Document<G: Grammar> {
    buffer: Buffer,
    rope: Rope,
    parser: Parser<G>,
    edits: EditLog,
    tree: Option<Parsed<G>>,
}

impl<G: Grammar> Document<G> {
    pub fn new(text: &str, parser: Parser<G>) -> Self {
        let buffer = Buffer::new();
        let rope = buffer.rope(text);
        Document {
            buffer,
            rope,
            parser,
            edits: EditLog::new(),
            tree: None,
        }
    }

    /// Replace `[start, end)` with `text`. Returns the removed text.
    pub fn replace(&mut self, start: usize, end: usize, text: &str) -> Result<String, RopeError> {
        let insertion = self.buffer.rope(text);
        let edit = replace(&self.rope, start, end, &insertion)?;
        self.edits.record(start, end, insertion.len());
        self.rope = edit.replaced;
        debug!(start, end, inserted = insertion.len(), "document edited");
        Ok(edit.removed.text())
    }

    /// Parse the current text, reusing cached nodes away from pending edits.
    ///
    /// Cached nodes touching a pending edit, or cut out of the text by one,
    /// are evicted first, so nodes the new parse does not visit cannot
    /// resurface after the log is cleared. Afterwards the cache is swept down
    /// to the nodes this parse reached, which keeps it proportional to the
    /// current text.
    pub fn parse(&mut self) -> Parsed<G> {
        let margin = self.parser.config().edit_margin;
        let edits = &self.edits;
        let in_range =
            move |start: &Cursor, end: &Cursor| edits.overlaps(start.index(), end.index(), margin);

        if !self.edits.is_empty() {
            let origin = self.rope.start();
            self.parser
                .evict(&|start, end| !start.same_document(&origin) || in_range(start, end));
        }
        self.parser.begin_sweep();
        let tree = self
            .parser
            .snapshot(&Lexer::from_rope(&self.rope))
            .exec(&in_range);
        self.parser.sweep();
        self.edits.clear();
        self.tree = Some(tree.clone());
        tree
    }

    /// Move the text into a fresh buffer, releasing the rope nodes earlier
    /// edits left behind. The cache is cleared, so the next parse starts
    /// over.
    pub fn compact(&mut self) {
        let text = self.rope.text();
        let before = self.buffer.node_count();
        self.buffer = Buffer::new();
        self.rope = self.buffer.rope(&text);
        self.parser.clear_cache();
        self.edits.clear();
        self.tree = None;
        debug!(before, len = text.chars().count(), "document compacted");
    }

    pub fn text(&self) -> String {
        self.rope.text()
    }

    pub fn rope(&self) -> &Rope {
        &self.rope
    }

    /// The tree of the last [`parse`](Self::parse), if any.
    pub fn tree(&self) -> Option<&Parsed<G>> {
        self.tree.as_ref()
    }

    /// Ranges edited since the last parse.
    pub fn pending_edits(&self) -> &[EditRange] {
        self.edits.ranges()
    }

    pub fn parser(&self) -> &Parser<G> {
        &self.parser
    }
}
