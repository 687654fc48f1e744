//! Grammar definition and positioned parse results.

use std::fmt;
use std::ops::Deref;
use std::rc::Rc;

use mend_rope::Cursor;
use smallvec::SmallVec;

use crate::Fault;

/// Types and failure conversions of one grammar.
///
/// The implementing type is a marker; it is never instantiated. Its
/// associated types describe what rules produce ([`Node`](Self::Node)),
/// what state they are seeded with ([`State`](Self::State)) and what skip
/// tokens yield ([`Skip`](Self::Skip)).
pub trait Grammar: Sized + 'static {
    /// The grammar's node type, including its error variant.
    type Node: Clone + fmt::Debug;
    /// Parse state passed to rules. Hashed and compared by each parselet.
    type State: Clone + fmt::Debug;
    /// Value produced by skip tokens (whitespace, comments).
    type Skip: Clone + fmt::Debug;

    /// Error node for a grammar failure with a message.
    fn error_message(message: String) -> Self::Node;

    /// Error node for a token that failed without a message.
    fn lexer_error(position: usize) -> Self::Node;

    /// Error node for a panic, a foreign error or a depth overflow.
    fn unhandled_error(fault: &Fault) -> Self::Node;

    /// Whether `node` is an error node.
    fn is_error(node: &Self::Node) -> bool;
}

/// Identifier of a parse node, unique within one [`Parser`](crate::Parser).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    pub(crate) fn new(raw: u64) -> Self {
        NodeId(raw)
    }

    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Skip-token values collected next to a node.
pub type Skipped<G> = SmallVec<[<G as Grammar>::Skip; 2]>;

/// A parse node with its position in the document.
///
/// `start` is where the rule was invoked, before leading skip tokens; `end`
/// is past trailing skip tokens. Both are edit-stable cursors.
pub struct Spanned<G: Grammar> {
    pub node: G::Node,
    pub start: Cursor,
    pub end: Cursor,
    /// Characters consumed, skip tokens included.
    pub len: usize,
    pub id: NodeId,
    pub skipped_before: Skipped<G>,
    pub skipped_after: Skipped<G>,
}

/// Shared handle to a parse node. Cache hits hand out the same handle.
pub type Parsed<G> = Rc<Spanned<G>>;

impl<G: Grammar> Spanned<G> {
    /// Whether the node is an error node.
    pub fn is_error(&self) -> bool {
        G::is_error(&self.node)
    }

    /// Current `[start, end)` character range of the node.
    pub fn range(&self) -> (usize, usize) {
        (self.start.index(), self.end.index())
    }
}

impl<G: Grammar> Deref for Spanned<G> {
    type Target = G::Node;

    fn deref(&self) -> &G::Node {
        &self.node
    }
}

/// Structural equality: node content and length. Ids, cursors and skip
/// values are bookkeeping and do not take part.
impl<G: Grammar> PartialEq for Spanned<G>
where
    G::Node: PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.node == other.node
    }
}

impl<G: Grammar> fmt::Debug for Spanned<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Spanned")
            .field("node", &self.node)
            .field("start", &self.start)
            .field("len", &self.len)
            .field("id", &self.id)
            .field("skipped_before", &self.skipped_before)
            .field("skipped_after", &self.skipped_after)
            .finish_non_exhaustive()
    }
}
