//! Node and anchor storage shared by every rope of one document.
//!
//! Nodes are never freed: old ropes stay readable after an edit and still
//! point into the same arena. Each edit allocates a few leaves and one branch
//! per level it rebuilds, so a buffer grows with its edit history.
//! Long-lived owners bound that growth by moving the text into a fresh
//! buffer once in a while. Anchors (the storage behind cursors) live in a
//! slot table with a free list and are released when their cursor drops.
//!
//! # Parent links
//!
//! Each node records the branch that most recently adopted it. Ropes are
//! persistent, so an old branch may still list a node as its child after a
//! newer branch took it over; walking parents always follows the newest
//! tree. Cursor indices and leaf-to-leaf navigation are therefore resolved
//! against the latest document containing the leaf.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use smallvec::SmallVec;
use tracing::trace;

use crate::Rope;

/// Index of a node inside the arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct NodeIdx(u32);

impl NodeIdx {
    #[inline]
    pub(crate) fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    fn slot(self) -> usize {
        self.0 as usize
    }
}

/// Slot id of a cursor anchor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct AnchorId(u32);

impl AnchorId {
    #[inline]
    fn slot(self) -> usize {
        self.0 as usize
    }
}

/// Where an anchor currently sits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Anchor {
    pub(crate) leaf: NodeIdx,
    pub(crate) offset: usize,
}

/// Leaf anchor lists are compacted once they reach this length.
const ANCHOR_COMPACT_THRESHOLD: usize = 8;

struct Leaf {
    text: Box<[char]>,
    parent: Option<NodeIdx>,
    /// Anchors registered on this leaf. May contain stale ids (released or
    /// moved elsewhere); the slot table is the source of truth.
    anchors: SmallVec<[AnchorId; 4]>,
}

struct Branch {
    left: NodeIdx,
    right: NodeIdx,
    /// Character count of the left subtree.
    count_to_left: usize,
    len: usize,
    parent: Option<NodeIdx>,
}

enum Node {
    Leaf(Leaf),
    Branch(Branch),
}

#[derive(Clone, Copy)]
enum Side {
    Left,
    Right,
}

#[derive(Default)]
pub(crate) struct Arena {
    nodes: Vec<Node>,
    anchors: Vec<Option<Anchor>>,
    free: Vec<AnchorId>,
    /// Bumped whenever an anchor is moved to a different leaf by a split.
    revision: u64,
}

/// The id of the next slot in a table of `len` entries.
///
/// # Panics
///
/// Panics once a buffer holds `u32::MAX` nodes or anchors; ids past that
/// would alias existing ones.
fn next_id(len: usize, table: &str) -> u32 {
    u32::try_from(len)
        .ok()
        .filter(|&id| id < u32::MAX)
        .unwrap_or_else(|| panic!("rope buffer exhausted its {table} ids"))
}

impl Arena {
    fn push(&mut self, node: Node) -> NodeIdx {
        let idx = NodeIdx(next_id(self.nodes.len(), "node"));
        self.nodes.push(node);
        idx
    }

    pub(crate) fn leaf(&mut self, text: Box<[char]>) -> NodeIdx {
        self.push(Node::Leaf(Leaf {
            text,
            parent: None,
            anchors: SmallVec::new(),
        }))
    }

    /// Create a branch over two subtrees and make it their parent.
    pub(crate) fn branch(&mut self, left: NodeIdx, right: NodeIdx) -> NodeIdx {
        let count_to_left = self.len(left);
        let len = count_to_left + self.len(right);
        let idx = self.push(Node::Branch(Branch {
            left,
            right,
            count_to_left,
            len,
            parent: None,
        }));
        self.set_parent(left, Some(idx));
        self.set_parent(right, Some(idx));
        idx
    }

    pub(crate) fn len(&self, idx: NodeIdx) -> usize {
        match &self.nodes[idx.slot()] {
            Node::Leaf(leaf) => leaf.text.len(),
            Node::Branch(branch) => branch.len,
        }
    }

    pub(crate) fn parent(&self, idx: NodeIdx) -> Option<NodeIdx> {
        match &self.nodes[idx.slot()] {
            Node::Leaf(leaf) => leaf.parent,
            Node::Branch(branch) => branch.parent,
        }
    }

    pub(crate) fn set_parent(&mut self, idx: NodeIdx, parent: Option<NodeIdx>) {
        match &mut self.nodes[idx.slot()] {
            Node::Leaf(leaf) => leaf.parent = parent,
            Node::Branch(branch) => branch.parent = parent,
        }
    }

    pub(crate) fn is_leaf(&self, idx: NodeIdx) -> bool {
        matches!(self.nodes[idx.slot()], Node::Leaf(_))
    }

    pub(crate) fn leaf_text(&self, idx: NodeIdx) -> &[char] {
        match &self.nodes[idx.slot()] {
            Node::Leaf(leaf) => &leaf.text,
            Node::Branch(_) => &[],
        }
    }

    /// Character at `index` within the subtree rooted at `idx`.
    pub(crate) fn at(&self, idx: NodeIdx, index: usize) -> Option<char> {
        let (leaf, offset) = self.locate(idx, index);
        self.leaf_text(leaf).get(offset).copied()
    }

    /// Leaf and offset for a logical index, descending by `count_to_left`.
    ///
    /// An index equal to the subtree length lands at the end of the last leaf.
    pub(crate) fn locate(&self, idx: NodeIdx, mut index: usize) -> (NodeIdx, usize) {
        let mut node = idx;
        loop {
            match &self.nodes[node.slot()] {
                Node::Leaf(_) => return (node, index),
                Node::Branch(branch) => {
                    if index < branch.count_to_left {
                        node = branch.left;
                    } else {
                        index -= branch.count_to_left;
                        node = branch.right;
                    }
                }
            }
        }
    }

    /// Leaf text of the subtree rooted at `idx`, left to right.
    pub(crate) fn collect(&self, idx: NodeIdx, out: &mut String) {
        let mut stack = vec![idx];
        while let Some(node) = stack.pop() {
            match &self.nodes[node.slot()] {
                Node::Leaf(leaf) => out.extend(leaf.text.iter()),
                Node::Branch(branch) => {
                    stack.push(branch.right);
                    stack.push(branch.left);
                }
            }
        }
    }

    /// Leaves of the subtree rooted at `idx`, left to right.
    pub(crate) fn leaves(&self, idx: NodeIdx) -> Vec<NodeIdx> {
        let mut leaves = Vec::new();
        let mut stack = vec![idx];
        while let Some(node) = stack.pop() {
            match &self.nodes[node.slot()] {
                Node::Leaf(_) => leaves.push(node),
                Node::Branch(branch) => {
                    stack.push(branch.right);
                    stack.push(branch.left);
                }
            }
        }
        leaves
    }

    /// Split the subtree at `idx` so the left part holds `index` characters.
    ///
    /// `index` must not exceed the subtree length. Branches are rebuilt along
    /// the path to the split point; the leaf at the split point is replaced by
    /// two new leaves and its anchors are re-seated.
    pub(crate) fn split(&mut self, idx: NodeIdx, index: usize) -> (NodeIdx, NodeIdx) {
        let mut path: Vec<(NodeIdx, Side)> = Vec::new();
        let mut node = idx;
        let mut index = index;

        let (mut left, mut right) = loop {
            if self.is_leaf(node) {
                break self.split_leaf(node, index);
            }
            let (branch_left, branch_right) = self.children(node);
            let count_to_left = self.len(branch_left);
            if index < count_to_left {
                path.push((node, Side::Left));
                node = branch_left;
            } else if index > count_to_left {
                path.push((node, Side::Right));
                index -= count_to_left;
                node = branch_right;
            } else {
                break (branch_left, branch_right);
            }
        };

        while let Some((branch, side)) = path.pop() {
            let (branch_left, branch_right) = self.children(branch);
            match side {
                Side::Left => right = self.branch(right, branch_right),
                Side::Right => left = self.branch(branch_left, left),
            }
        }

        (left, right)
    }

    /// Whether `root` is the newest owner of every node a split at `index`
    /// would relink or re-seat cursors on.
    ///
    /// False for a superseded version: a root adopted by a newer branch, or a
    /// path where a newer tree took over a child.
    pub(crate) fn owns_path(&self, root: NodeIdx, mut index: usize) -> bool {
        if self.parent(root).is_some() {
            return false;
        }
        let mut node = root;
        while let Node::Branch(branch) = &self.nodes[node.slot()] {
            if self.parent(branch.left) != Some(node) || self.parent(branch.right) != Some(node) {
                return false;
            }
            if index < branch.count_to_left {
                node = branch.left;
            } else if index > branch.count_to_left {
                index -= branch.count_to_left;
                node = branch.right;
            } else {
                break;
            }
        }
        true
    }

    fn children(&self, idx: NodeIdx) -> (NodeIdx, NodeIdx) {
        match &self.nodes[idx.slot()] {
            Node::Branch(branch) => (branch.left, branch.right),
            Node::Leaf(_) => (idx, idx),
        }
    }

    fn split_leaf(&mut self, idx: NodeIdx, at: usize) -> (NodeIdx, NodeIdx) {
        let (head, tail, anchors) = match &mut self.nodes[idx.slot()] {
            Node::Leaf(leaf) => {
                let at = at.min(leaf.text.len());
                (
                    Box::<[char]>::from(&leaf.text[..at]),
                    Box::<[char]>::from(&leaf.text[at..]),
                    std::mem::take(&mut leaf.anchors),
                )
            }
            Node::Branch(_) => return (idx, idx),
        };
        let left = self.leaf(head);
        let right = self.leaf(tail);

        let mut moved = 0usize;
        for id in anchors {
            let Some(anchor) = self.anchors[id.slot()].as_mut() else {
                continue;
            };
            if anchor.leaf != idx {
                continue;
            }
            let target = if anchor.offset < at {
                left
            } else {
                anchor.offset -= at;
                right
            };
            anchor.leaf = target;
            if let Node::Leaf(leaf) = &mut self.nodes[target.slot()] {
                leaf.anchors.push(id);
            }
            moved += 1;
        }

        if moved > 0 {
            self.revision += 1;
            trace!(leaf = idx.raw(), at, moved, "re-seated cursors after leaf split");
        }
        (left, right)
    }

    /// The leaf following `leaf` in document order.
    ///
    /// Walks up until the node is a left child, then down the leftmost path
    /// of the right sibling.
    pub(crate) fn next_leaf(&self, leaf: NodeIdx) -> Option<NodeIdx> {
        let mut node = leaf;
        loop {
            let parent = self.parent(node)?;
            let (left, right) = self.children(parent);
            if right == node && left != node {
                node = parent;
                continue;
            }
            let mut next = right;
            while let Node::Branch(branch) = &self.nodes[next.slot()] {
                next = branch.left;
            }
            return Some(next);
        }
    }

    /// The leaf preceding `leaf` in document order.
    pub(crate) fn prev_leaf(&self, leaf: NodeIdx) -> Option<NodeIdx> {
        let mut node = leaf;
        loop {
            let parent = self.parent(node)?;
            let (left, right) = self.children(parent);
            if left == node && right != node {
                node = parent;
                continue;
            }
            let mut prev = left;
            while let Node::Branch(branch) = &self.nodes[prev.slot()] {
                prev = branch.right;
            }
            return Some(prev);
        }
    }

    /// Absolute index of `offset` within `leaf`, following parent links.
    pub(crate) fn index_of(&self, leaf: NodeIdx, offset: usize) -> usize {
        let mut index = offset;
        let mut node = leaf;
        while let Some(parent) = self.parent(node) {
            if let Node::Branch(branch) = &self.nodes[parent.slot()] {
                if branch.right == node {
                    index += branch.count_to_left;
                }
            }
            node = parent;
        }
        index
    }

    /// Topmost ancestor of `node` along parent links.
    pub(crate) fn root_of(&self, node: NodeIdx) -> NodeIdx {
        let mut node = node;
        while let Some(parent) = self.parent(node) {
            node = parent;
        }
        node
    }

    /// Register a new anchor on `leaf`.
    pub(crate) fn anchor(&mut self, leaf: NodeIdx, offset: usize) -> AnchorId {
        let anchor = Anchor { leaf, offset };
        let id = if let Some(id) = self.free.pop() {
            self.anchors[id.slot()] = Some(anchor);
            id
        } else {
            let id = AnchorId(next_id(self.anchors.len(), "anchor"));
            self.anchors.push(Some(anchor));
            id
        };
        self.attach(id, leaf);
        id
    }

    fn attach(&mut self, id: AnchorId, leaf: NodeIdx) {
        let anchors = &self.anchors;
        if let Node::Leaf(node) = &mut self.nodes[leaf.slot()] {
            if node.anchors.len() >= ANCHOR_COMPACT_THRESHOLD
                && node.anchors.len() == node.anchors.capacity()
            {
                node.anchors.sort_unstable();
                node.anchors.dedup();
                node.anchors.retain(|id| {
                    matches!(anchors[id.slot()], Some(anchor) if anchor.leaf == leaf)
                });
            }
            node.anchors.push(id);
        }
    }

    /// Where anchor `id` sits.
    ///
    /// # Panics
    ///
    /// Panics if `id` was released. A cursor owns its anchor and releases it
    /// only when dropped, so a live cursor never observes this.
    pub(crate) fn anchor_of(&self, id: AnchorId) -> Anchor {
        self.anchors[id.slot()]
            .unwrap_or_else(|| panic!("cursor anchor {} was released", id.0))
    }

    /// Move an existing anchor, registering it on the new leaf if it changed.
    pub(crate) fn move_anchor(&mut self, id: AnchorId, leaf: NodeIdx, offset: usize) {
        let previous = self.anchors[id.slot()].replace(Anchor { leaf, offset });
        if previous.map(|anchor| anchor.leaf) != Some(leaf) {
            self.attach(id, leaf);
        }
    }

    pub(crate) fn release(&mut self, id: AnchorId) {
        if self.anchors[id.slot()].take().is_some() {
            self.free.push(id);
        }
    }

    pub(crate) fn revision(&self) -> u64 {
        self.revision
    }

    fn live_anchors(&self) -> usize {
        self.anchors.iter().filter(|slot| slot.is_some()).count()
    }
}

/// Shared storage for ropes and their cursors.
///
/// Cloning a `Buffer` is cheap and yields a handle to the same storage.
/// Ropes built from one buffer can be concatenated without copying text.
#[derive(Clone, Default)]
pub struct Buffer {
    arena: Rc<RefCell<Arena>>,
}

impl Buffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a single-leaf rope holding `text`.
    pub fn rope(&self, text: &str) -> Rope {
        let root = self.arena.borrow_mut().leaf(text.chars().collect());
        Rope::from_root(self.clone(), root)
    }

    /// Counter bumped every time a split moves live cursors.
    ///
    /// Tables keyed by [`CursorKey`](crate::CursorKey) must re-key their
    /// entries when this changes.
    pub fn revision(&self) -> u64 {
        self.arena.borrow().revision()
    }

    /// Number of cursors currently alive on this buffer.
    pub fn live_cursors(&self) -> usize {
        self.arena.borrow().live_anchors()
    }

    /// Number of rope nodes ever allocated in this buffer.
    pub fn node_count(&self) -> usize {
        self.arena.borrow().nodes.len()
    }

    pub(crate) fn arena(&self) -> &RefCell<Arena> {
        &self.arena
    }

    /// Stable identity of the underlying storage.
    pub(crate) fn id(&self) -> usize {
        Rc::as_ptr(&self.arena) as usize
    }

    pub(crate) fn same(&self, other: &Buffer) -> bool {
        Rc::ptr_eq(&self.arena, &other.arena)
    }
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.arena.try_borrow() {
            Ok(arena) => f
                .debug_struct("Buffer")
                .field("nodes", &arena.nodes.len())
                .field("cursors", &arena.live_anchors())
                .field("revision", &arena.revision)
                .finish(),
            Err(_) => f.write_str("Buffer { <borrowed> }"),
        }
    }
}
