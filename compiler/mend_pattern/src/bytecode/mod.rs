//! Pattern bytecode and its builders.
//!
//! A program is a flat list of [`Op`]s forming one instruction tree:
//!
//! - `Char` and `Range` are leaves.
//! - `KleeneStar` applies to the single instruction after it.
//! - `ConcatStart .. ConcatEnd` and `UnionStart .. UnionEnd` bracket a
//!   sequence of instructions.
//!
//! Programs are only built through the functions in this module, so the
//! brackets always balance.

use std::fmt;

/// One bytecode instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Op {
    /// Match exactly this character.
    Char(char),
    /// Match one character in the inclusive range.
    Range(char, char),
    /// Match the next instruction zero or more times, greedily.
    KleeneStar,
    /// Try each instruction up to `UnionEnd` in order; the first match wins.
    UnionStart,
    UnionEnd,
    /// Match each instruction up to `ConcatEnd` in sequence.
    ConcatStart,
    ConcatEnd,
}

/// A compiled pattern.
///
/// Besides the instructions, a program keeps for every instruction the
/// index just past it, so matching can skip a failed alternative without
/// rescanning.
#[derive(Clone, PartialEq, Eq)]
pub struct Bytecode {
    ops: Vec<Op>,
    next: Vec<usize>,
}

impl Bytecode {
    fn from_ops(ops: Vec<Op>) -> Self {
        let mut next = vec![0; ops.len()];
        let mut pc = 0;
        while pc < ops.len() {
            pc = link(&ops, pc, &mut next);
        }
        Bytecode { ops, next }
    }

    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub(crate) fn op(&self, pc: usize) -> Option<Op> {
        self.ops.get(pc).copied()
    }

    /// Index of the instruction after the one at `pc`.
    pub(crate) fn skip(&self, pc: usize) -> usize {
        self.next.get(pc).copied().unwrap_or(self.ops.len())
    }
}

/// Fill `next` for the instruction at `pc` and everything inside it.
/// Returns the index past it.
fn link(ops: &[Op], pc: usize, next: &mut [usize]) -> usize {
    let end = match ops.get(pc) {
        None => return ops.len(),
        Some(Op::KleeneStar) => link(ops, pc + 1, next),
        Some(Op::UnionStart | Op::ConcatStart) => {
            let mut inner = pc + 1;
            while inner < ops.len() && !matches!(ops[inner], Op::UnionEnd | Op::ConcatEnd) {
                inner = link(ops, inner, next);
            }
            (inner + 1).min(ops.len())
        }
        Some(_) => pc + 1,
    };
    next[pc] = end;
    end
}

impl fmt::Debug for Bytecode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.ops).finish()
    }
}

fn bracket(start: Op, parts: impl IntoIterator<Item = Bytecode>, end: Op) -> Bytecode {
    let mut ops = vec![start];
    for part in parts {
        ops.extend(part.ops);
    }
    ops.push(end);
    Bytecode::from_ops(ops)
}

/// Match `text` literally. An empty string matches without consuming.
pub fn str(text: &str) -> Bytecode {
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Bytecode::from_ops(vec![Op::Char(c)]),
        _ => bracket(
            Op::ConcatStart,
            text.chars().map(|c| Bytecode::from_ops(vec![Op::Char(c)])),
            Op::ConcatEnd,
        ),
    }
}

/// Match each part in sequence.
pub fn concat(parts: impl IntoIterator<Item = Bytecode>) -> Bytecode {
    bracket(Op::ConcatStart, parts, Op::ConcatEnd)
}

/// Match the first part that matches, in order.
pub fn union(parts: impl IntoIterator<Item = Bytecode>) -> Bytecode {
    bracket(Op::UnionStart, parts, Op::UnionEnd)
}

/// Match `inner` zero or more times.
pub fn kleene(inner: Bytecode) -> Bytecode {
    let mut ops = Vec::with_capacity(inner.len() + 1);
    ops.push(Op::KleeneStar);
    ops.extend(inner.ops);
    Bytecode::from_ops(ops)
}

/// Match `inner` or nothing.
pub fn maybe(inner: Bytecode) -> Bytecode {
    union([inner, str("")])
}

/// Match `inner` exactly `count` times.
pub fn repeat(count: usize, inner: &Bytecode) -> Bytecode {
    concat((0..count).map(|_| inner.clone()))
}

/// Match `inner` at least `count` times.
pub fn atleast(count: usize, inner: &Bytecode) -> Bytecode {
    concat((0..count).map(|_| inner.clone()).chain([kleene(inner.clone())]))
}

/// Match `inner` between `lo` and `hi` times, inclusive.
pub fn between(lo: usize, hi: usize, inner: &Bytecode) -> Bytecode {
    let optional = maybe(inner.clone());
    concat(
        (0..lo)
            .map(|_| inner.clone())
            .chain((lo..hi).map(|_| optional.clone())),
    )
}

/// Match one character in `lo..=hi`.
pub fn range(lo: char, hi: char) -> Bytecode {
    Bytecode::from_ops(vec![Op::Range(lo, hi)])
}
