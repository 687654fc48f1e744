//! Lowering pattern syntax trees to bytecode.

use mend_parse::Parsed;
use thiserror::Error;
use tracing::debug;

use crate::syntax::{parse_pattern, PatternNode, PatternSyntax};
use crate::{atleast, between, concat, kleene, maybe, range, str, union, Bytecode};

/// A pattern that does not parse.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("invalid pattern at {position}: {reason}")]
pub struct PatternError {
    /// Character index where parsing stopped.
    pub position: usize,
    pub reason: String,
}

/// Most instructions a compiled pattern may expand to.
pub const MAX_OPS: usize = 1 << 16;

/// Compile `pattern` to bytecode.
///
/// `%` is the escape character: `%*` matches a literal `*`.
pub fn compile(pattern: &str) -> Result<Bytecode, PatternError> {
    let tree = parse_pattern(pattern);
    let code = lower(&tree)?;
    if let Some(rest) = pattern.chars().nth(tree.len) {
        return Err(PatternError {
            position: tree.len,
            reason: format!("unexpected `{rest}`"),
        });
    }
    debug!(pattern, ops = code.len(), "compiled pattern");
    Ok(code)
}

fn lower_all(nodes: &[Parsed<PatternSyntax>]) -> Result<Vec<Bytecode>, PatternError> {
    nodes.iter().map(lower).collect()
}

fn lower(node: &Parsed<PatternSyntax>) -> Result<Bytecode, PatternError> {
    let code = match &node.node {
        PatternNode::Literal(text) => str(text),
        PatternNode::Range(lo, hi) => range(*lo, *hi),
        PatternNode::Class(items) | PatternNode::Union(items) => union(lower_all(items)?),
        PatternNode::Concat(items) => concat(lower_all(items)?),
        PatternNode::Star(inner) => kleene(lower(inner)?),
        PatternNode::Plus(inner) => atleast(1, &lower(inner)?),
        PatternNode::Optional(inner) => maybe(lower(inner)?),
        PatternNode::Repeat { lo, hi, operand } => {
            let inner = lower(operand)?;
            let copies = (*hi).or(*lo).unwrap_or(0) + 1;
            if (inner.len() + 3).saturating_mul(copies) > MAX_OPS {
                return Err(PatternError {
                    position: node.end.index(),
                    reason: format!("pattern expands to more than {MAX_OPS} instructions"),
                });
            }
            let lo = lo.unwrap_or(0);
            match hi {
                Some(hi) => between(lo, *hi, &inner),
                None => atleast(lo, &inner),
            }
        }
        PatternNode::Error(reason) => {
            return Err(PatternError {
                position: node.end.index(),
                reason: reason.clone(),
            })
        }
    };
    Ok(code)
}

#[cfg(test)]
mod tests;
