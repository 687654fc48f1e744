//! Recursion safety for rule invocations.
//!
//! Two independent limits apply to every rule body:
//!
//! - The native stack is grown on demand with `stacker`, so legal but deep
//!   nesting does not overflow.
//! - A depth counter owned by the parser caps nesting at
//!   [`ParseConfig::max_depth`](crate::ParseConfig::max_depth), so runaway
//!   left recursion ends in an error node instead of exhausting memory.

use std::cell::Cell;

/// Minimum stack space to keep available (100KB red zone).
const RED_ZONE: usize = 100 * 1024;

/// Stack space to allocate when growing (1MB).
const STACK_PER_RECURSION: usize = 1024 * 1024;

/// Run `f`, growing the stack first if less than the red zone remains.
#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub(crate) fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

/// WASM manages its own stack.
#[inline]
#[cfg(target_arch = "wasm32")]
pub(crate) fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}

/// One level of rule nesting. Leaving the level on drop keeps the counter
/// balanced even when the body panics.
pub(crate) struct DepthGuard<'a> {
    depth: &'a Cell<usize>,
}

impl<'a> DepthGuard<'a> {
    /// Enter a level, or `None` when `limit` levels are already active.
    pub(crate) fn enter(depth: &'a Cell<usize>, limit: usize) -> Option<Self> {
        let current = depth.get();
        if current >= limit {
            return None;
        }
        depth.set(current + 1);
        Some(DepthGuard { depth })
    }
}

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.depth.set(self.depth.get().saturating_sub(1));
    }
}
