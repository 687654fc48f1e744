//! Parser configuration.

/// Tunables of a [`Parser`](crate::Parser).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParseConfig {
    /// Deepest allowed nesting of rule invocations. A rule that would go
    /// deeper yields an unhandled-error node instead of running.
    pub max_depth: usize,
    /// Characters of slack on each side of an edit when deciding whether a
    /// cached node overlaps it. Covers one character of token lookahead.
    pub edit_margin: usize,
}

impl ParseConfig {
    pub const DEFAULT_MAX_DEPTH: usize = 4096;
    pub const DEFAULT_EDIT_MARGIN: usize = 1;

    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    #[must_use]
    pub fn with_edit_margin(mut self, edit_margin: usize) -> Self {
        self.edit_margin = edit_margin;
        self
    }
}

impl Default for ParseConfig {
    fn default() -> Self {
        ParseConfig {
            max_depth: Self::DEFAULT_MAX_DEPTH,
            edit_margin: Self::DEFAULT_EDIT_MARGIN,
        }
    }
}
