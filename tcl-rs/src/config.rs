//! Evaluator limits.
//!
//! The library reads no files or environment variables; a host that wants
//! different limits builds an [`EvalConfig`] and passes it to
//! [`evaluate_expression_with`](crate::script::expr::evaluate_expression_with).

/// Default cap on open parentheses (groups and call argument lists).
pub const DEFAULT_MAX_NESTING: usize = 256;

/// Default cap on expression tree height.
pub const DEFAULT_MAX_DEPTH: usize = 512;

/// Tunable limits for one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvalConfig {
    /// Deepest allowed parenthesis nesting; deeper input is a syntax error.
    pub max_nesting: usize,
    /// Tallest allowed parse tree.  Evaluation recurses once per level, so
    /// this bounds stack use for chains like `1+1+...` or `----1`.
    pub max_depth: usize,
}

impl Default for EvalConfig {
    fn default() -> Self {
        EvalConfig {
            max_nesting: DEFAULT_MAX_NESTING,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl EvalConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_nesting(mut self, max_nesting: usize) -> Self {
        self.max_nesting = max_nesting;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
