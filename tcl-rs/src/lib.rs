//! Scanner and expression evaluator for a small embedded Tcl-like language.
//!
//! The crate scans scripts into tokens, splits them into commands, and
//! evaluates `expr`-style expressions against a host-supplied
//! [`EvalContext`](script::EvalContext) for variables and command results.

pub mod config;
pub mod script;
pub mod var;

pub use config::EvalConfig;
pub use script::{evaluate_expression, EvalContext, EvalError, Value};
pub use var::VarStore;
