//! Scanner, expression evaluator and script splitter.
//!
//! - [`scanner`]: pull-based tokenizer with statement and expression modes
//! - [`expr`]: two-stack operator-precedence parser plus tree-walking evaluator
//! - [`value`]: runtime values, numeric coercion, boolean and escape decoding
//! - [`builtins`]: the fixed math function table
//! - [`stmt`]: splitting a script into commands and words
//!
//! # Quick start
//!
//! ```rust
//! use tcl::script::{evaluate_expression, Value};
//! use tcl::var::VarStore;
//!
//! let mut vars = VarStore::new();
//! vars.set("x", "6");
//! assert_eq!(evaluate_expression("$x * 7", &mut vars), Ok(Value::Int(42)));
//! ```

pub mod builtins;
pub mod error;
pub mod expr;
pub mod node;
pub mod scanner;
pub mod stmt;
pub mod token;
pub mod value;

// Re-exports for convenience.
pub use builtins::call_function;
pub use error::EvalError;
pub use expr::{
    eval_node, evaluate_expression, evaluate_expression_with, parse_expression, EvalContext,
    ExprParser,
};
pub use node::{Arity, ExprNode, Op, OperatorNode};
pub use scanner::{Mode, Scanner};
pub use stmt::{parse_script, Command, Word};
pub use token::{Token, TokenKind};
pub use value::{coerce_number, eval_boolean, eval_string, Value};
