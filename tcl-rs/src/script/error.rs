//! Error type shared by the scanner, the expression evaluator, and the
//! function table.

use thiserror::Error;

/// Every way an expression can fail to scan, parse, or evaluate.
///
/// Errors abort the current evaluation; there is never a partial result.
/// Display strings follow Tcl's wording so a host can show them verbatim.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    /// The scanner produced an `Error` token (unclosed construct, malformed
    /// number, illegal character).
    #[error("{message}")]
    Lex { message: String, offset: usize },

    /// Well-formed tokens in an ill-formed arrangement.
    #[error("syntax error in expression: {0}")]
    Syntax(String),

    /// Missing, non-numeric, or wrongly-typed operand or function argument.
    #[error("{0}")]
    Operand(String),

    /// Unknown or unsupported operator or function.
    #[error("{0}")]
    Operator(String),

    /// The two-stack parser left its stacks in an impossible shape.
    #[error("internal evaluator error: {0}")]
    InternalState(String),

    /// Overflowing literal, division by zero, or a result outside the
    /// representable range.
    #[error("{0}")]
    NumberRange(String),

    /// A literal or escape sequence with invalid digits.
    #[error("{0}")]
    NumberSyntax(String),

    /// Text that is neither numeric nor a recognised boolean word.
    #[error("expected boolean value but got \"{0}\"")]
    BooleanSyntax(String),

    /// Variable lookup failed in the host.
    #[error("{0}")]
    Lookup(String),

    /// Command substitution failed in the host.
    #[error("{0}")]
    Command(String),
}

impl EvalError {
    pub(crate) fn non_numeric(op: &str) -> Self {
        EvalError::Operand(format!(
            "can't use non-numeric string as operand of \"{op}\""
        ))
    }

    pub(crate) fn divide_by_zero() -> Self {
        EvalError::NumberRange("divide by zero".into())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lex_error_shows_only_message() {
        let e = EvalError::Lex {
            message: "unclosed left brace".into(),
            offset: 3,
        };
        assert_eq!(e.to_string(), "unclosed left brace");
    }

    #[test]
    fn syntax_error_is_prefixed() {
        let e = EvalError::Syntax("unmatched right parenthesis".into());
        assert_eq!(
            e.to_string(),
            "syntax error in expression: unmatched right parenthesis"
        );
    }

    #[test]
    fn helper_messages() {
        assert_eq!(
            EvalError::non_numeric("+").to_string(),
            "can't use non-numeric string as operand of \"+\""
        );
        assert_eq!(EvalError::divide_by_zero().to_string(), "divide by zero");
    }
}
