//! Expression tree nodes and operators.

use std::fmt;

use super::value::Value;

/// Whether an operator takes one operand or two.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Unary,
    Binary,
}

/// Every operator the scanner can produce.
///
/// `Ternary`/`Else`, `In`/`Ni` and `Assign` are parsed and ranked like the
/// others but rejected when evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Plus,
    Minus,
    BitNot,
    Not,
    Pow,
    Mul,
    Div,
    Rem,
    Shl,
    Shr,
    Lt,
    Gt,
    Le,
    Ge,
    /// `==`
    NumEq,
    /// `!=`
    NumNe,
    /// `eq`
    StrEq,
    /// `ne`
    StrNe,
    In,
    Ni,
    BitAnd,
    BitXor,
    BitOr,
    And,
    Or,
    /// `?`
    Ternary,
    /// `:`
    Else,
    /// lone `=`
    Assign,
}

impl Op {
    /// Resolve operator text in prefix position.
    pub fn unary(text: &str) -> Option<Op> {
        Some(match text {
            "+" => Op::Plus,
            "-" => Op::Minus,
            "~" => Op::BitNot,
            "!" => Op::Not,
            _ => return None,
        })
    }

    /// Resolve operator text in infix position.
    pub fn binary(text: &str) -> Option<Op> {
        Some(match text {
            "+" => Op::Plus,
            "-" => Op::Minus,
            "**" => Op::Pow,
            "*" => Op::Mul,
            "/" => Op::Div,
            "%" => Op::Rem,
            "<<" => Op::Shl,
            ">>" => Op::Shr,
            "<" => Op::Lt,
            ">" => Op::Gt,
            "<=" => Op::Le,
            ">=" => Op::Ge,
            "==" => Op::NumEq,
            "!=" => Op::NumNe,
            "eq" => Op::StrEq,
            "ne" => Op::StrNe,
            "in" => Op::In,
            "ni" => Op::Ni,
            "&" => Op::BitAnd,
            "^" => Op::BitXor,
            "|" => Op::BitOr,
            "&&" => Op::And,
            "||" => Op::Or,
            "?" => Op::Ternary,
            ":" => Op::Else,
            "=" => Op::Assign,
            _ => return None,
        })
    }

    /// Binding strength; lower binds tighter.
    pub fn precedence(self, arity: Arity) -> u8 {
        if arity == Arity::Unary {
            return 1;
        }
        match self {
            Op::Pow => 2,
            Op::Mul | Op::Div | Op::Rem => 3,
            Op::Plus | Op::Minus => 4,
            Op::Shl | Op::Shr => 5,
            Op::Lt | Op::Gt | Op::Le | Op::Ge => 6,
            Op::StrEq | Op::StrNe | Op::In | Op::Ni | Op::NumEq | Op::NumNe => 7,
            Op::BitAnd => 8,
            Op::BitXor => 9,
            Op::BitOr => 10,
            Op::And => 11,
            Op::Or => 12,
            Op::Ternary | Op::Else | Op::Assign => 13,
            Op::BitNot | Op::Not => 1,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Op::Plus => "+",
            Op::Minus => "-",
            Op::BitNot => "~",
            Op::Not => "!",
            Op::Pow => "**",
            Op::Mul => "*",
            Op::Div => "/",
            Op::Rem => "%",
            Op::Shl => "<<",
            Op::Shr => ">>",
            Op::Lt => "<",
            Op::Gt => ">",
            Op::Le => "<=",
            Op::Ge => ">=",
            Op::NumEq => "==",
            Op::NumNe => "!=",
            Op::StrEq => "eq",
            Op::StrNe => "ne",
            Op::In => "in",
            Op::Ni => "ni",
            Op::BitAnd => "&",
            Op::BitXor => "^",
            Op::BitOr => "|",
            Op::And => "&&",
            Op::Or => "||",
            Op::Ternary => "?",
            Op::Else => ":",
            Op::Assign => "=",
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// An operator application.  Children are attached by the parser's reduce
/// step and never change afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct OperatorNode {
    pub op: Op,
    pub arity: Arity,
    pub precedence: u8,
    pub left: Option<Box<ExprNode>>,
    /// The only child of a unary operator.
    pub right: Option<Box<ExprNode>>,
    /// Height of the subtree rooted here, counting this node.
    pub depth: usize,
}

impl OperatorNode {
    pub fn new(op: Op, arity: Arity) -> Self {
        OperatorNode {
            op,
            arity,
            precedence: op.precedence(arity),
            left: None,
            right: None,
            depth: 1,
        }
    }

    /// Attach children and record the resulting subtree height.
    pub fn attach(&mut self, left: Option<ExprNode>, right: ExprNode) {
        let below = left.as_ref().map_or(0, ExprNode::depth).max(right.depth());
        self.depth = below + 1;
        self.left = left.map(Box::new);
        self.right = Some(Box::new(right));
    }
}

/// A node of the expression tree, or a boundary marker on the parser stacks.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprNode {
    Literal(Value),
    /// `$name`; looked up and coerced at evaluation time.
    VariableRef(String),
    /// `[text]`; handed to the host and coerced at evaluation time.
    CommandRef(String),
    /// A quoted word with substitutions, concatenated then coerced.  Parts are
    /// `Literal(Value::Str)`, `VariableRef` or `CommandRef`.
    Interpolated(Vec<ExprNode>),
    Operator(OperatorNode),
    /// Start of a parenthesised group (operator stack only).
    GroupMarker,
    /// Start of a function call's arguments (both stacks).
    FunctionMarker { name: String },
    Function { name: String, args: Vec<ExprNode> },
}

impl ExprNode {
    pub fn is_marker(&self) -> bool {
        matches!(self, ExprNode::GroupMarker | ExprNode::FunctionMarker { .. })
    }

    /// Height of the tree; evaluation recurses this many levels.
    ///
    /// Operator heights are cached at construction, so this only descends
    /// through nested calls.
    pub fn depth(&self) -> usize {
        match self {
            ExprNode::Operator(node) => node.depth,
            ExprNode::Function { args, .. } => {
                1 + args.iter().map(ExprNode::depth).max().unwrap_or(0)
            }
            _ => 1,
        }
    }
}

impl fmt::Display for ExprNode {
    /// Fully parenthesised rendering, handy for checking tree shape.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExprNode::Literal(Value::Str(s)) => write!(f, "{{{s}}}"),
            ExprNode::Literal(v) => write!(f, "{v}"),
            ExprNode::VariableRef(name) => write!(f, "${{{name}}}"),
            ExprNode::CommandRef(text) => write!(f, "[{text}]"),
            ExprNode::Interpolated(parts) => {
                f.write_str("\"")?;
                for part in parts {
                    match part {
                        ExprNode::Literal(v) => write!(f, "{v}")?,
                        other => write!(f, "{other}")?,
                    }
                }
                f.write_str("\"")
            }
            ExprNode::Operator(node) => {
                let child = |c: &Option<Box<ExprNode>>| {
                    c.as_ref().map_or_else(|| "?".to_owned(), |n| n.to_string())
                };
                match node.arity {
                    Arity::Unary => write!(f, "({}{})", node.op, child(&node.right)),
                    Arity::Binary => write!(
                        f,
                        "({} {} {})",
                        child(&node.left),
                        node.op,
                        child(&node.right)
                    ),
                }
            }
            ExprNode::GroupMarker => f.write_str("<group>"),
            ExprNode::FunctionMarker { name } => write!(f, "<{name}(>"),
            ExprNode::Function { name, args } => {
                write!(f, "{name}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(")")
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unary_and_binary_sets() {
        assert_eq!(Op::unary("-"), Some(Op::Minus));
        assert_eq!(Op::unary("!"), Some(Op::Not));
        assert_eq!(Op::unary("*"), None);
        assert_eq!(Op::binary("~"), None);
        assert_eq!(Op::binary("!"), None);
        assert_eq!(Op::binary("eq"), Some(Op::StrEq));
        assert_eq!(Op::binary("?"), Some(Op::Ternary));
    }

    #[test]
    fn precedence_order() {
        use Arity::*;
        let order = [
            Op::Minus.precedence(Unary),
            Op::Pow.precedence(Binary),
            Op::Mul.precedence(Binary),
            Op::Plus.precedence(Binary),
            Op::Shl.precedence(Binary),
            Op::Le.precedence(Binary),
            Op::StrEq.precedence(Binary),
            Op::BitAnd.precedence(Binary),
            Op::BitXor.precedence(Binary),
            Op::BitOr.precedence(Binary),
            Op::And.precedence(Binary),
            Op::Or.precedence(Binary),
            Op::Ternary.precedence(Binary),
        ];
        assert!(order.windows(2).all(|w| w[0] < w[1]), "{order:?}");
    }

    #[test]
    fn symbols_round_trip_through_binary() {
        for op in [Op::Pow, Op::Shr, Op::NumNe, Op::Ni, Op::Or, Op::Else] {
            assert_eq!(Op::binary(op.symbol()), Some(op));
        }
    }

    fn sample() -> ExprNode {
        let mut neg = OperatorNode::new(Op::Minus, Arity::Unary);
        neg.attach(None, ExprNode::VariableRef("x".into()));
        let mut add = OperatorNode::new(Op::Plus, Arity::Binary);
        add.attach(Some(ExprNode::Literal(Value::Int(1))), ExprNode::Operator(neg));
        ExprNode::Operator(add)
    }

    #[test]
    fn display_shape() {
        assert_eq!(sample().to_string(), "(1 + (-${x}))");
    }

    #[test]
    fn depth_counts_levels() {
        assert_eq!(ExprNode::Literal(Value::Int(1)).depth(), 1);
        assert_eq!(sample().depth(), 3);
        let call = ExprNode::Function {
            name: "abs".into(),
            args: vec![ExprNode::Literal(Value::Int(1)), sample()],
        };
        assert_eq!(call.depth(), 4);
        let empty = ExprNode::Function {
            name: "rand".into(),
            args: vec![],
        };
        assert_eq!(empty.depth(), 1);
    }

    #[test]
    fn markers() {
        assert!(ExprNode::GroupMarker.is_marker());
        assert!(ExprNode::FunctionMarker { name: "abs".into() }.is_marker());
        assert!(!ExprNode::Literal(Value::Int(0)).is_marker());
    }
}
