//! Expression parser and evaluator.
//!
//! Parsing is a two-stack operator-precedence (shunting-yard) pass over the
//! expression-mode token stream.  Operands go on the argument stack,
//! operators and open-paren markers on the operator stack; a binary operator
//! first reduces every stacked operator that binds at least as tightly, which
//! makes all binary operators left-associative.
//!
//! Evaluation is a separate tree walk that pulls variables and command
//! results from the host through [`EvalContext`].
//!
//! Precedence (tightest first):
//!   unary `+ - ~ !`  →  `**`  →  `* / %`  →  `+ -`  →  `<< >>`  →
//!   `< > <= >=`  →  `eq ne in ni == !=`  →  `&`  →  `^`  →  `|`  →
//!   `&&`  →  `||`  →  `?:`

use std::cmp::Ordering;

use tracing::{debug, trace};

use super::builtins::call_function;
use super::error::EvalError;
use super::node::{Arity, ExprNode, Op, OperatorNode};
use super::scanner::Scanner;
use super::token::{Token, TokenKind};
use super::value::{coerce_number, eval_string, parse_float, parse_integer, Value};
use crate::config::EvalConfig;

// ── EvalContext ───────────────────────────────────────────────────────────────

/// Host capabilities the evaluator needs for substitutions.
///
/// Both methods return raw text; the evaluator coerces it.  Implementations
/// may call back into [`evaluate_expression`].
pub trait EvalContext {
    /// Value of variable `name` (the text between `$`/`${}` delimiters).
    fn get_variable(&mut self, name: &str) -> Result<String, EvalError>;

    /// Run the script inside `[...]` and return its result.
    fn evaluate_command(&mut self, text: &str) -> Result<String, EvalError>;
}

// ── Parser ────────────────────────────────────────────────────────────────────

/// What the parser accepts next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SearchState {
    /// An operand, a prefix operator, `(` or a function name.
    ExpectArgument,
    /// A binary operator, `)`, `,` or the end.
    ExpectOperator,
}

/// Single-use expression parser.
#[derive(Debug)]
pub struct ExprParser {
    state: SearchState,
    args: Vec<ExprNode>,
    ops: Vec<ExprNode>,
    function_depth: usize,
    nesting: usize,
    max_nesting: usize,
    max_depth: usize,
}

impl Default for ExprParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ExprParser {
    pub fn new() -> Self {
        Self::with_config(&EvalConfig::default())
    }

    pub fn with_config(config: &EvalConfig) -> Self {
        ExprParser {
            state: SearchState::ExpectArgument,
            args: Vec::new(),
            ops: Vec::new(),
            function_depth: 0,
            nesting: 0,
            max_nesting: config.max_nesting,
            max_depth: config.max_depth,
        }
    }

    /// Parse `text` into a tree.
    pub fn parse(mut self, text: &str) -> Result<ExprNode, EvalError> {
        let mut tokens = Scanner::expression(text);
        while let Some(tok) = tokens.next() {
            match tok.kind {
                TokenKind::Eof => return self.finish(),
                TokenKind::Error => return Err(lex_error(&tok)),
                TokenKind::Quote => {
                    let node = quoted_word(tok, &mut tokens)?;
                    self.push_operand(node)?;
                }
                TokenKind::Integer => {
                    let node = ExprNode::Literal(Value::Int(parse_integer(tok.text)?));
                    self.push_operand(node)?;
                }
                TokenKind::Float => {
                    let node = ExprNode::Literal(Value::Float(parse_float(tok.text)?));
                    self.push_operand(node)?;
                }
                TokenKind::Brace => {
                    self.push_operand(ExprNode::Literal(coerce_number(tok.contents())))?;
                }
                TokenKind::String => {
                    self.push_operand(ExprNode::Literal(Value::Str(tok.text.to_owned())))?;
                }
                TokenKind::Variable => {
                    self.push_operand(ExprNode::VariableRef(tok.contents().to_owned()))?;
                }
                TokenKind::Command => {
                    self.push_operand(ExprNode::CommandRef(tok.contents().to_owned()))?;
                }
                TokenKind::Operator => self.push_operator(tok.text)?,
                TokenKind::Function => self.open_call(tok.text)?,
                TokenKind::Paren if tok.text == "(" => self.open_paren()?,
                TokenKind::Paren => self.close_paren()?,
                TokenKind::Comma => self.comma()?,
                TokenKind::Eol => {
                    return Err(EvalError::InternalState(format!(
                        "unexpected {tok} in expression"
                    )))
                }
            }
        }
        Err(EvalError::InternalState(
            "token stream ended without EOF".into(),
        ))
    }

    fn push_operand(&mut self, node: ExprNode) -> Result<(), EvalError> {
        if self.state == SearchState::ExpectOperator {
            return Err(syntax("missing operator"));
        }
        self.args.push(node);
        self.state = SearchState::ExpectOperator;
        Ok(())
    }

    fn push_operator(&mut self, text: &str) -> Result<(), EvalError> {
        let node = match self.state {
            SearchState::ExpectArgument => {
                let op = Op::unary(text).ok_or_else(|| {
                    EvalError::Operator(format!("unsupported unary operator \"{text}\""))
                })?;
                // Prefix operators bind to what follows; nothing to reduce yet.
                OperatorNode::new(op, Arity::Unary)
            }
            SearchState::ExpectOperator => {
                let op = Op::binary(text).ok_or_else(|| {
                    EvalError::Operator(format!("unsupported binary operator \"{text}\""))
                })?;
                let node = OperatorNode::new(op, Arity::Binary);
                self.force_precedence(node.precedence)?;
                node
            }
        };
        self.ops.push(ExprNode::Operator(node));
        self.state = SearchState::ExpectArgument;
        Ok(())
    }

    /// Reduce stacked operators binding at least as tightly as `precedence`.
    fn force_precedence(&mut self, precedence: u8) -> Result<(), EvalError> {
        loop {
            let tighter = matches!(
                self.ops.last(),
                Some(ExprNode::Operator(top)) if precedence >= top.precedence
            );
            if !tighter {
                return Ok(());
            }
            self.reduce()?;
        }
    }

    fn open_paren(&mut self) -> Result<(), EvalError> {
        if self.state == SearchState::ExpectOperator {
            return Err(syntax("missing operator"));
        }
        self.nesting += 1;
        if self.nesting > self.max_nesting {
            return Err(syntax("expression nested too deeply"));
        }
        self.ops.push(ExprNode::GroupMarker);
        Ok(())
    }

    fn open_call(&mut self, name: &str) -> Result<(), EvalError> {
        if self.state == SearchState::ExpectOperator {
            return Err(syntax("missing operator"));
        }
        let marker = ExprNode::FunctionMarker {
            name: name.to_owned(),
        };
        self.ops.push(marker.clone());
        self.args.push(marker);
        self.function_depth += 1;
        self.state = SearchState::ExpectArgument;
        Ok(())
    }

    /// True when the innermost group is a call whose argument list is still
    /// empty, i.e. `f(` has just been read.
    fn at_empty_call(&self) -> bool {
        let n = self.ops.len();
        n >= 2
            && matches!(self.ops[n - 1], ExprNode::GroupMarker)
            && matches!(self.ops[n - 2], ExprNode::FunctionMarker { .. })
            && matches!(self.args.last(), Some(ExprNode::FunctionMarker { .. }))
    }

    /// True when the innermost group is a call's argument list.
    fn in_call_group(&self) -> bool {
        let n = self.ops.len();
        n >= 2
            && matches!(self.ops[n - 1], ExprNode::GroupMarker)
            && matches!(self.ops[n - 2], ExprNode::FunctionMarker { .. })
    }

    fn close_paren(&mut self) -> Result<(), EvalError> {
        if self.state == SearchState::ExpectArgument && !self.at_empty_call() {
            return Err(syntax("missing operand"));
        }
        loop {
            match self.ops.last() {
                None => return Err(syntax("unmatched right parenthesis")),
                Some(ExprNode::GroupMarker) => {
                    self.ops.pop();
                    break;
                }
                Some(ExprNode::FunctionMarker { .. }) => {
                    return Err(EvalError::InternalState(
                        "call marker without its group".into(),
                    ))
                }
                Some(_) => self.reduce()?,
            }
        }
        self.nesting -= 1;

        if let Some(ExprNode::FunctionMarker { .. }) = self.ops.last() {
            let Some(ExprNode::FunctionMarker { name }) = self.ops.pop() else {
                return Err(EvalError::InternalState("call marker vanished".into()));
            };
            let mut call_args = Vec::new();
            loop {
                match self.args.pop() {
                    Some(ExprNode::FunctionMarker { .. }) => break,
                    Some(arg) => call_args.push(arg),
                    None => {
                        return Err(EvalError::InternalState(format!(
                            "arguments of \"{name}\" lost their marker"
                        )))
                    }
                }
            }
            // Popped last-to-first.
            call_args.reverse();
            trace!(function = %name, argc = call_args.len(), "call");
            let call = ExprNode::Function {
                name,
                args: call_args,
            };
            self.check_depth(call.depth())?;
            self.args.push(call);
            self.function_depth -= 1;
        }
        self.state = SearchState::ExpectOperator;
        Ok(())
    }

    fn comma(&mut self) -> Result<(), EvalError> {
        if self.function_depth == 0 {
            return Err(syntax("found comma outside function call"));
        }
        if self.state == SearchState::ExpectArgument {
            return Err(syntax("missing operand"));
        }
        while matches!(self.ops.last(), Some(ExprNode::Operator(_))) {
            self.reduce()?;
        }
        if !self.in_call_group() {
            return Err(syntax("found comma outside function call"));
        }
        self.state = SearchState::ExpectArgument;
        Ok(())
    }

    /// Combine the top operator with its operands.  A marker on top is left
    /// alone.
    fn reduce(&mut self) -> Result<(), EvalError> {
        if self.ops.last().map_or(true, ExprNode::is_marker) {
            return Ok(());
        }
        let Some(ExprNode::Operator(mut node)) = self.ops.pop() else {
            return Err(EvalError::InternalState(
                "operator stack holds an operand".into(),
            ));
        };
        let right = self.pop_operand(node.op)?;
        let left = match node.arity {
            Arity::Binary => Some(self.pop_operand(node.op)?),
            Arity::Unary => None,
        };
        node.attach(left, right);
        trace!(op = %node.op, arity = ?node.arity, depth = node.depth, "reduce");
        self.check_depth(node.depth)?;
        self.args.push(ExprNode::Operator(node));
        Ok(())
    }

    /// Evaluation recurses once per tree level, so long operator chains are
    /// capped like deep parentheses.
    fn check_depth(&self, depth: usize) -> Result<(), EvalError> {
        if depth > self.max_depth {
            return Err(syntax("expression nested too deeply"));
        }
        Ok(())
    }

    fn pop_operand(&mut self, op: Op) -> Result<ExprNode, EvalError> {
        match self.args.pop() {
            Some(node) if !node.is_marker() => Ok(node),
            Some(marker) => {
                self.args.push(marker);
                Err(missing_operand(op))
            }
            None => Err(missing_operand(op)),
        }
    }

    fn finish(mut self) -> Result<ExprNode, EvalError> {
        if self.args.is_empty() && self.ops.is_empty() {
            return Err(syntax("empty expression"));
        }
        if self.state == SearchState::ExpectArgument {
            return Err(syntax("missing operand"));
        }
        while let Some(top) = self.ops.last() {
            if top.is_marker() {
                return Err(syntax("unmatched left parenthesis"));
            }
            self.reduce()?;
        }
        let root = match (self.args.pop(), self.args.is_empty()) {
            (Some(root), true) if !root.is_marker() => root,
            _ => {
                return Err(EvalError::InternalState(format!(
                    "{} values left on the argument stack",
                    self.args.len() + 1
                )))
            }
        };
        Ok(root)
    }
}

/// Assemble a quoted word starting at its opening fragment.
///
/// A word without substitutions becomes a literal; otherwise the following
/// fragments and substitutions up to the closing fragment are collected.
fn quoted_word(opening: Token<'_>, tokens: &mut Scanner<'_>) -> Result<ExprNode, EvalError> {
    if opening.closes_quote(true) {
        let text = eval_string(opening.contents())?;
        return Ok(ExprNode::Literal(coerce_number(&text)));
    }
    let mut parts = Vec::new();
    push_text(&mut parts, opening.contents())?;
    for tok in tokens.by_ref() {
        match tok.kind {
            TokenKind::Quote => {
                push_text(&mut parts, tok.contents())?;
                if tok.closes_quote(false) {
                    return Ok(ExprNode::Interpolated(parts));
                }
            }
            TokenKind::Variable => parts.push(ExprNode::VariableRef(tok.contents().to_owned())),
            TokenKind::Command => parts.push(ExprNode::CommandRef(tok.contents().to_owned())),
            TokenKind::String => push_text(&mut parts, tok.text)?,
            TokenKind::Error => return Err(lex_error(&tok)),
            _ => {
                return Err(EvalError::InternalState(format!(
                    "unexpected {tok} inside quoted word"
                )))
            }
        }
    }
    Err(EvalError::InternalState(
        "quoted word ended without its closing fragment".into(),
    ))
}

fn push_text(parts: &mut Vec<ExprNode>, raw: &str) -> Result<(), EvalError> {
    if !raw.is_empty() {
        parts.push(ExprNode::Literal(Value::Str(eval_string(raw)?)));
    }
    Ok(())
}

fn lex_error(tok: &Token<'_>) -> EvalError {
    EvalError::Lex {
        message: tok.text.to_owned(),
        offset: tok.offset,
    }
}

fn syntax(message: &str) -> EvalError {
    EvalError::Syntax(message.to_owned())
}

fn missing_operand(op: Op) -> EvalError {
    EvalError::Operand(format!("missing operand for \"{op}\""))
}

// ── Evaluator ─────────────────────────────────────────────────────────────────

/// Evaluate a tree.  Children are evaluated left to right; the first error
/// aborts.
pub fn eval_node(node: &ExprNode, ctx: &mut dyn EvalContext) -> Result<Value, EvalError> {
    match node {
        ExprNode::Literal(v) => Ok(v.clone()),
        ExprNode::VariableRef(name) => Ok(coerce_number(&ctx.get_variable(name)?)),
        ExprNode::CommandRef(text) => Ok(coerce_number(&ctx.evaluate_command(text)?)),
        ExprNode::Interpolated(parts) => {
            let mut text = String::new();
            for part in parts {
                match part {
                    ExprNode::Literal(v) => text.push_str(&v.to_string()),
                    ExprNode::VariableRef(name) => text.push_str(&ctx.get_variable(name)?),
                    ExprNode::CommandRef(cmd) => text.push_str(&ctx.evaluate_command(cmd)?),
                    other => {
                        return Err(EvalError::InternalState(format!(
                            "{other} inside quoted word"
                        )))
                    }
                }
            }
            Ok(coerce_number(&text))
        }
        ExprNode::Operator(op) => eval_operator(op, ctx),
        ExprNode::Function { name, args } => {
            let values = args
                .iter()
                .map(|arg| eval_node(arg, ctx))
                .collect::<Result<Vec<_>, _>>()?;
            call_function(name, &values)
        }
        ExprNode::GroupMarker | ExprNode::FunctionMarker { .. } => Err(
            EvalError::InternalState("marker node reached evaluation".into()),
        ),
    }
}

fn eval_operator(node: &OperatorNode, ctx: &mut dyn EvalContext) -> Result<Value, EvalError> {
    if matches!(
        node.op,
        Op::Ternary | Op::Else | Op::In | Op::Ni | Op::Assign
    ) {
        return Err(EvalError::Operator(format!(
            "unsupported operator \"{}\"",
            node.op
        )));
    }
    let right = node.right.as_deref().ok_or_else(|| detached(node.op))?;

    if node.arity == Arity::Unary {
        let v = eval_node(right, ctx)?;
        return match node.op {
            Op::Plus => v.arith_plus(),
            Op::Minus => v.arith_neg(),
            Op::BitNot => v.bit_not(),
            Op::Not => Ok(Value::from(!v.as_boolean()?)),
            other => Err(EvalError::InternalState(format!(
                "\"{other}\" parsed as a unary operator"
            ))),
        };
    }

    let left = node.left.as_deref().ok_or_else(|| detached(node.op))?;
    let l = eval_node(left, ctx)?;
    match node.op {
        Op::And if !l.as_boolean()? => return Ok(Value::Int(0)),
        Op::Or if l.as_boolean()? => return Ok(Value::Int(1)),
        Op::And | Op::Or => return Ok(Value::from(eval_node(right, ctx)?.as_boolean()?)),
        _ => {}
    }
    let r = eval_node(right, ctx)?;
    apply_binary(node.op, &l, &r)
}

fn apply_binary(op: Op, l: &Value, r: &Value) -> Result<Value, EvalError> {
    match op {
        Op::Pow => l.arith_pow(r),
        Op::Mul => l.arith_mul(r),
        Op::Div => l.arith_div(r),
        Op::Rem => l.arith_rem(r),
        Op::Plus => l.arith_add(r),
        Op::Minus => l.arith_sub(r),
        Op::Shl => l.shift_left(r),
        Op::Shr => l.shift_right(r),
        Op::Lt => Ok(relational(l, r, Ordering::is_lt)),
        Op::Gt => Ok(relational(l, r, Ordering::is_gt)),
        Op::Le => Ok(relational(l, r, Ordering::is_le)),
        Op::Ge => Ok(relational(l, r, Ordering::is_ge)),
        Op::NumEq => Ok(relational(l, r, Ordering::is_eq)),
        Op::NumNe => Ok(Value::from(l.compare(r) != Some(Ordering::Equal))),
        Op::StrEq => Ok(Value::from(l.str_eq(r))),
        Op::StrNe => Ok(Value::from(!l.str_eq(r))),
        Op::BitAnd => l.bit_and(r),
        Op::BitXor => l.bit_xor(r),
        Op::BitOr => l.bit_or(r),
        other => Err(EvalError::InternalState(format!(
            "\"{other}\" has no binary form"
        ))),
    }
}

/// NaN compares false for every ordering.
fn relational(l: &Value, r: &Value, pred: fn(Ordering) -> bool) -> Value {
    Value::from(l.compare(r).is_some_and(pred))
}

fn detached(op: Op) -> EvalError {
    EvalError::InternalState(format!("operator \"{op}\" is missing an operand"))
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Parse an expression without evaluating it.
pub fn parse_expression(text: &str) -> Result<ExprNode, EvalError> {
    ExprParser::new().parse(text)
}

/// Parse and evaluate `text` with the default configuration.
pub fn evaluate_expression(text: &str, ctx: &mut dyn EvalContext) -> Result<Value, EvalError> {
    evaluate_expression_with(text, ctx, &EvalConfig::default())
}

/// Parse and evaluate `text` with an explicit configuration.
pub fn evaluate_expression_with(
    text: &str,
    ctx: &mut dyn EvalContext,
    config: &EvalConfig,
) -> Result<Value, EvalError> {
    debug!(expr = text, "evaluating expression");
    let root = ExprParser::with_config(config).parse(text)?;
    eval_node(&root, ctx)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
