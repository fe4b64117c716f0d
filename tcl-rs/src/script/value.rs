//! Runtime value type and coercion primitives.
//!
//! The language is dynamically typed; every value is a string at heart, but
//! the evaluator coerces freely to integers and floats when text looks
//! numeric.  [`coerce_number`] is the single best-effort conversion used for
//! literals, variable values and command results.

use std::cmp::Ordering;
use std::fmt;

use super::error::EvalError;
use super::scanner::scan_number;
use super::token::TokenKind;

/// A runtime value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(String),
}

impl Default for Value {
    fn default() -> Self {
        Value::Str(String::new())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(x) => {
                // Always carry a `.` so the text reads back as a float; `{}`
                // on f64 never uses exponent form.
                let text = x.to_string();
                if x.is_finite() && !text.contains('.') {
                    write!(f, "{text}.0")
                } else {
                    f.write_str(&text)
                }
            }
            Value::Str(s) => write!(f, "{s}"),
        }
    }
}

/// Operands of a binary numeric operation after promotion.
enum NumPair {
    Int(i64, i64),
    Float(f64, f64),
}

impl Value {
    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }

    /// Widen to `f64`; `None` for strings.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(x) => Some(*x),
            Value::Str(_) => None,
        }
    }

    /// Interpret as a boolean: numbers are true when non-zero, strings must
    /// be one of `true/yes/on/false/no/off` (any case).
    pub fn as_boolean(&self) -> Result<bool, EvalError> {
        match self {
            Value::Int(n) => Ok(*n != 0),
            Value::Float(x) => Ok(*x != 0.0),
            Value::Str(s) => eval_boolean(s),
        }
    }

    // ── Arithmetic helpers ────────────────────────────────────────────────────

    fn numeric_pair(&self, rhs: &Value, op: &str) -> Result<NumPair, EvalError> {
        match (self, rhs) {
            (Value::Int(a), Value::Int(b)) => Ok(NumPair::Int(*a, *b)),
            _ => match (self.as_f64(), rhs.as_f64()) {
                (Some(a), Some(b)) => Ok(NumPair::Float(a, b)),
                _ => Err(EvalError::non_numeric(op)),
            },
        }
    }

    fn int_pair(&self, rhs: &Value, op: &str) -> Result<(i64, i64), EvalError> {
        match (self, rhs) {
            (Value::Int(a), Value::Int(b)) => Ok((*a, *b)),
            (Value::Str(_), _) | (_, Value::Str(_)) => Err(EvalError::non_numeric(op)),
            _ => Err(EvalError::Operand(format!(
                "can't use floating-point value as operand of \"{op}\""
            ))),
        }
    }

    pub fn arith_add(&self, rhs: &Value) -> Result<Value, EvalError> {
        Ok(match self.numeric_pair(rhs, "+")? {
            NumPair::Int(a, b) => Value::Int(a.wrapping_add(b)),
            NumPair::Float(a, b) => Value::Float(a + b),
        })
    }

    pub fn arith_sub(&self, rhs: &Value) -> Result<Value, EvalError> {
        Ok(match self.numeric_pair(rhs, "-")? {
            NumPair::Int(a, b) => Value::Int(a.wrapping_sub(b)),
            NumPair::Float(a, b) => Value::Float(a - b),
        })
    }

    pub fn arith_mul(&self, rhs: &Value) -> Result<Value, EvalError> {
        Ok(match self.numeric_pair(rhs, "*")? {
            NumPair::Int(a, b) => Value::Int(a.wrapping_mul(b)),
            NumPair::Float(a, b) => Value::Float(a * b),
        })
    }

    pub fn arith_div(&self, rhs: &Value) -> Result<Value, EvalError> {
        match self.numeric_pair(rhs, "/")? {
            NumPair::Int(_, 0) => Err(EvalError::divide_by_zero()),
            NumPair::Int(a, b) => Ok(Value::Int(a.wrapping_div(b))),
            NumPair::Float(a, b) => Ok(Value::Float(a / b)),
        }
    }

    pub fn arith_rem(&self, rhs: &Value) -> Result<Value, EvalError> {
        match self.int_pair(rhs, "%")? {
            (_, 0) => Err(EvalError::divide_by_zero()),
            (a, b) => Ok(Value::Int(a.wrapping_rem(b))),
        }
    }

    pub fn arith_pow(&self, rhs: &Value) -> Result<Value, EvalError> {
        match self.numeric_pair(rhs, "**")? {
            NumPair::Int(base, exp) if exp < 0 => match base {
                0 => Err(EvalError::NumberRange(
                    "exponentiation of zero by negative power".into(),
                )),
                1 => Ok(Value::Int(1)),
                -1 => Ok(Value::Int(if exp % 2 == 0 { 1 } else { -1 })),
                _ => Ok(Value::Int(0)),
            },
            NumPair::Int(base, exp) => Ok(Value::Int(int_pow(base, exp as u64))),
            NumPair::Float(a, b) => Ok(Value::Float(a.powf(b))),
        }
    }

    pub fn arith_neg(&self) -> Result<Value, EvalError> {
        match self {
            Value::Int(n) => Ok(Value::Int(n.wrapping_neg())),
            Value::Float(x) => Ok(Value::Float(-x)),
            Value::Str(_) => Err(EvalError::non_numeric("-")),
        }
    }

    pub fn arith_plus(&self) -> Result<Value, EvalError> {
        if self.is_numeric() {
            Ok(self.clone())
        } else {
            Err(EvalError::non_numeric("+"))
        }
    }

    // ── Bitwise helpers ───────────────────────────────────────────────────────

    pub fn bit_not(&self) -> Result<Value, EvalError> {
        match self {
            Value::Int(n) => Ok(Value::Int(!n)),
            Value::Float(_) => Err(EvalError::Operand(
                "can't use floating-point value as operand of \"~\"".into(),
            )),
            Value::Str(_) => Err(EvalError::non_numeric("~")),
        }
    }

    pub fn bit_and(&self, rhs: &Value) -> Result<Value, EvalError> {
        let (a, b) = self.int_pair(rhs, "&")?;
        Ok(Value::Int(a & b))
    }

    pub fn bit_or(&self, rhs: &Value) -> Result<Value, EvalError> {
        let (a, b) = self.int_pair(rhs, "|")?;
        Ok(Value::Int(a | b))
    }

    pub fn bit_xor(&self, rhs: &Value) -> Result<Value, EvalError> {
        let (a, b) = self.int_pair(rhs, "^")?;
        Ok(Value::Int(a ^ b))
    }

    pub fn shift_left(&self, rhs: &Value) -> Result<Value, EvalError> {
        let (a, b) = self.int_pair(rhs, "<<")?;
        let count = shift_count(b)?;
        Ok(Value::Int(if count >= 64 { 0 } else { a << count }))
    }

    pub fn shift_right(&self, rhs: &Value) -> Result<Value, EvalError> {
        let (a, b) = self.int_pair(rhs, ">>")?;
        let count = shift_count(b)?;
        Ok(Value::Int(a >> count.min(63)))
    }

    // ── Comparison ────────────────────────────────────────────────────────────

    /// Compare two values: numerically when both are numeric (ints exactly,
    /// mixed widened to float), otherwise by their string forms.
    ///
    /// Returns `None` only for comparisons involving NaN.
    pub fn compare(&self, rhs: &Value) -> Option<Ordering> {
        match (self, rhs) {
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            _ => match (self.as_f64(), rhs.as_f64()) {
                (Some(a), Some(b)) => a.partial_cmp(&b),
                _ => Some(self.to_string().cmp(&rhs.to_string())),
            },
        }
    }

    /// String equality of the formatted operands (`eq`/`ne`).
    pub fn str_eq(&self, rhs: &Value) -> bool {
        self.to_string() == rhs.to_string()
    }
}

fn int_pow(mut base: i64, mut exp: u64) -> i64 {
    let mut acc: i64 = 1;
    while exp > 0 {
        if exp & 1 == 1 {
            acc = acc.wrapping_mul(base);
        }
        base = base.wrapping_mul(base);
        exp >>= 1;
    }
    acc
}

fn shift_count(n: i64) -> Result<u32, EvalError> {
    if n < 0 {
        return Err(EvalError::Operand("negative shift argument".into()));
    }
    Ok(n.min(64) as u32)
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_owned())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Int(if b { 1 } else { 0 })
    }
}

// ── Coercion ──────────────────────────────────────────────────────────────────

/// Best-effort conversion of text to a number.
///
/// One leading sign is stripped and the remainder must be exactly one numeric
/// literal; otherwise the original text comes back as `Value::Str`.  Never
/// fails.
pub fn coerce_number(text: &str) -> Value {
    let (negative, digits) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let kind = match scan_number(digits) {
        Ok((kind, len)) if len == digits.len() => kind,
        _ => return Value::Str(text.to_owned()),
    };
    if kind == TokenKind::Float {
        return match parse_float(digits) {
            Ok(x) => Value::Float(if negative { -x } else { x }),
            Err(_) => Value::Str(text.to_owned()),
        };
    }
    match parse_magnitude(digits) {
        Ok(m) if m <= i64::MAX as u64 => {
            let n = m as i64;
            Value::Int(if negative { -n } else { n })
        }
        Ok(m) if negative && m == i64::MIN.unsigned_abs() => Value::Int(i64::MIN),
        _ => Value::Str(text.to_owned()),
    }
}

/// Convert the text of an `Integer` token (`0x..`, `0..` octal, decimal).
pub fn parse_integer(text: &str) -> Result<i64, EvalError> {
    let m = parse_magnitude(text)?;
    i64::try_from(m).map_err(|_| {
        EvalError::NumberRange(format!("integer value too large to represent: {text}"))
    })
}

/// Convert the text of a `Float` token.
pub fn parse_float(text: &str) -> Result<f64, EvalError> {
    let x: f64 = text
        .parse()
        .map_err(|_| EvalError::NumberSyntax(format!("expected floating-point number but got \"{text}\"")))?;
    if x.is_infinite() {
        return Err(EvalError::NumberRange(format!(
            "floating-point value too large to represent: {text}"
        )));
    }
    Ok(x)
}

fn parse_magnitude(text: &str) -> Result<u64, EvalError> {
    let (digits, radix) = if let Some(hex) = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
    {
        (hex, 16)
    } else if text.len() > 1 && text.starts_with('0') {
        (&text[1..], 8)
    } else {
        (text, 10)
    };
    if !digits.chars().all(|c| c.is_digit(radix)) || digits.is_empty() {
        let what = match radix {
            16 => "hexadecimal",
            8 => "octal",
            _ => "decimal",
        };
        return Err(EvalError::NumberSyntax(format!(
            "expected integer but got \"{text}\" (looks like invalid {what} number)"
        )));
    }
    u64::from_str_radix(digits, radix).map_err(|_| {
        EvalError::NumberRange(format!("integer value too large to represent: {text}"))
    })
}

/// Interpret text as a boolean.
///
/// Numeric text is true when non-zero.  Otherwise the words
/// `true/yes/on` and `false/no/off` are accepted in any case.
pub fn eval_boolean(text: &str) -> Result<bool, EvalError> {
    match coerce_number(text) {
        Value::Int(n) => return Ok(n != 0),
        Value::Float(x) => return Ok(x != 0.0),
        Value::Str(_) => {}
    }
    match text.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" => Ok(true),
        "false" | "no" | "off" => Ok(false),
        _ => Err(EvalError::BooleanSyntax(text.to_owned())),
    }
}

/// Decode backslash escapes.
///
/// | Escape   | Meaning                          |
/// |----------|----------------------------------|
/// | `\a` `\b` `\f` `\n` `\r` `\t` `\v` `\\` | control chars, backslash |
/// | `\0oo`   | octal byte (two octal digits)    |
/// | `\xHH`   | hex byte (two hex digits)        |
/// | `\uHHHH` | Unicode scalar (four hex digits) |
///
/// Any other escaped char stands for itself; a trailing lone backslash is
/// kept.  Text without a backslash is returned unchanged.
pub fn eval_string(text: &str) -> Result<String, EvalError> {
    if !text.contains('\\') {
        return Ok(text.to_owned());
    }
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let Some(esc) = chars.next() else {
            out.push('\\');
            break;
        };
        match esc {
            'a' => out.push('\x07'),
            'b' => out.push('\x08'),
            'f' => out.push('\x0c'),
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            'v' => out.push('\x0b'),
            '0' => out.push(escape_code(&mut chars, 2, 8, text)?),
            'x' => out.push(escape_code(&mut chars, 2, 16, text)?),
            'u' => out.push(escape_code(&mut chars, 4, 16, text)?),
            other => out.push(other),
        }
    }
    Ok(out)
}

fn escape_code(
    chars: &mut std::str::Chars<'_>,
    len: usize,
    radix: u32,
    text: &str,
) -> Result<char, EvalError> {
    let digits: String = chars.by_ref().take(len).collect();
    let bad = || EvalError::NumberSyntax(format!("invalid escape sequence in \"{text}\""));
    if digits.chars().count() != len || !digits.chars().all(|c| c.is_digit(radix)) {
        return Err(bad());
    }
    let code = u32::from_str_radix(&digits, radix).map_err(|_| bad())?;
    char::from_u32(code).ok_or_else(bad)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
