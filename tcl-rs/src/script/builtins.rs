//! Built-in math functions callable from expressions.
//!
//! The table is fixed and built once on first use.  Each function receives
//! already-evaluated, already-coerced arguments; arity is checked by
//! [`call_function`] before dispatch, argument types by the function itself.
//!
//! | Function        | Args  | Result                                       |
//! |-----------------|-------|----------------------------------------------|
//! | `abs(x)`        | 1     | same type as `x`                             |
//! | `bool(x)`       | 1     | `0`/`1`; also accepts `yes`, `off`, …        |
//! | `ceil(x)`       | 1     | float                                        |
//! | `double(x)`     | 1     | float                                        |
//! | `exp(x)`        | 1     | float                                        |
//! | `floor(x)`      | 1     | float                                        |
//! | `fmod(x, y)`    | 2     | float                                        |
//! | `log(x)`        | 1     | float                                        |
//! | `log10(x)`      | 1     | float                                        |
//! | `max(x, …)`     | 1+    | integer if every arg is an integer, else float |
//! | `min(x, …)`     | 1+    | integer if every arg is an integer, else float |
//! | `pow(x, y)`     | 2     | float                                        |
//! | `rand()`        | 0     | float in `[0, 1)`                            |
//! | `round(x)`      | 1     | integer, ties to even                        |
//! | `sqrt(x)`       | 1     | float                                        |
//! | `srand(n)`      | 1     | reseeds, then like `rand()`                  |

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::LazyLock;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::error::EvalError;
use super::value::{eval_boolean, Value};

type Handler = fn(&str, &[Value]) -> Result<Value, EvalError>;

#[derive(Clone, Copy)]
struct MathFunc {
    min_args: usize,
    /// `None` for variadic functions.
    max_args: Option<usize>,
    call: Handler,
}

impl MathFunc {
    const fn fixed(n: usize, call: Handler) -> Self {
        MathFunc {
            min_args: n,
            max_args: Some(n),
            call,
        }
    }

    const fn variadic(min_args: usize, call: Handler) -> Self {
        MathFunc {
            min_args,
            max_args: None,
            call,
        }
    }
}

static FUNCTIONS: LazyLock<HashMap<&'static str, MathFunc>> = LazyLock::new(|| {
    let mut map = HashMap::new();
    map.insert("abs", MathFunc::fixed(1, abs));
    map.insert("bool", MathFunc::fixed(1, to_bool));
    map.insert("ceil", MathFunc::fixed(1, |n, a| unary_float(n, a, f64::ceil)));
    map.insert("double", MathFunc::fixed(1, |n, a| unary_float(n, a, |x| x)));
    map.insert("exp", MathFunc::fixed(1, |n, a| unary_float(n, a, f64::exp)));
    map.insert("floor", MathFunc::fixed(1, |n, a| unary_float(n, a, f64::floor)));
    map.insert("fmod", MathFunc::fixed(2, fmod));
    map.insert("log", MathFunc::fixed(1, |n, a| unary_float(n, a, f64::ln)));
    map.insert("log10", MathFunc::fixed(1, |n, a| unary_float(n, a, f64::log10)));
    map.insert("max", MathFunc::variadic(1, |n, a| extreme(n, a, std::cmp::Ordering::Greater)));
    map.insert("min", MathFunc::variadic(1, |n, a| extreme(n, a, std::cmp::Ordering::Less)));
    map.insert("pow", MathFunc::fixed(2, pow));
    map.insert("rand", MathFunc::fixed(0, |_, _| Ok(Value::Float(next_random()))));
    map.insert("round", MathFunc::fixed(1, round));
    map.insert("sqrt", MathFunc::fixed(1, |n, a| unary_float(n, a, f64::sqrt)));
    map.insert("srand", MathFunc::fixed(1, srand));
    map
});

thread_local! {
    static RNG: RefCell<StdRng> = RefCell::new(StdRng::from_entropy());
}

/// Call the math function `name` with evaluated arguments.
pub fn call_function(name: &str, args: &[Value]) -> Result<Value, EvalError> {
    let func = FUNCTIONS
        .get(name)
        .ok_or_else(|| EvalError::Operator(format!("unknown math function \"{name}\"")))?;
    if args.len() < func.min_args {
        return Err(EvalError::Operand(format!(
            "too few arguments for math function \"{name}\""
        )));
    }
    if func.max_args.is_some_and(|max| args.len() > max) {
        return Err(EvalError::Operand(format!(
            "too many arguments for math function \"{name}\""
        )));
    }
    (func.call)(name, args)
}

// ── Argument helpers ──────────────────────────────────────────────────────────

fn not_numeric(name: &str) -> EvalError {
    EvalError::Operand(format!(
        "argument to math function \"{name}\" didn't have numeric value"
    ))
}

fn get_float(args: &[Value], idx: usize, name: &str) -> Result<f64, EvalError> {
    args.get(idx)
        .and_then(Value::as_f64)
        .ok_or_else(|| not_numeric(name))
}

/// Reject results that are NaN when no argument was.
fn checked_float(inputs: &[f64], result: f64) -> Result<Value, EvalError> {
    if result.is_nan() && !inputs.iter().any(|x| x.is_nan()) {
        return Err(EvalError::NumberRange(
            "domain error: argument not in valid range".into(),
        ));
    }
    Ok(Value::Float(result))
}

// ── Functions ─────────────────────────────────────────────────────────────────

fn abs(name: &str, args: &[Value]) -> Result<Value, EvalError> {
    match &args[0] {
        Value::Int(n) => Ok(Value::Int(n.wrapping_abs())),
        Value::Float(x) => Ok(Value::Float(x.abs())),
        Value::Str(_) => Err(not_numeric(name)),
    }
}

fn to_bool(name: &str, args: &[Value]) -> Result<Value, EvalError> {
    let b = match &args[0] {
        Value::Str(s) => eval_boolean(s).map_err(|_| not_numeric(name))?,
        v => v.as_boolean()?,
    };
    Ok(Value::from(b))
}

fn unary_float(name: &str, args: &[Value], f: fn(f64) -> f64) -> Result<Value, EvalError> {
    let x = get_float(args, 0, name)?;
    checked_float(&[x], f(x))
}

fn fmod(name: &str, args: &[Value]) -> Result<Value, EvalError> {
    let x = get_float(args, 0, name)?;
    let y = get_float(args, 1, name)?;
    if y == 0.0 {
        return Err(EvalError::NumberRange(
            "domain error: argument not in valid range".into(),
        ));
    }
    checked_float(&[x, y], x % y)
}

fn pow(name: &str, args: &[Value]) -> Result<Value, EvalError> {
    let x = get_float(args, 0, name)?;
    let y = get_float(args, 1, name)?;
    checked_float(&[x, y], x.powf(y))
}

/// `max`/`min`: integers stay integers only when every argument is one.
fn extreme(name: &str, args: &[Value], want: std::cmp::Ordering) -> Result<Value, EvalError> {
    if args.iter().all(|v| matches!(v, Value::Int(_))) {
        let ints = args.iter().filter_map(|v| match v {
            Value::Int(n) => Some(*n),
            _ => None,
        });
        let best = ints.reduce(|best, n| if n.cmp(&best) == want { n } else { best });
        return best.map(Value::Int).ok_or_else(|| not_numeric(name));
    }
    let mut best: Option<f64> = None;
    for idx in 0..args.len() {
        let x = get_float(args, idx, name)?;
        best = Some(match best {
            Some(b) if x.partial_cmp(&b) != Some(want) => b,
            _ => x,
        });
    }
    best.map(Value::Float).ok_or_else(|| not_numeric(name))
}

fn round(name: &str, args: &[Value]) -> Result<Value, EvalError> {
    let x = match &args[0] {
        Value::Int(n) => return Ok(Value::Int(*n)),
        Value::Float(x) => *x,
        Value::Str(_) => return Err(not_numeric(name)),
    };
    if x.is_nan() {
        return Err(EvalError::NumberRange(
            "floating-point value is Not a Number".into(),
        ));
    }
    let r = round_half_even(x);
    // i64::MIN is exactly representable; i64::MAX + 1 is the first value out.
    if !(r >= i64::MIN as f64 && r < -(i64::MIN as f64)) {
        return Err(EvalError::NumberRange(
            "integer value too large to represent".into(),
        ));
    }
    Ok(Value::Int(r as i64))
}

/// Truncate below one half, round away from zero above, ties to even.
fn round_half_even(x: f64) -> f64 {
    let t = x.trunc();
    let frac = (x - t).abs();
    if frac < 0.5 {
        t
    } else if frac > 0.5 || t % 2.0 != 0.0 {
        t + x.signum()
    } else {
        t
    }
}

fn srand(name: &str, args: &[Value]) -> Result<Value, EvalError> {
    let seed = match &args[0] {
        Value::Int(n) => *n,
        Value::Float(_) => {
            return Err(EvalError::Operand(format!(
                "can't use floating-point value as argument to \"{name}\""
            )))
        }
        Value::Str(_) => return Err(not_numeric(name)),
    };
    RNG.with(|rng| *rng.borrow_mut() = StdRng::seed_from_u64(seed as u64));
    Ok(Value::Float(next_random()))
}

fn next_random() -> f64 {
    RNG.with(|rng| rng.borrow_mut().gen::<f64>())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, args: Vec<Value>) -> Value {
        call_function(name, &args).unwrap_or_else(|e| panic!("{name}: {e}"))
    }

    fn call_err(name: &str, args: Vec<Value>) -> EvalError {
        call_function(name, &args).expect_err(name)
    }

    #[test]
    fn table_is_fixed() {
        let mut names: Vec<_> = FUNCTIONS.keys().copied().collect();
        names.sort_unstable();
        assert_eq!(
            names,
            vec![
                "abs", "bool", "ceil", "double", "exp", "floor", "fmod", "log", "log10", "max",
                "min", "pow", "rand", "round", "sqrt", "srand"
            ]
        );
        assert!(!FUNCTIONS.contains_key("sin"));
    }

    #[test]
    fn unknown_function() {
        assert!(matches!(
            call_err("sin", vec![Value::Int(1)]),
            EvalError::Operator(_)
        ));
    }

    #[test]
    fn abs_validation() {
        assert_eq!(call("abs", vec![Value::Int(-5)]), Value::Int(5));
        assert_eq!(call("abs", vec![Value::Float(-1.5)]), Value::Float(1.5));
        assert!(matches!(call_err("abs", vec![]), EvalError::Operand(_)));
        assert!(matches!(
            call_err("abs", vec![Value::Int(1), Value::Int(2)]),
            EvalError::Operand(_)
        ));
        assert!(matches!(
            call_err("abs", vec![Value::Str("a".into())]),
            EvalError::Operand(_)
        ));
    }

    #[test]
    fn round_half_to_even() {
        let r = |x: f64| call("round", vec![Value::Float(x)]);
        assert_eq!(r(2.5), Value::Int(2));
        assert_eq!(r(-2.5), Value::Int(-2));
        assert_eq!(r(3.5), Value::Int(4));
        assert_eq!(r(-3.5), Value::Int(-4));
        assert_eq!(r(2.1), Value::Int(2));
        assert_eq!(r(2.9), Value::Int(3));
        assert_eq!(r(-2.9), Value::Int(-3));
        assert_eq!(r(0.4), Value::Int(0));
        assert_eq!(call("round", vec![Value::Int(7)]), Value::Int(7));
    }

    #[test]
    fn round_rejects_non_finite() {
        for x in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY, 1e300] {
            assert!(matches!(
                call_err("round", vec![Value::Float(x)]),
                EvalError::NumberRange(_)
            ));
        }
    }

    #[test]
    fn max_min_types() {
        assert_eq!(
            call("max", vec![Value::Int(1), Value::Int(7), Value::Int(3)]),
            Value::Int(7)
        );
        assert_eq!(
            call("min", vec![Value::Int(4), Value::Int(-2)]),
            Value::Int(-2)
        );
        assert_eq!(
            call("max", vec![Value::Int(1), Value::Float(0.5)]),
            Value::Float(1.0)
        );
        assert_eq!(call("min", vec![Value::Float(2.5)]), Value::Float(2.5));
        assert!(matches!(call_err("max", vec![]), EvalError::Operand(_)));
        assert!(matches!(
            call_err("max", vec![Value::Int(1), Value::Str("x".into())]),
            EvalError::Operand(_)
        ));
    }

    #[test]
    fn float_functions() {
        assert_eq!(call("sqrt", vec![Value::Int(16)]), Value::Float(4.0));
        assert_eq!(call("double", vec![Value::Int(3)]), Value::Float(3.0));
        assert_eq!(call("ceil", vec![Value::Float(1.2)]), Value::Float(2.0));
        assert_eq!(call("floor", vec![Value::Float(-1.2)]), Value::Float(-2.0));
        match call("log10", vec![Value::Int(1000)]) {
            Value::Float(x) => assert!((x - 3.0).abs() < 1e-12),
            other => panic!("log10 returned {other:?}"),
        }
        assert_eq!(call("exp", vec![Value::Int(0)]), Value::Float(1.0));
        assert_eq!(call("log", vec![Value::Int(1)]), Value::Float(0.0));
        assert_eq!(
            call("pow", vec![Value::Int(2), Value::Int(10)]),
            Value::Float(1024.0)
        );
        assert_eq!(
            call("fmod", vec![Value::Float(7.5), Value::Int(2)]),
            Value::Float(1.5)
        );
    }

    #[test]
    fn domain_errors() {
        assert!(matches!(
            call_err("sqrt", vec![Value::Int(-1)]),
            EvalError::NumberRange(_)
        ));
        assert!(matches!(
            call_err("fmod", vec![Value::Int(1), Value::Int(0)]),
            EvalError::NumberRange(_)
        ));
    }

    #[test]
    fn bool_accepts_words() {
        assert_eq!(call("bool", vec![Value::Str("yes".into())]), Value::Int(1));
        assert_eq!(call("bool", vec![Value::Str("Off".into())]), Value::Int(0));
        assert_eq!(call("bool", vec![Value::Float(0.5)]), Value::Int(1));
        assert!(matches!(
            call_err("bool", vec![Value::Str("maybe".into())]),
            EvalError::Operand(_)
        ));
    }

    #[test]
    fn rand_in_unit_interval() {
        for _ in 0..100 {
            match call("rand", vec![]) {
                Value::Float(x) => assert!((0.0..1.0).contains(&x)),
                other => panic!("rand returned {other:?}"),
            }
        }
    }

    #[test]
    fn srand_is_deterministic() {
        let a = call("srand", vec![Value::Int(42)]);
        let a2 = call("rand", vec![]);
        let b = call("srand", vec![Value::Int(42)]);
        let b2 = call("rand", vec![]);
        assert_eq!(a, b);
        assert_eq!(a2, b2);
        assert!(matches!(
            call_err("srand", vec![Value::Float(1.0)]),
            EvalError::Operand(_)
        ));
    }
}
