use proptest::prelude::*;
use tcl::script::scanner::Scanner;
use tcl::script::stmt::parse_script;
use tcl::script::token::TokenKind;
use tcl::script::value::{coerce_number, Value};
use tcl::script::{evaluate_expression, EvalError};
use tcl::var::VarStore;

fn eval(src: &str) -> Result<Value, EvalError> {
    let mut vars: VarStore = [("x", "7"), ("s", "text")].into_iter().collect();
    evaluate_expression(src, &mut vars)
}

proptest! {
    /// Both scanner modes end with exactly one EOF or error token, and every
    /// other token is the slice of input it claims to be.
    #[test]
    fn scanner_terminates_and_tracks_offsets(s in "\\PC*") {
        for scanner in [Scanner::statement(&s), Scanner::expression(&s)] {
            let toks: Vec<_> = scanner.collect();
            let (last, rest) = toks.split_last().expect("at least one token");
            prop_assert!(last.is_terminal());
            for tok in rest {
                prop_assert!(!tok.is_terminal());
                prop_assert_eq!(&s[tok.offset..tok.end()], tok.text);
            }
        }
    }

    /// Scripts built from the language's own punctuation never panic.
    #[test]
    fn scanner_handles_punctuation_soup(s in "[\\[\\]{}\"$\\\\;\n a-z0-9().,+*-]{0,64}") {
        let last = Scanner::statement(&s).last().expect("at least one token");
        prop_assert!(matches!(last.kind, TokenKind::Eof | TokenKind::Error));
        let _ = parse_script(&s);
    }

    /// The evaluator returns a value or an error for any input.
    #[test]
    fn evaluator_does_not_panic(s in "\\PC{0,64}") {
        let _ = eval(&s);
    }

    #[test]
    fn evaluator_handles_expression_soup(s in "[0-9x$(),+*/%<>=!~&|^ .e-]{0,48}|max\\([0-9, ]{0,12}\\)") {
        let _ = eval(&s);
    }

    #[test]
    fn integer_arithmetic_wraps(a in any::<i64>(), b in any::<i64>()) {
        prop_assert_eq!(eval(&format!("{{{a}}} + {{{b}}}")), Ok(Value::Int(a.wrapping_add(b))));
        prop_assert_eq!(eval(&format!("{{{a}}} - {{{b}}}")), Ok(Value::Int(a.wrapping_sub(b))));
        prop_assert_eq!(eval(&format!("{{{a}}} * {{{b}}}")), Ok(Value::Int(a.wrapping_mul(b))));
    }

    #[test]
    fn integer_division_truncates(a in any::<i64>(), b in any::<i64>().prop_filter("non-zero", |b| *b != 0)) {
        prop_assert_eq!(eval(&format!("{{{a}}} / {{{b}}}")), Ok(Value::Int(a.wrapping_div(b))));
        prop_assert_eq!(eval(&format!("{{{a}}} % {{{b}}}")), Ok(Value::Int(a.wrapping_rem(b))));
    }

    #[test]
    fn coerce_reads_back_formatted_integers(n in any::<i64>()) {
        prop_assert_eq!(coerce_number(&n.to_string()), Value::Int(n));
    }

    #[test]
    fn coerce_reads_back_formatted_floats(x in any::<f64>().prop_filter("finite", |x| x.is_finite())) {
        prop_assert_eq!(coerce_number(&Value::Float(x).to_string()), Value::Float(x));
    }

    #[test]
    fn script_words_are_source_slices(s in "[a-z${}\\[\\] ;\n\"]{0,48}") {
        if let Ok(commands) = parse_script(&s) {
            for cmd in &commands {
                prop_assert!(!cmd.words.is_empty());
                for word in &cmd.words {
                    prop_assert_eq!(&s[word.offset..word.offset + word.text.len()], word.text);
                }
            }
        }
    }
}
