//! String-valued variable table usable as an expression context.
//!
//! Holds plain `name → text` bindings with no scopes or arrays.  As an
//! [`EvalContext`] it answers `$name` lookups and rejects every `[command]`,
//! since it has no command table of its own.

use std::collections::HashMap;

use crate::script::error::EvalError;
use crate::script::expr::EvalContext;
use crate::script::value::{coerce_number, Value};

/// Key/value variable store.
#[derive(Debug, Default, Clone)]
pub struct VarStore {
    vars: HashMap<String, String>,
}

impl VarStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set (or overwrite) a variable.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// The variable read as an integer in any literal form the evaluator
    /// accepts (`42`, `-7`, `0x1f`, `017`).
    pub fn get_int(&self, name: &str) -> Option<i64> {
        match coerce_number(self.vars.get(name)?) {
            Value::Int(n) => Some(n),
            _ => None,
        }
    }

    /// Remove a variable.  Returns `true` if it existed.
    pub fn unset(&mut self, name: &str) -> bool {
        self.vars.remove(name).is_some()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.vars.iter()
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for VarStore {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        VarStore {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl EvalContext for VarStore {
    fn get_variable(&mut self, name: &str) -> Result<String, EvalError> {
        self.vars
            .get(name)
            .cloned()
            .ok_or_else(|| EvalError::Lookup(format!("can't read \"{name}\": no such variable")))
    }

    fn evaluate_command(&mut self, text: &str) -> Result<String, EvalError> {
        let name = text.split_whitespace().next().unwrap_or(text);
        Err(EvalError::Command(format!("invalid command name \"{name}\"")))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::expr::evaluate_expression;

    #[test]
    fn set_and_get() {
        let mut vars = VarStore::new();
        vars.set("width", "80");
        assert_eq!(vars.get("width"), Some("80"));
    }

    #[test]
    fn overwrite() {
        let mut vars = VarStore::new();
        vars.set("x", "old");
        vars.set("x", "new");
        assert_eq!(vars.get("x"), Some("new"));
        assert_eq!(vars.len(), 1);
    }

    #[test]
    fn get_int_accepts_literal_forms() {
        let vars: VarStore = [("a", "8"), ("b", "0x1f"), ("c", "-017"), ("d", "2.5")]
            .into_iter()
            .collect();
        assert_eq!(vars.get_int("a"), Some(8));
        assert_eq!(vars.get_int("b"), Some(31));
        assert_eq!(vars.get_int("c"), Some(-15));
        assert_eq!(vars.get_int("d"), None);
        assert_eq!(vars.get_int("missing"), None);
    }

    #[test]
    fn unset() {
        let mut vars = VarStore::new();
        vars.set("gone", "bye");
        assert!(vars.unset("gone"));
        assert_eq!(vars.get("gone"), None);
        assert!(!vars.unset("gone"));
        assert!(vars.is_empty());
    }

    #[test]
    fn contains_and_iter() {
        let mut vars = VarStore::new();
        vars.set("present", "yes");
        assert!(vars.contains("present"));
        assert!(!vars.contains("absent"));
        let all: Vec<_> = vars.iter().collect();
        assert_eq!(all, vec![(&"present".to_owned(), &"yes".to_owned())]);
    }

    #[test]
    fn lookup_errors() {
        let mut vars = VarStore::new();
        assert_eq!(
            vars.get_variable("x"),
            Err(EvalError::Lookup("can't read \"x\": no such variable".into()))
        );
        assert_eq!(
            vars.evaluate_command("puts hi"),
            Err(EvalError::Command("invalid command name \"puts\"".into()))
        );
    }

    #[test]
    fn drives_the_evaluator() {
        let mut vars: VarStore = [("x", "6"), ("name", "abc")].into_iter().collect();
        assert_eq!(evaluate_expression("$x * 7", &mut vars), Ok(Value::Int(42)));
        assert_eq!(
            evaluate_expression("$name eq {abc}", &mut vars),
            Ok(Value::Int(1))
        );
        assert!(matches!(
            evaluate_expression("[clock seconds]", &mut vars),
            Err(EvalError::Command(_))
        ));
    }
}
