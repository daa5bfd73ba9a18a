//! Mapper expression evaluation on MiniJinja
//!
//! Mapper `test` attributes use OGNL. The subset that matters here
//! (comparisons, `null`, boolean operators, property paths) maps onto
//! MiniJinja expressions after a token-level translation. Anything the
//! translation cannot express fails to compile or evaluate; such conditions
//! count as true so the guarded fragment is still validated.

use crate::params::{SENTINEL, SampleParams};
use indexmap::IndexMap;
use minijinja::value::{Object, ObjectRepr};
use minijinja::{Environment, Value};
use std::sync::Arc;

/// Evaluates mapper expressions against a synthetic parameter object
pub struct ExpressionEvaluator {
    env: Environment<'static>,
}

impl std::fmt::Debug for ExpressionEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpressionEvaluator").finish_non_exhaustive()
    }
}

impl ExpressionEvaluator {
    pub fn new() -> Self {
        Self {
            env: Environment::new(),
        }
    }

    /// Evaluate a condition. Errors count as true.
    pub fn test(&self, expression: &str, scope: &Value) -> bool {
        match self.eval(expression, scope) {
            Ok(value) => value.is_true(),
            Err(err) => {
                tracing::debug!(expression, error = %err, "condition not evaluable, assuming true");
                true
            }
        }
    }

    /// Evaluate a value expression. Errors yield the sentinel.
    pub fn value(&self, expression: &str, scope: &Value) -> Value {
        match self.eval(expression, scope) {
            Ok(value) if !value.is_undefined() => value,
            Ok(_) => Value::from(SENTINEL),
            Err(err) => {
                tracing::debug!(expression, error = %err, "expression not evaluable, using sentinel");
                Value::from(SENTINEL)
            }
        }
    }

    fn eval(&self, expression: &str, scope: &Value) -> Result<Value, minijinja::Error> {
        let translated = translate_ognl(expression);
        let compiled = self.env.compile_expression(&translated)?;
        compiled.eval(scope)
    }
}

impl Default for ExpressionEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

/// Rewrite OGNL operators and literals into MiniJinja syntax.
///
/// String literals are copied untouched.
pub fn translate_ognl(expression: &str) -> String {
    let chars: Vec<char> = expression.chars().collect();
    let mut out = String::with_capacity(expression.len() + 8);
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '\'' | '"' => {
                let quote = c;
                out.push(c);
                i += 1;
                while i < chars.len() {
                    out.push(chars[i]);
                    if chars[i] == '\\' && i + 1 < chars.len() {
                        out.push(chars[i + 1]);
                        i += 2;
                        continue;
                    }
                    i += 1;
                    if chars[i - 1] == quote {
                        break;
                    }
                }
            }
            '&' if chars.get(i + 1) == Some(&'&') => {
                out.push_str(" and ");
                i += 2;
            }
            '|' if chars.get(i + 1) == Some(&'|') => {
                out.push_str(" or ");
                i += 2;
            }
            '!' if chars.get(i + 1) != Some(&'=') => {
                out.push_str(" not ");
                i += 1;
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                let after_dot = start > 0 && chars[start - 1] == '.';
                if after_dot {
                    out.push_str(&word);
                } else {
                    out.push_str(translate_word(&word));
                }
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }

    out
}

fn translate_word(word: &str) -> &str {
    match word {
        "null" => "none",
        "eq" => "==",
        "neq" => "!=",
        "lt" => "<",
        "gt" => ">",
        "lte" => "<=",
        "gte" => ">=",
        "AND" => "and",
        "OR" => "or",
        _ => word,
    }
}

/// Lookup scope for one expression: local bindings first, then the root object
#[derive(Debug)]
pub(crate) struct Scope {
    locals: IndexMap<String, Value>,
    root: Arc<SampleParams>,
}

impl Scope {
    pub(crate) fn value(locals: &IndexMap<String, Value>, root: &Arc<SampleParams>) -> Value {
        Value::from_object(Self {
            locals: locals.clone(),
            root: root.clone(),
        })
    }
}

impl Object for Scope {
    fn repr(self: &Arc<Self>) -> ObjectRepr {
        ObjectRepr::Map
    }

    fn get_value(self: &Arc<Self>, key: &Value) -> Option<Value> {
        let name = key.as_str()?;
        if let Some(local) = self.locals.get(name) {
            return Some(local.clone());
        }
        match name {
            "_parameter" => Some(Value::from_dyn_object(self.root.clone())),
            "_databaseId" => Some(Value::from(())),
            _ => Some(self.root.get(name).to_value()),
        }
    }

    fn is_true(self: &Arc<Self>) -> bool {
        true
    }
}
