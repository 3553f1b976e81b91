use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::TemplateError;
use crate::value::{Map, Value};

/// Name under which per-loop [`RepeatStatus`] objects are exposed.
pub const REPEAT_VARIABLE: &str = "repeat";

/// Loop metadata for one iteration of a `repeat` statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepeatStatus {
    pub index: usize,
    pub length: usize,
}

impl RepeatStatus {
    pub fn new(index: usize, length: usize) -> Self {
        Self { index, length }
    }

    /// 1-based position
    pub fn number(&self) -> usize {
        self.index + 1
    }

    pub fn is_even(&self) -> bool {
        self.index % 2 == 0
    }

    pub fn is_odd(&self) -> bool {
        !self.is_even()
    }

    pub fn is_start(&self) -> bool {
        self.index == 0
    }

    pub fn is_end(&self) -> bool {
        self.index + 1 == self.length
    }

    pub fn to_value(&self) -> Value {
        Value::object([
            ("index", Value::from(self.index)),
            ("number", Value::from(self.number())),
            ("even", Value::from(self.is_even())),
            ("odd", Value::from(self.is_odd())),
            ("start", Value::from(self.is_start())),
            ("end", Value::from(self.is_end())),
            ("length", Value::from(self.length)),
        ])
    }
}

/// Variable bindings visible to an element's expressions.
///
/// Every element gets its own copy of its parent's scope, so definitions only ever flow down
/// the tree. Values are reference counted and copying is shallow.
#[derive(Debug, Clone, PartialEq)]
pub struct Scope {
    vars: Map,
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

impl Scope {
    /// An empty scope holding only the (empty) `repeat` object.
    pub fn new() -> Self {
        let mut vars = IndexMap::new();
        vars.insert(String::from(REPEAT_VARIABLE), Value::object::<String>([]));
        Self { vars }
    }

    /// Build a scope from a context object. Anything other than an object (or `undefined`) is
    /// rejected.
    pub fn from_value(context: Value) -> Result<Self, TemplateError> {
        let mut scope = Scope::new();
        match context {
            Value::Undefined | Value::Null => {}
            Value::Object(map) => {
                for (key, value) in map.iter() {
                    scope.set(key, value.clone());
                }
            }
            other => return Err(TemplateError::InvalidContext(other.type_name().to_string())),
        }
        Ok(scope)
    }

    /// Build a scope from JSON, e.g. `serde_json::json!({"items": [1, 2]})`.
    pub fn from_json(context: serde_json::Value) -> Result<Self, TemplateError> {
        Self::from_value(Value::from(context))
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.vars.insert(name.into(), value.into());
    }

    /// Remove a variable, keeping the order of the rest.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.vars.shift_remove(name)
    }

    /// Builder-style [`Scope::set`]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// Record loop metadata for the loop variable `key`, visible as `repeat.<key>`.
    pub fn set_repeat(&mut self, key: &str, status: RepeatStatus) {
        let repeat = self
            .vars
            .entry(String::from(REPEAT_VARIABLE))
            .or_insert_with(|| Value::object::<String>([]));
        match repeat {
            Value::Object(map) => {
                Arc::make_mut(map).insert(key.to_string(), status.to_value());
            }
            // `repeat` was shadowed by a plain value; loop metadata takes it back
            other => *other = Value::object([(key, status.to_value())]),
        }
    }

    pub fn repeat_status(&self, key: &str) -> Option<&Value> {
        self.vars.get(REPEAT_VARIABLE)?.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.vars.iter()
    }
}
