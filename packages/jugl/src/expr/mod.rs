//! The template expression language
//!
//! A small, side-effect free subset of script syntax: literals, identifiers resolved against the
//! element's [`Scope`] and then [`Globals`], member access and indexing, calls, and the usual
//! unary, binary, logical and conditional operators.

mod ast;
mod builtins;
mod eval;
mod lexer;
mod parser;

use std::collections::HashMap;
use std::sync::Arc;

pub use ast::{BinaryOp, Expr, LogicalOp, UnaryOp};
pub use builtins::builtin_functions;
pub use eval::{Environment, evaluate};
pub use lexer::{Token, TokenType, tokenize};
pub use parser::parse_expression;

use crate::error::EvalResult;
use crate::scope::Scope;
use crate::value::{Function, Map, Value};

/// Names resolvable from every template, after the element's own scope.
#[derive(Debug, Clone)]
pub struct Globals {
    values: Map,
}

impl Default for Globals {
    /// The built-in helper functions (`len`, `range`, `upper`, ...)
    fn default() -> Self {
        Self {
            values: builtins::builtin_globals(),
        }
    }
}

impl Globals {
    /// No names at all, not even the built-in helpers.
    pub fn empty() -> Self {
        Self { values: Map::new() }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn insert_function(
        &mut self,
        name: &str,
        func: impl Fn(&[Value]) -> EvalResult<Value> + Send + Sync + 'static,
    ) {
        self.values
            .insert(name.to_string(), Value::Function(Function::new(name, func)));
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.values.shift_remove(name)
    }
}

/// Resolves identifiers against a scope first, then globals.
pub struct ScopeEnv<'a> {
    pub scope: &'a Scope,
    pub globals: &'a Globals,
}

impl Environment for ScopeEnv<'_> {
    fn lookup(&self, name: &str) -> Option<Value> {
        self.scope
            .get(name)
            .or_else(|| self.globals.get(name))
            .cloned()
    }
}

/// Parse and evaluate `source` in one go.
pub fn eval_str(source: &str, scope: &Scope, globals: &Globals) -> EvalResult<Value> {
    let expr = parse_expression(source)?;
    evaluate(&expr, &ScopeEnv { scope, globals })
}

/// Parsed expressions keyed by source text, so a `repeat` body is only parsed once.
#[derive(Default)]
pub(crate) struct ExpressionCache {
    parsed: HashMap<String, Arc<Expr>>,
}

impl ExpressionCache {
    pub(crate) fn get_or_parse(&mut self, source: &str) -> EvalResult<Arc<Expr>> {
        if let Some(expr) = self.parsed.get(source) {
            return Ok(expr.clone());
        }
        let expr = Arc::new(parse_expression(source)?);
        self.parsed.insert(source.to_string(), expr.clone());
        Ok(expr)
    }

    pub(crate) fn eval(
        &mut self,
        source: &str,
        scope: &Scope,
        globals: &Globals,
    ) -> EvalResult<Value> {
        let expr = self.get_or_parse(source)?;
        evaluate(&expr, &ScopeEnv { scope, globals })
    }
}
