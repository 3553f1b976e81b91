use std::cmp::Ordering;
use std::sync::Arc;

use super::ast::{BinaryOp, Expr, LogicalOp, UnaryOp};
use super::builtins;
use crate::error::{EvalError, EvalResult};
use crate::value::{Map, Value};

/// Name resolution for free identifiers in an expression.
pub trait Environment {
    fn lookup(&self, name: &str) -> Option<Value>;
}

pub fn evaluate(expr: &Expr, env: &dyn Environment) -> EvalResult<Value> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Identifier(name) => env
            .lookup(name)
            .ok_or_else(|| EvalError::UndefinedVariable(name.clone())),
        Expr::Array(items) => {
            let items = items
                .iter()
                .map(|item| evaluate(item, env))
                .collect::<EvalResult<Vec<_>>>()?;
            Ok(Value::Array(Arc::new(items)))
        }
        Expr::Object(entries) => {
            let mut map = Map::with_capacity(entries.len());
            for (key, value) in entries {
                map.insert(key.clone(), evaluate(value, env)?);
            }
            Ok(Value::from(map))
        }
        Expr::Member { object, property } => {
            let object = evaluate(object, env)?;
            get_property(&object, property)
        }
        Expr::Index { object, index } => {
            let object = evaluate(object, env)?;
            let index = evaluate(index, env)?;
            get_index(&object, &index)
        }
        Expr::Call { callee, args } => call(callee, args, env),
        Expr::Unary { op, operand } => {
            let operand = evaluate(operand, env)?;
            Ok(match op {
                UnaryOp::Not => Value::Bool(!operand.is_truthy()),
                UnaryOp::Minus => Value::Number(-operand.to_number()),
                UnaryOp::Plus => Value::Number(operand.to_number()),
            })
        }
        Expr::Binary { op, left, right } => {
            let left = evaluate(left, env)?;
            let right = evaluate(right, env)?;
            Ok(binary(*op, &left, &right))
        }
        Expr::Logical { op, left, right } => {
            let left = evaluate(left, env)?;
            match (op, left.is_truthy()) {
                (LogicalOp::And, false) | (LogicalOp::Or, true) => Ok(left),
                _ => evaluate(right, env),
            }
        }
        Expr::Conditional {
            test,
            consequent,
            alternate,
        } => {
            if evaluate(test, env)?.is_truthy() {
                evaluate(consequent, env)
            } else {
                evaluate(alternate, env)
            }
        }
    }
}

fn call(callee: &Expr, args: &[Expr], env: &dyn Environment) -> EvalResult<Value> {
    // Method calls need the receiver, so evaluate `object.method` by hand
    if let Expr::Member { object, property } = callee {
        let receiver = evaluate(object, env)?;
        let args = evaluate_args(args, env)?;
        if let Some(Value::Function(func)) = receiver.as_object().and_then(|map| map.get(property))
        {
            return func.call(&args);
        }
        if receiver.is_nullish() {
            return Err(EvalError::type_error(format!(
                "cannot call '{property}' on {}",
                receiver.type_name()
            )));
        }
        return builtins::call_method(&receiver, property, &args)
            .unwrap_or_else(|| Err(EvalError::NotCallable(callee.describe())));
    }

    match evaluate(callee, env)? {
        Value::Function(func) => {
            let args = evaluate_args(args, env)?;
            func.call(&args)
        }
        _ => Err(EvalError::NotCallable(callee.describe())),
    }
}

fn evaluate_args(args: &[Expr], env: &dyn Environment) -> EvalResult<Vec<Value>> {
    args.iter().map(|arg| evaluate(arg, env)).collect()
}

pub(crate) fn get_property(object: &Value, property: &str) -> EvalResult<Value> {
    match object {
        Value::Undefined | Value::Null => Err(EvalError::type_error(format!(
            "cannot read property '{property}' of {}",
            object.type_name()
        ))),
        Value::String(s) if property == "length" => Ok(Value::from(s.chars().count())),
        Value::Array(items) if property == "length" => Ok(Value::from(items.len())),
        Value::String(s) => Ok(property
            .parse::<usize>()
            .ok()
            .and_then(|idx| s.chars().nth(idx))
            .map(|c| Value::string(c.to_string()))
            .unwrap_or_default()),
        _ => Ok(object.get(property).cloned().unwrap_or_default()),
    }
}

fn get_index(object: &Value, index: &Value) -> EvalResult<Value> {
    match index {
        Value::Number(n) if n.fract() == 0.0 && *n >= 0.0 => {
            get_property(object, &(*n as usize).to_string())
        }
        _ => get_property(object, &index.to_string()),
    }
}

fn binary(op: BinaryOp, left: &Value, right: &Value) -> Value {
    match op {
        BinaryOp::Add => add(left, right),
        BinaryOp::Subtract => Value::Number(left.to_number() - right.to_number()),
        BinaryOp::Multiply => Value::Number(left.to_number() * right.to_number()),
        BinaryOp::Divide => Value::Number(left.to_number() / right.to_number()),
        BinaryOp::Modulo => Value::Number(left.to_number() % right.to_number()),
        BinaryOp::Less => Value::Bool(compare(left, right) == Some(Ordering::Less)),
        BinaryOp::LessEqual => Value::Bool(matches!(
            compare(left, right),
            Some(Ordering::Less | Ordering::Equal)
        )),
        BinaryOp::Greater => Value::Bool(compare(left, right) == Some(Ordering::Greater)),
        BinaryOp::GreaterEqual => Value::Bool(matches!(
            compare(left, right),
            Some(Ordering::Greater | Ordering::Equal)
        )),
        BinaryOp::LooseEqual => Value::Bool(loose_equals(left, right)),
        BinaryOp::LooseNotEqual => Value::Bool(!loose_equals(left, right)),
        BinaryOp::StrictEqual => Value::Bool(strict_equals(left, right)),
        BinaryOp::StrictNotEqual => Value::Bool(!strict_equals(left, right)),
    }
}

fn is_string_like(value: &Value) -> bool {
    matches!(
        value,
        Value::String(_) | Value::Array(_) | Value::Object(_) | Value::Function(_)
    )
}

/// `+` concatenates as soon as either side is not a primitive number-like value.
fn add(left: &Value, right: &Value) -> Value {
    if is_string_like(left) || is_string_like(right) {
        Value::from(format!("{left}{right}"))
    } else {
        Value::Number(left.to_number() + right.to_number())
    }
}

fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => left.to_number().partial_cmp(&right.to_number()),
    }
}

/// Identity for arrays and objects, value equality for everything else.
pub(crate) fn strict_equals(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Array(a), Value::Array(b)) => Arc::ptr_eq(a, b),
        (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
        _ => left == right,
    }
}

fn loose_equals(left: &Value, right: &Value) -> bool {
    match (left, right) {
        _ if left.is_nullish() || right.is_nullish() => left.is_nullish() && right.is_nullish(),
        (Value::Bool(b), other) | (other, Value::Bool(b)) => {
            loose_equals(&Value::Number(f64::from(u8::from(*b))), other)
        }
        (Value::Number(_), Value::String(_)) | (Value::String(_), Value::Number(_)) => {
            left.to_number() == right.to_number()
        }
        (Value::Array(_) | Value::Object(_), Value::String(_) | Value::Number(_)) => {
            loose_equals(&Value::from(left.to_string()), right)
        }
        (Value::String(_) | Value::Number(_), Value::Array(_) | Value::Object(_)) => {
            loose_equals(left, &Value::from(right.to_string()))
        }
        _ => strict_equals(left, right),
    }
}
