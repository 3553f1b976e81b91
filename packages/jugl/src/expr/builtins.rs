//! Functions available to every template and the methods of built-in value types.

use std::sync::Arc;

use super::eval::strict_equals;
use crate::error::{EvalError, EvalResult};
use crate::value::{Function, Map, Value};

fn expect_args(name: &str, args: &[Value], min: usize, max: usize) -> EvalResult<()> {
    if args.len() < min || args.len() > max {
        let expected = match (min, max) {
            (min, max) if min == max => min.to_string(),
            (min, usize::MAX) => format!("at least {min}"),
            (min, max) => format!("{min} to {max}"),
        };
        return Err(EvalError::arity(name, expected, args.len()));
    }
    Ok(())
}

fn arg(args: &[Value], idx: usize) -> Value {
    args.get(idx).cloned().unwrap_or_default()
}

fn number_fn(name: &'static str, op: fn(f64) -> f64) -> Function {
    Function::new(name, move |args| {
        expect_args(name, args, 1, 1)?;
        Ok(Value::Number(op(args[0].to_number())))
    })
}

fn string_fn(name: &'static str, op: fn(&str) -> String) -> Function {
    Function::new(name, move |args| {
        expect_args(name, args, 1, 1)?;
        Ok(Value::from(op(&args[0].to_string())))
    })
}

/// Numbers to fold over for `min`/`max`: either the arguments or a single array argument.
fn numeric_args(args: &[Value]) -> Vec<f64> {
    match args {
        [Value::Array(items)] => items.iter().map(Value::to_number).collect(),
        _ => args.iter().map(Value::to_number).collect(),
    }
}

/// `min`/`max` fold where any NaN poisons the result.
fn fold_numbers(args: &[Value], init: f64, op: fn(f64, f64) -> f64) -> f64 {
    numeric_args(args).into_iter().fold(init, |acc, n| {
        if acc.is_nan() || n.is_nan() {
            f64::NAN
        } else {
            op(acc, n)
        }
    })
}

fn len(args: &[Value]) -> EvalResult<Value> {
    expect_args("len", args, 1, 1)?;
    match &args[0] {
        Value::String(s) => Ok(Value::from(s.chars().count())),
        Value::Array(items) => Ok(Value::from(items.len())),
        Value::Object(map) => Ok(Value::from(map.len())),
        other => Err(EvalError::type_error(format!(
            "len() of {}",
            other.type_name()
        ))),
    }
}

fn keys(args: &[Value]) -> EvalResult<Value> {
    expect_args("keys", args, 1, 1)?;
    match &args[0] {
        Value::Object(map) => Ok(Value::array(map.keys().map(Value::string))),
        Value::Array(items) => Ok(Value::array(
            (0..items.len()).map(|idx| Value::from(idx.to_string())),
        )),
        other => Err(EvalError::type_error(format!(
            "keys() of {}",
            other.type_name()
        ))),
    }
}

fn values(args: &[Value]) -> EvalResult<Value> {
    expect_args("values", args, 1, 1)?;
    match &args[0] {
        Value::Object(map) => Ok(Value::array(map.values().cloned())),
        Value::Array(_) => Ok(args[0].clone()),
        other => Err(EvalError::type_error(format!(
            "values() of {}",
            other.type_name()
        ))),
    }
}

/// Largest array `range` will build.
const MAX_RANGE_LEN: usize = 100_000;

/// `range(end)`, `range(start, end)` or `range(start, end, step)`
fn range(args: &[Value]) -> EvalResult<Value> {
    expect_args("range", args, 1, 3)?;
    let nums: Vec<f64> = args.iter().map(Value::to_number).collect();
    let (start, end, step) = match *nums.as_slice() {
        [end] => (0.0, end, 1.0),
        [start, end] => (start, end, 1.0),
        [start, end, step, ..] => (start, end, step),
        [] => return Err(EvalError::arity("range", "1 to 3", 0)),
    };
    if step == 0.0 || !step.is_finite() || !start.is_finite() || !end.is_finite() {
        return Err(EvalError::type_error("range() needs finite bounds and a non-zero step"));
    }
    let count = ((end - start) / step).ceil();
    if count > MAX_RANGE_LEN as f64 {
        return Err(EvalError::type_error(format!(
            "range() would produce {count} items, more than {MAX_RANGE_LEN}"
        )));
    }
    let count = if count > 0.0 { count as usize } else { 0 };
    let items = (0..count)
        .map(|i| Value::Number(start + i as f64 * step))
        .collect();
    Ok(Value::Array(Arc::new(items)))
}

fn join(args: &[Value]) -> EvalResult<Value> {
    expect_args("join", args, 1, 2)?;
    let separator = match args.get(1) {
        Some(sep) if !matches!(sep, Value::Undefined) => sep.to_string(),
        _ => String::from(","),
    };
    let items = args[0].as_array().ok_or_else(|| {
        EvalError::type_error(format!("join expects an array, got {}", args[0].type_name()))
    })?;
    Ok(Value::from(join_items(items, &separator)))
}

fn join_items(items: &[Value], separator: &str) -> String {
    items
        .iter()
        .map(|item| {
            if item.is_nullish() {
                String::new()
            } else {
                item.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(separator)
}

/// Rounds half up, like `Math.round`
fn round_half_up(n: f64) -> f64 {
    let floor = n.floor();
    if n - floor >= 0.5 {
        floor + 1.0
    } else {
        floor
    }
}

/// The functions installed into [`Globals::default`](super::Globals).
pub fn builtin_functions() -> Vec<Function> {
    vec![
        Function::new("len", len),
        Function::new("keys", keys),
        Function::new("values", values),
        Function::new("range", range),
        Function::new("join", join),
        string_fn("upper", str::to_uppercase),
        string_fn("lower", str::to_lowercase),
        string_fn("trim", |s| s.trim().to_string()),
        string_fn("escape", |s| html_escape::encode_safe(s).into_owned()),
        Function::new("str", |args| {
            expect_args("str", args, 1, 1)?;
            Ok(Value::from(args[0].to_string()))
        }),
        number_fn("number", |n| n),
        number_fn("round", round_half_up),
        number_fn("floor", f64::floor),
        number_fn("ceil", f64::ceil),
        number_fn("abs", f64::abs),
        Function::new("min", |args| {
            Ok(Value::Number(fold_numbers(args, f64::INFINITY, f64::min)))
        }),
        Function::new("max", |args| {
            Ok(Value::Number(fold_numbers(args, f64::NEG_INFINITY, f64::max)))
        }),
        Function::new("default", |args| {
            expect_args("default", args, 2, 2)?;
            Ok(if args[0].is_nullish() {
                args[1].clone()
            } else {
                args[0].clone()
            })
        }),
    ]
}

/// Char-based `slice(start, end)` bounds with negative indices counted from the end.
fn slice_bounds(args: &[Value], len: usize) -> (usize, usize) {
    let resolve = |value: Value, default: usize| -> usize {
        if matches!(value, Value::Undefined) {
            return default;
        }
        let n = value.to_number();
        let n = if n.is_nan() { 0.0 } else { n.trunc() };
        if n < 0.0 {
            (len as f64 + n).max(0.0) as usize
        } else {
            (n as usize).min(len)
        }
    };
    let start = resolve(arg(args, 0), 0);
    let end = resolve(arg(args, 1), len);
    (start, end.max(start))
}

/// Call a built-in method on a string, array, number or boolean. `None` if there is no such
/// method.
pub fn call_method(receiver: &Value, name: &str, args: &[Value]) -> Option<EvalResult<Value>> {
    let result = match (receiver, name) {
        (_, "toString") => Ok(Value::from(receiver.to_string())),
        (Value::String(s), "toUpperCase") => Ok(Value::from(s.to_uppercase())),
        (Value::String(s), "toLowerCase") => Ok(Value::from(s.to_lowercase())),
        (Value::String(s), "trim") => Ok(Value::from(s.trim())),
        (Value::String(s), "indexOf") => {
            let needle = arg(args, 0).to_string();
            Ok(Value::Number(match s.find(&needle) {
                Some(byte_idx) => s[..byte_idx].chars().count() as f64,
                None => -1.0,
            }))
        }
        (Value::String(s), "slice") => {
            let (start, end) = slice_bounds(args, s.chars().count());
            Ok(Value::from(
                s.chars().skip(start).take(end - start).collect::<String>(),
            ))
        }
        (Value::Array(items), "join") => {
            let separator = match args.first() {
                Some(sep) if !matches!(sep, Value::Undefined) => sep.to_string(),
                _ => String::from(","),
            };
            Ok(Value::from(join_items(items, &separator)))
        }
        (Value::Array(items), "indexOf") => {
            let needle = arg(args, 0);
            Ok(Value::Number(
                items
                    .iter()
                    .position(|item| strict_equals(item, &needle))
                    .map(|idx| idx as f64)
                    .unwrap_or(-1.0),
            ))
        }
        (Value::Array(items), "slice") => {
            let (start, end) = slice_bounds(args, items.len());
            Ok(Value::array(items[start..end].iter().cloned()))
        }
        _ => return None,
    };
    Some(result)
}

pub(crate) fn builtin_globals() -> Map {
    builtin_functions()
        .into_iter()
        .map(|func| (func.name().to_string(), Value::Function(func)))
        .collect()
}
