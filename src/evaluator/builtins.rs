//! The unqualified builtin functions (§4.3 "Builtin functions"), available in every scope without
//! an `use` — the evaluator-side counterpart of [`crate::typechecker::builtin_signature`]. Names
//! listed here must stay in lockstep with that table.

use std::rc::Rc;

use crate::lexer::Token;

use super::error::RuntimeError;
use super::value::Value;
use super::Evaluator;

pub fn is_builtin(name: &str) -> bool {
    matches!(
        name,
        "len" | "toString" | "writeln" | "write" | "strFormat" | "map" | "filter" | "reduce" | "first" | "rest" | "prepend"
    )
}

pub fn call(evaluator: &Evaluator, name: &str, args: &[Value], token: &Token) -> Result<Value, RuntimeError> {
    match name {
        "len" => len(args).map_err(|m| evaluator.err(m, token)),
        "toString" => Ok(Value::String(to_display_string(&args[0]))),
        "writeln" => {
            println!("{}", to_display_string(&args[0]));
            Ok(Value::Null)
        }
        "write" => {
            print!("{}", to_display_string(&args[0]));
            Ok(Value::Null)
        }
        "strFormat" => str_format(args).map_err(|m| evaluator.err(m, token)),
        "map" => map(evaluator, args, token),
        "filter" => filter(evaluator, args, token),
        "reduce" => reduce(evaluator, args, token),
        "first" => first(args).map_err(|m| evaluator.err(m, token)),
        "rest" => rest(args).map_err(|m| evaluator.err(m, token)),
        "prepend" => prepend(args).map_err(|m| evaluator.err(m, token)),
        other => Err(evaluator.err(format!("unknown builtin `{other}`"), token)),
    }
}

fn to_display_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn len(args: &[Value]) -> Result<Value, String> {
    let n = match &args[0] {
        Value::Array(els) => els.len(),
        Value::Tuple(els) => els.len(),
        Value::String(s) => s.chars().count(),
        Value::Hash(map) => map.borrow().len(),
        other => return Err(format!("`len` is not defined for `{}`", other.kind_name())),
    };
    Ok(Value::Integer(n as i64))
}

fn str_format(args: &[Value]) -> Result<Value, String> {
    let Value::String(template) = &args[0] else {
        return Err("`strFormat` requires a string template".to_string());
    };
    Ok(Value::String(template.replacen("{}", &to_display_string(&args[1]), 1)))
}

fn as_array(value: &Value) -> Result<Rc<Vec<Value>>, String> {
    match value {
        Value::Array(els) => Ok(els.clone()),
        other => Err(format!("expected an array, found `{}`", other.kind_name())),
    }
}

fn map(evaluator: &Evaluator, args: &[Value], token: &Token) -> Result<Value, RuntimeError> {
    let els = as_array(&args[0]).map_err(|m| evaluator.err(m, token))?;
    let func = &args[1];
    let mut out = Vec::with_capacity(els.len());
    for el in els.iter() {
        out.push(evaluator.call_value(func, vec![el.clone()], token)?);
    }
    Ok(Value::Array(Rc::new(out)))
}

fn filter(evaluator: &Evaluator, args: &[Value], token: &Token) -> Result<Value, RuntimeError> {
    let els = as_array(&args[0]).map_err(|m| evaluator.err(m, token))?;
    let func = &args[1];
    let mut out = Vec::new();
    for el in els.iter() {
        if evaluator.call_value(func, vec![el.clone()], token)?.is_truthy() {
            out.push(el.clone());
        }
    }
    Ok(Value::Array(Rc::new(out)))
}

fn reduce(evaluator: &Evaluator, args: &[Value], token: &Token) -> Result<Value, RuntimeError> {
    let els = as_array(&args[0]).map_err(|m| evaluator.err(m, token))?;
    let mut acc = args[1].clone();
    let func = &args[2];
    for el in els.iter() {
        acc = evaluator.call_value(func, vec![acc, el.clone()], token)?;
    }
    Ok(acc)
}

fn first(args: &[Value]) -> Result<Value, String> {
    let els = as_array(&args[0])?;
    els.first().cloned().ok_or_else(|| "`first` called on an empty array".to_string())
}

fn rest(args: &[Value]) -> Result<Value, String> {
    let els = as_array(&args[0])?;
    if els.is_empty() {
        return Err("`rest` called on an empty array".to_string());
    }
    Ok(Value::Array(Rc::new(els[1..].to_vec())))
}

fn prepend(args: &[Value]) -> Result<Value, String> {
    let els = as_array(&args[1])?;
    let mut out = Vec::with_capacity(els.len() + 1);
    out.push(args[0].clone());
    out.extend(els.iter().cloned());
    Ok(Value::Array(Rc::new(out)))
}
