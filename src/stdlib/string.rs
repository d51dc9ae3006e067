//! `str` method adapter (§4.6): `split`, `join`, `trim`, `toUpper`, `toLower`, `replace`,
//! `contains`.

use std::rc::Rc;

use crate::evaluator::value::Value;
use crate::types::{FunctionSignature, Type};

use super::{as_string, native_fn, NativeModule};

pub fn module() -> NativeModule {
    NativeModule {
        name: "string",
        types: vec![
            (
                "split".to_string(),
                Type::Function(FunctionSignature {
                    params: vec![Type::String, Type::String],
                    return_type: Box::new(Type::Array(Box::new(Type::String))),
                    type_params: vec![],
                }),
            ),
            (
                "join".to_string(),
                Type::Function(FunctionSignature {
                    params: vec![Type::Array(Box::new(Type::String)), Type::String],
                    return_type: Box::new(Type::String),
                    type_params: vec![],
                }),
            ),
            ("trim".to_string(), Type::Function(unary())),
            ("toUpper".to_string(), Type::Function(unary())),
            ("toLower".to_string(), Type::Function(unary())),
            (
                "replace".to_string(),
                Type::Function(FunctionSignature {
                    params: vec![Type::String, Type::String, Type::String],
                    return_type: Box::new(Type::String),
                    type_params: vec![],
                }),
            ),
            (
                "contains".to_string(),
                Type::Function(FunctionSignature {
                    params: vec![Type::String, Type::String],
                    return_type: Box::new(Type::Boolean),
                    type_params: vec![],
                }),
            ),
        ],
        values: vec![
            ("split".to_string(), native_fn("string.split", split)),
            ("join".to_string(), native_fn("string.join", join)),
            ("trim".to_string(), native_fn("string.trim", |a| Ok(Value::String(as_string(&a[0])?.trim().to_string())))),
            ("toUpper".to_string(), native_fn("string.toUpper", |a| Ok(Value::String(as_string(&a[0])?.to_uppercase())))),
            ("toLower".to_string(), native_fn("string.toLower", |a| Ok(Value::String(as_string(&a[0])?.to_lowercase())))),
            ("replace".to_string(), native_fn("string.replace", replace)),
            ("contains".to_string(), native_fn("string.contains", contains)),
        ],
    }
}

fn unary() -> FunctionSignature {
    FunctionSignature {
        params: vec![Type::String],
        return_type: Box::new(Type::String),
        type_params: vec![],
    }
}

fn split(args: &[Value]) -> Result<Value, String> {
    let s = as_string(&args[0])?;
    let sep = as_string(&args[1])?;
    let parts = s.split(sep.as_str()).map(|p| Value::String(p.to_string())).collect();
    Ok(Value::Array(Rc::new(parts)))
}

fn join(args: &[Value]) -> Result<Value, String> {
    let Value::Array(items) = &args[0] else {
        return Err("`join` expects an Array as its first argument".to_string());
    };
    let sep = as_string(&args[1])?;
    let parts = items.iter().map(|v| as_string(v)).collect::<Result<Vec<_>, _>>()?;
    Ok(Value::String(parts.join(&sep)))
}

fn replace(args: &[Value]) -> Result<Value, String> {
    let s = as_string(&args[0])?;
    let from = as_string(&args[1])?;
    let to = as_string(&args[2])?;
    Ok(Value::String(s.replace(from.as_str(), &to)))
}

fn contains(args: &[Value]) -> Result<Value, String> {
    let s = as_string(&args[0])?;
    let needle = as_string(&args[1])?;
    Ok(Value::Boolean(s.contains(needle.as_str())))
}
