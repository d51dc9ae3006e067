//! Host `f64` math adapter (§4.6): `sqrt`, `pow`, `abs`, `floor`, `ceil`, `min`, `max`, plus the
//! `PI`/`E` constants.

use crate::evaluator::value::Value;
use crate::types::{FunctionSignature, Type};

use super::{native_fn, NativeModule};

pub fn module() -> NativeModule {
    let unary = || FunctionSignature {
        params: vec![Type::Double],
        return_type: Box::new(Type::Double),
        type_params: vec![],
    };
    let binary = || FunctionSignature {
        params: vec![Type::Double, Type::Double],
        return_type: Box::new(Type::Double),
        type_params: vec![],
    };
    NativeModule {
        name: "math",
        types: vec![
            ("sqrt".to_string(), Type::Function(unary())),
            ("pow".to_string(), Type::Function(binary())),
            ("abs".to_string(), Type::Function(unary())),
            ("floor".to_string(), Type::Function(unary())),
            ("ceil".to_string(), Type::Function(unary())),
            ("min".to_string(), Type::Function(binary())),
            ("max".to_string(), Type::Function(binary())),
            ("PI".to_string(), Type::Double),
            ("E".to_string(), Type::Double),
        ],
        values: vec![
            ("sqrt".to_string(), native_fn("math.sqrt", |a| unary_op(a, f64::sqrt))),
            ("pow".to_string(), native_fn("math.pow", |a| binary_op(a, f64::powf))),
            ("abs".to_string(), native_fn("math.abs", |a| unary_op(a, f64::abs))),
            ("floor".to_string(), native_fn("math.floor", |a| unary_op(a, f64::floor))),
            ("ceil".to_string(), native_fn("math.ceil", |a| unary_op(a, f64::ceil))),
            ("min".to_string(), native_fn("math.min", |a| binary_op(a, f64::min))),
            ("max".to_string(), native_fn("math.max", |a| binary_op(a, f64::max))),
            ("PI".to_string(), Value::Double(std::f64::consts::PI)),
            ("E".to_string(), Value::Double(std::f64::consts::E)),
        ],
    }
}

fn as_f64(value: &Value) -> Result<f64, String> {
    match value {
        Value::Double(n) => Ok(*n),
        Value::Integer(n) => Ok(*n as f64),
        other => Err(format!("expected a numeric value, found `{}`", other.kind_name())),
    }
}

fn unary_op(args: &[Value], f: fn(f64) -> f64) -> Result<Value, String> {
    Ok(Value::Double(f(as_f64(&args[0])?)))
}

fn binary_op(args: &[Value], f: fn(f64, f64) -> f64) -> Result<Value, String> {
    Ok(Value::Double(f(as_f64(&args[0])?, as_f64(&args[1])?)))
}
