//! Clock adapter over `chrono` (§4.6): `now`, `formatIso`.

use chrono::{DateTime, Utc};

use crate::evaluator::value::Value;
use crate::types::{FunctionSignature, Type};

use super::{native_fn, NativeModule};

pub fn module() -> NativeModule {
    NativeModule {
        name: "datetime",
        types: vec![
            (
                "now".to_string(),
                Type::Function(FunctionSignature {
                    params: vec![],
                    return_type: Box::new(Type::Integer),
                    type_params: vec![],
                }),
            ),
            (
                "formatIso".to_string(),
                Type::Function(FunctionSignature {
                    params: vec![Type::Integer],
                    return_type: Box::new(Type::String),
                    type_params: vec![],
                }),
            ),
        ],
        values: vec![
            ("now".to_string(), native_fn("datetime.now", now)),
            ("formatIso".to_string(), native_fn("datetime.formatIso", format_iso)),
        ],
    }
}

/// Unix timestamp in seconds, the integer form every other `datetime` operation consumes and
/// produces, since the language has no dedicated timestamp type (§3's closed `Type` set).
fn now(_args: &[Value]) -> Result<Value, String> {
    Ok(Value::Integer(Utc::now().timestamp()))
}

fn format_iso(args: &[Value]) -> Result<Value, String> {
    let seconds = match &args[0] {
        Value::Integer(n) => *n,
        other => return Err(format!("`formatIso` expects an Integer timestamp, found `{}`", other.kind_name())),
    };
    let dt: DateTime<Utc> = DateTime::from_timestamp(seconds, 0)
        .ok_or_else(|| format!("timestamp {seconds} is out of range"))?;
    Ok(Value::String(dt.to_rfc3339()))
}
