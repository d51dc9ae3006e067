//! JSON bridging adapter over `serde_json` (§4.6): converts between `serde_json::Value` and the
//! runtime [`Value`] representation in both directions.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use serde_json::Value as Json;

use crate::evaluator::value::{hash_key, Value};
use crate::types::{FunctionSignature, Type};

use super::{as_string, err, native_fn, ok, result_of, NativeModule};

pub fn module() -> NativeModule {
    NativeModule {
        name: "json",
        types: vec![
            (
                "parse".to_string(),
                Type::Function(FunctionSignature {
                    params: vec![Type::String],
                    return_type: Box::new(result_of(Type::Any, Type::String)),
                    type_params: vec![],
                }),
            ),
            (
                "stringify".to_string(),
                Type::Function(FunctionSignature {
                    params: vec![Type::Any],
                    return_type: Box::new(Type::String),
                    type_params: vec![],
                }),
            ),
        ],
        values: vec![
            ("parse".to_string(), native_fn("json.parse", parse)),
            ("stringify".to_string(), native_fn("json.stringify", stringify)),
        ],
    }
}

fn parse(args: &[Value]) -> Result<Value, String> {
    let text = as_string(&args[0])?;
    match serde_json::from_str::<Json>(&text) {
        Ok(json) => Ok(ok(json_to_value(&json))),
        Err(e) => Ok(err(Value::String(e.to_string()))),
    }
}

fn stringify(args: &[Value]) -> Result<Value, String> {
    let json = value_to_json(&args[0]);
    serde_json::to_string(&json).map(Value::String).map_err(|e| e.to_string())
}

fn json_to_value(json: &Json) -> Value {
    match json {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Boolean(*b),
        Json::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Integer(i)
            } else {
                Value::Double(n.as_f64().unwrap_or(0.0))
            }
        }
        Json::String(s) => Value::String(s.clone()),
        Json::Array(items) => Value::Array(Rc::new(items.iter().map(json_to_value).collect())),
        Json::Object(obj) => {
            let mut map = HashMap::new();
            for (k, v) in obj {
                let key = Value::String(k.clone());
                map.insert(hash_key(&key), (key, json_to_value(v)));
            }
            Value::Hash(Rc::new(RefCell::new(map)))
        }
    }
}

fn value_to_json(value: &Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Boolean(b) => Json::Bool(*b),
        Value::Integer(n) => Json::from(*n),
        Value::Double(n) => serde_json::Number::from_f64(*n).map(Json::Number).unwrap_or(Json::Null),
        Value::String(s) => Json::String(s.clone()),
        Value::Array(items) | Value::Tuple(items) => Json::Array(items.iter().map(value_to_json).collect()),
        Value::Hash(map) => {
            let mut obj = serde_json::Map::new();
            for (key, val) in map.borrow().values() {
                obj.insert(key.to_string(), value_to_json(val));
            }
            Json::Object(obj)
        }
        Value::Record(r) => {
            let r = r.borrow();
            let mut obj = serde_json::Map::new();
            for (name, val) in &r.fields {
                obj.insert(name.clone(), value_to_json(val));
            }
            Json::Object(obj)
        }
        other => Json::String(other.to_string()),
    }
}
