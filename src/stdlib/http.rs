//! HTTP client adapter over `ureq` (§4.6). Responses are bridged to a `Hash` with `status` and
//! `body` String keys rather than a named record, since the language has no anonymous-record
//! literal and a two-field `Hash` expresses `{status, body}` exactly.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::evaluator::value::{hash_key, Value};
use crate::types::{FunctionSignature, Type};

use super::{as_string, err, native_fn, ok, result_of, NativeModule};

fn response_type() -> Type {
    Type::Hash(Box::new(Type::String), Box::new(Type::Any))
}

pub fn module() -> NativeModule {
    let sig = |params: Vec<Type>| FunctionSignature {
        params,
        return_type: Box::new(result_of(response_type(), Type::String)),
        type_params: vec![],
    };
    NativeModule {
        name: "net.http",
        types: vec![
            ("get".to_string(), Type::Function(sig(vec![Type::String]))),
            ("post".to_string(), Type::Function(sig(vec![Type::String, Type::String]))),
        ],
        values: vec![
            ("get".to_string(), native_fn("net.http.get", get)),
            ("post".to_string(), native_fn("net.http.post", post)),
        ],
    }
}

fn response_value(status: u16, body: String) -> Value {
    let mut map = HashMap::new();
    map.insert(
        hash_key(&Value::String("status".to_string())),
        (Value::String("status".to_string()), Value::Integer(status as i64)),
    );
    map.insert(
        hash_key(&Value::String("body".to_string())),
        (Value::String("body".to_string()), Value::String(body)),
    );
    Value::Hash(Rc::new(RefCell::new(map)))
}

fn get(args: &[Value]) -> Result<Value, String> {
    let url = as_string(&args[0])?;
    match ureq::get(&url).call() {
        Ok(resp) => {
            let status = resp.status();
            let body = resp.into_string().map_err(|e| e.to_string())?;
            Ok(ok(response_value(status, body)))
        }
        Err(ureq::Error::Status(status, resp)) => {
            let body = resp.into_string().unwrap_or_default();
            Ok(ok(response_value(status, body)))
        }
        Err(e) => Ok(err(Value::String(e.to_string()))),
    }
}

fn post(args: &[Value]) -> Result<Value, String> {
    let url = as_string(&args[0])?;
    let body = as_string(&args[1])?;
    match ureq::post(&url).send_string(&body) {
        Ok(resp) => {
            let status = resp.status();
            let body = resp.into_string().map_err(|e| e.to_string())?;
            Ok(ok(response_value(status, body)))
        }
        Err(ureq::Error::Status(status, resp)) => {
            let body = resp.into_string().unwrap_or_default();
            Ok(ok(response_value(status, body)))
        }
        Err(e) => Ok(err(Value::String(e.to_string()))),
    }
}
