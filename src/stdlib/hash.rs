//! Hex-digest adapter over `sha2`/`md-5` (§4.6): `sha256`, `md5`.

use md5::{Digest as Md5Digest, Md5};
use sha2::{Digest as Sha2Digest, Sha256};

use crate::evaluator::value::Value;
use crate::types::{FunctionSignature, Type};

use super::{as_string, native_fn, NativeModule};

pub fn module() -> NativeModule {
    let sig = || FunctionSignature {
        params: vec![Type::String],
        return_type: Box::new(Type::String),
        type_params: vec![],
    };
    NativeModule {
        name: "hash",
        types: vec![("sha256".to_string(), Type::Function(sig())), ("md5".to_string(), Type::Function(sig()))],
        values: vec![
            ("sha256".to_string(), native_fn("hash.sha256", sha256)),
            ("md5".to_string(), native_fn("hash.md5", md5)),
        ],
    }
}

fn sha256(args: &[Value]) -> Result<Value, String> {
    let input = as_string(&args[0])?;
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    Ok(Value::String(hex::encode(hasher.finalize())))
}

fn md5(args: &[Value]) -> Result<Value, String> {
    let input = as_string(&args[0])?;
    let mut hasher = Md5::new();
    hasher.update(input.as_bytes());
    Ok(Value::String(hex::encode(hasher.finalize())))
}
