//! Native, host-backed modules (§4.6) — the fixed set `fs`, `net.http`, `json`, `math`, `string`,
//! `hash`, `io`, `datetime`, `sqlite` the loader resolves from an in-memory registry instead of
//! reading and parsing a `.lu` file.
//!
//! Grounded on the teacher's `Module<T>` shape (`loader/mod.rs`): a name, an exported type table
//! and an exported value table. A native module plays the same role but is built by a Rust
//! function instead of parsed from source, so [`NativeModule`] only needs those two tables (§4.6
//! "returns a pair of name→type and name→value tables"). The registry itself follows the
//! teacher's `lazy_static!` `LEX_MAP` in `lexer/mod.rs`, generalized from a lex-terminal table to
//! a module-name table via `once_cell::sync::Lazy`.

pub mod datetime;
pub mod fs;
pub mod hash;
pub mod http;
pub mod io;
pub mod json;
pub mod math;
pub mod sqlite;
pub mod string;

use std::collections::HashMap;
use std::rc::Rc;

use once_cell::sync::Lazy;

use crate::evaluator::value::{BuiltinValue, SumInstanceValue, Value};
use crate::types::{SumType, Type, VariantType};

/// One native module's exported type table and value table, handed back to the loader in place
/// of a parsed `Program` (§4.5 step 4).
pub struct NativeModule {
    pub name: &'static str,
    pub types: Vec<(String, Type)>,
    pub values: Vec<(String, Value)>,
}

pub fn native_fn(name: &'static str, f: impl Fn(&[Value]) -> Result<Value, String> + 'static) -> Value {
    Value::Builtin(Rc::new(BuiltinValue {
        name: name.to_string(),
        func: Rc::new(f),
    }))
}

/// A concrete `Result<ok, err>` type, built the same way [`crate::prelude::seed_types`] builds
/// the generic declaration but with `type_args` pinned to the adapter's actual payload types.
pub fn result_of(ok: Type, err: Type) -> Type {
    let mut variants = HashMap::new();
    variants.insert(
        "Ok".to_string(),
        Rc::new(VariantType {
            name: "Ok".to_string(),
            params: vec![ok.clone()],
            parent: "Result".to_string(),
        }),
    );
    variants.insert(
        "Err".to_string(),
        Rc::new(VariantType {
            name: "Err".to_string(),
            params: vec![err.clone()],
            parent: "Result".to_string(),
        }),
    );
    Type::Sum(Rc::new(SumType {
        name: "Result".to_string(),
        variants,
        type_params: vec!["T".to_string(), "E".to_string()],
        type_args: vec![ok, err],
    }))
}

pub fn option_of(inner: Type) -> Type {
    let mut variants = HashMap::new();
    variants.insert(
        "Some".to_string(),
        Rc::new(VariantType {
            name: "Some".to_string(),
            params: vec![inner.clone()],
            parent: "Option".to_string(),
        }),
    );
    variants.insert(
        "None".to_string(),
        Rc::new(VariantType {
            name: "None".to_string(),
            params: vec![],
            parent: "Option".to_string(),
        }),
    );
    Type::Sum(Rc::new(SumType {
        name: "Option".to_string(),
        variants,
        type_params: vec!["T".to_string()],
        type_args: vec![inner],
    }))
}

pub fn ok(value: Value) -> Value {
    Value::SumInstance(Rc::new(SumInstanceValue {
        type_name: "Result".to_string(),
        variant_name: "Ok".to_string(),
        values: vec![value],
    }))
}

pub fn err(value: Value) -> Value {
    Value::SumInstance(Rc::new(SumInstanceValue {
        type_name: "Result".to_string(),
        variant_name: "Err".to_string(),
        values: vec![value],
    }))
}

pub fn some(value: Value) -> Value {
    Value::SumInstance(Rc::new(SumInstanceValue {
        type_name: "Option".to_string(),
        variant_name: "Some".to_string(),
        values: vec![value],
    }))
}

pub fn none() -> Value {
    Value::SumInstance(Rc::new(SumInstanceValue {
        type_name: "Option".to_string(),
        variant_name: "None".to_string(),
        values: vec![],
    }))
}

pub fn as_string(value: &Value) -> Result<String, String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        other => Err(format!("expected a String, found `{}`", other.kind_name())),
    }
}

static REGISTRY: Lazy<HashMap<&'static str, fn() -> NativeModule>> = Lazy::new(|| {
    let mut m: HashMap<&'static str, fn() -> NativeModule> = HashMap::new();
    m.insert("fs", fs::module);
    m.insert("net.http", http::module);
    m.insert("json", json::module);
    m.insert("math", math::module);
    m.insert("string", string::module);
    m.insert("hash", hash::module);
    m.insert("io", io::module);
    m.insert("datetime", datetime::module);
    m.insert("sqlite", sqlite::module);
    m
});

pub fn is_native(dotted_name: &str) -> bool {
    REGISTRY.contains_key(dotted_name)
}

/// Builds a fresh instance of the named native module, or `None` if it isn't one of the fixed
/// set. Each call constructs new closures/tables (§4.5 step 4 "construct a fresh ... environment
/// seeded with its builtins and constructors").
pub fn load_native(dotted_name: &str) -> Option<NativeModule> {
    REGISTRY.get(dotted_name).map(|f| f())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_covers_the_fixed_module_set() {
        for name in ["fs", "net.http", "json", "math", "string", "hash", "io", "datetime", "sqlite"] {
            assert!(is_native(name), "missing native module `{name}`");
        }
        assert!(!is_native("not.a.module"));
    }
}
