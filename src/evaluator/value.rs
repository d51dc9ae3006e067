//! The closed runtime `Value` variant set (§3), mirroring [`crate::types::Type`] one level down:
//! every semantic type has exactly one runtime representation here.
//!
//! Grounded on the teacher's `VariableType` enum (`interpreter/mod.rs`), generalized from a
//! four-variant set with no shared state to one where `Array`/`Hash`/`Record` share structure
//! through `Rc` the same way the checker's `Type` does, since closures and match arms both need
//! to alias the same underlying value rather than deep-clone it on every binding.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::ast::Expression;

use super::env::ValueEnvHandle;

#[derive(Debug, Clone)]
pub enum Value {
    Integer(i64),
    Double(f64),
    Boolean(bool),
    String(String),
    Array(Rc<Vec<Value>>),
    Tuple(Rc<Vec<Value>>),
    /// Keyed by [`hash_key`] so structurally-equal keys (`1` and `1.0`, two equal strings)
    /// collide on the same slot; each slot keeps the original key value for iteration/display.
    Hash(Rc<RefCell<HashMap<String, (Value, Value)>>>),
    Record(Rc<RefCell<RecordValue>>),
    SumInstance(Rc<SumInstanceValue>),
    Function(Rc<FunctionValue>),
    Builtin(Rc<BuiltinValue>),
    Constructor(Rc<Constructor>),
    Module { name: String, env: ValueEnvHandle },
    Null,
    /// Wraps the value of a `return` statement or a `?`-propagated `Err`/`None` so block
    /// evaluation can unwind to the nearest function boundary without a native panic.
    Return(Box<Value>),
}

#[derive(Debug, Clone)]
pub struct RecordValue {
    pub name: String,
    pub fields: Vec<(String, Value)>,
}

#[derive(Debug, Clone)]
pub struct SumInstanceValue {
    pub type_name: String,
    pub variant_name: String,
    pub values: Vec<Value>,
}

pub struct FunctionValue {
    pub name: Option<String>,
    pub params: Vec<String>,
    pub body: Rc<Expression>,
    pub env: ValueEnvHandle,
}

impl fmt::Debug for FunctionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionValue")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish()
    }
}

pub type BuiltinFn = Rc<dyn Fn(&[Value]) -> Result<Value, String>>;

pub struct BuiltinValue {
    pub name: String,
    pub func: BuiltinFn,
}

impl fmt::Debug for BuiltinValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuiltinValue").field("name", &self.name).finish()
    }
}

/// A callable that builds a `Record` or `Sum` value rather than running a body (§4.4 "calling a
/// value built by a `type`/`record` declaration constructs an instance instead of invoking a
/// function body").
#[derive(Debug, Clone)]
pub enum Constructor {
    Variant { sum_name: String, variant_name: String },
    Record { name: String, fields: Vec<String> },
}

impl Value {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Integer(_) => "Integer",
            Value::Double(_) => "Double",
            Value::Boolean(_) => "Boolean",
            Value::String(_) => "String",
            Value::Array(_) => "Array",
            Value::Tuple(_) => "Tuple",
            Value::Hash(_) => "Hash",
            Value::Record(_) => "Record",
            Value::SumInstance(_) => "Sum",
            Value::Function(_) => "Function",
            Value::Builtin(_) => "Builtin",
            Value::Constructor(_) => "Constructor",
            Value::Module { .. } => "Module",
            Value::Null => "Null",
            Value::Return(_) => "Return",
        }
    }

    pub fn is_truthy(&self) -> bool {
        matches!(self, Value::Boolean(true))
    }

    /// Unwraps a `return`/`?`-propagation sentinel down to the value it carries, one layer at a
    /// time (callers that need to check *whether* a value is an in-flight return should match on
    /// `Value::Return` directly instead).
    pub fn into_inner(self) -> Value {
        match self {
            Value::Return(inner) => *inner,
            other => other,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(n) => write!(f, "{n}"),
            Value::Double(n) => write!(f, "{n}"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::String(s) => write!(f, "{s}"),
            Value::Array(els) => {
                write!(f, "[")?;
                for (i, el) in els.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{el}")?;
                }
                write!(f, "]")
            }
            Value::Tuple(els) => {
                write!(f, "(")?;
                for (i, el) in els.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{el}")?;
                }
                write!(f, ")")
            }
            Value::Hash(map) => {
                write!(f, "{{")?;
                for (i, (k, v)) in map.borrow().values().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                write!(f, "}}")
            }
            Value::Record(r) => {
                let r = r.borrow();
                write!(f, "{} {{ ", r.name)?;
                for (i, (name, val)) in r.fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{name}: {val}")?;
                }
                write!(f, " }}")
            }
            Value::SumInstance(s) => {
                if s.values.is_empty() {
                    write!(f, "{}", s.variant_name)
                } else {
                    write!(f, "{}(", s.variant_name)?;
                    for (i, v) in s.values.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{v}")?;
                    }
                    write!(f, ")")
                }
            }
            Value::Function(func) => write!(f, "<function {}>", func.name.as_deref().unwrap_or("anonymous")),
            Value::Builtin(b) => write!(f, "<builtin {}>", b.name),
            Value::Constructor(c) => match c.as_ref() {
                Constructor::Variant { variant_name, .. } => write!(f, "<constructor {variant_name}>"),
                Constructor::Record { name, .. } => write!(f, "<constructor {name}>"),
            },
            Value::Module { name, .. } => write!(f, "<module {name}>"),
            Value::Null => write!(f, "null"),
            Value::Return(inner) => write!(f, "{inner}"),
        }
    }
}

/// A stable string key for a value used as a `Hash` key (§4.4 "hash keys are hashed by kind and
/// value so `1` and `1.0` collide"). Compound values fall back to their `Display` rendering,
/// which is adequate for the record/tuple/array keys the language allows but not a general
/// structural hash.
pub fn hash_key(value: &Value) -> String {
    match value {
        Value::Integer(n) => format!("Integer_{n}"),
        Value::Double(n) => format!("Integer_{}", *n as i64),
        Value::Boolean(b) => format!("Boolean_{b}"),
        Value::String(s) => format!("String_{s}"),
        other => format!("{}_{other}", other.kind_name()),
    }
}
