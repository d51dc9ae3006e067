//! The closed semantic `Type` variant set (§3) plus unification and substitution (§4.3).
//!
//! Grounded on the teacher's `VariableType` enum (`typechecker/mod.rs`), which played the same
//! role with a smaller variant set (no traits/generics); the unification and substitution
//! machinery here has no teacher analogue (the teacher's checker didn't unify structurally) and
//! is written in the same recursive, `Rc`-sharing style the teacher uses for its AST nodes.

mod unify;

pub use unify::{substitute, unify, Substitution};

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::ast::Statement;

/// A function signature as carried by `Function`, `Trait` method entries, and builtins.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionSignature {
    pub params: Vec<Type>,
    pub return_type: Box<Type>,
    pub type_params: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct SumType {
    pub name: String,
    pub variants: HashMap<String, Rc<VariantType>>,
    pub type_params: Vec<String>,
    pub type_args: Vec<Type>,
}

#[derive(Debug, Clone)]
pub struct VariantType {
    pub name: String,
    pub params: Vec<Type>,
    /// Non-owning back-reference to the parent sum's name (§9 Design Notes: avoids an
    /// `Rc`/`Weak` cycle between `Sum` and `Variant`; the sum is looked up by name in the type
    /// environment when needed).
    pub parent: String,
}

#[derive(Debug, Clone)]
pub struct RecordType {
    pub name: String,
    pub fields: Vec<(String, Type)>,
    pub type_params: Vec<String>,
    pub type_args: Vec<Type>,
}

#[derive(Debug, Clone)]
pub struct TraitType {
    pub name: String,
    pub methods: HashMap<String, FunctionSignature>,
    pub type_params: Vec<String>,
    pub type_args: Vec<Type>,
}

/// The closed semantic type set (§3).
#[derive(Debug, Clone)]
pub enum Type {
    Integer,
    Double,
    Boolean,
    String,
    Null,
    Any,
    Array(Box<Type>),
    Hash(Box<Type>, Box<Type>),
    Tuple(Vec<Type>),
    Function(FunctionSignature),
    Record(Rc<RecordType>),
    Sum(Rc<SumType>),
    Variant(Rc<VariantType>),
    Trait(Rc<TraitType>),
    TypeVariable { name: String, bounds: Vec<String> },
    Module { name: String, env: crate::typechecker::env::TypeEnvHandle },
    Error { message: String, node: Option<Box<Statement>> },
}

impl Type {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Type::Integer => "Integer",
            Type::Double => "Double",
            Type::Boolean => "Boolean",
            Type::String => "String",
            Type::Null => "Null",
            Type::Any => "Any",
            Type::Array(_) => "Array",
            Type::Hash(_, _) => "Hash",
            Type::Tuple(_) => "Tuple",
            Type::Function(_) => "Function",
            Type::Record(_) => "Record",
            Type::Sum(_) => "Sum",
            Type::Variant(_) => "Variant",
            Type::Trait(_) => "Trait",
            Type::TypeVariable { .. } => "TypeVariable",
            Type::Module { .. } => "Module",
            Type::Error { .. } => "Error",
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Type::Error { .. })
    }

    pub fn error(message: impl Into<String>) -> Type {
        Type::Error {
            message: message.into(),
            node: None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::Integer | Type::Double)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Integer => write!(f, "Integer"),
            Type::Double => write!(f, "Double"),
            Type::Boolean => write!(f, "Boolean"),
            Type::String => write!(f, "String"),
            Type::Null => write!(f, "Null"),
            Type::Any => write!(f, "Any"),
            Type::Array(el) => write!(f, "Array<{el}>"),
            Type::Hash(k, v) => write!(f, "Hash<{k}, {v}>"),
            Type::Tuple(els) => {
                write!(f, "(")?;
                for (i, el) in els.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{el}")?;
                }
                write!(f, ")")
            }
            Type::Function(sig) => {
                write!(f, "fn(")?;
                for (i, p) in sig.params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{p}")?;
                }
                write!(f, ") -> {}", sig.return_type)
            }
            Type::Record(r) => write!(f, "{}", r.name),
            Type::Sum(s) => write!(f, "{}", s.name),
            Type::Variant(v) => write!(f, "{}", v.name),
            Type::Trait(t) => write!(f, "{}", t.name),
            Type::TypeVariable { name, .. } => write!(f, "{name}"),
            Type::Module { name, .. } => write!(f, "module {name}"),
            Type::Error { message, .. } => write!(f, "<error: {message}>"),
        }
    }
}

/// Structural equality used by unification's "kinds must match" rule; deliberately ignores
/// `Error` (an error never structurally equals anything, including another error).
impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        use Type::*;
        match (self, other) {
            (Integer, Integer) | (Double, Double) | (Boolean, Boolean) | (String, String) | (Null, Null) | (Any, Any) => true,
            (Array(a), Array(b)) => a == b,
            (Hash(k1, v1), Hash(k2, v2)) => k1 == k2 && v1 == v2,
            (Tuple(a), Tuple(b)) => a == b,
            (Function(a), Function(b)) => a.params == b.params && a.return_type == b.return_type,
            (Record(a), Record(b)) => a.name == b.name && a.type_args == b.type_args,
            (Sum(a), Sum(b)) => a.name == b.name && a.type_args == b.type_args,
            (Variant(a), Variant(b)) => a.name == b.name && a.parent == b.parent,
            (Trait(a), Trait(b)) => a.name == b.name && a.type_args == b.type_args,
            (TypeVariable { name: a, .. }, TypeVariable { name: b, .. }) => a == b,
            (Module { name: a, .. }, Module { name: b, .. }) => a == b,
            _ => false,
        }
    }
}
