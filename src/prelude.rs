//! Seeds the `Result`/`Option` sum types and their constructors into a fresh root environment
//! pair, the way [`crate::typechecker::Checker::check_type_decl`] seeds any other `type`
//! declaration — these two are simply declared by the runtime itself instead of by a program's
//! own source, since every program gets them without writing `type Result = Ok(T) | Err(E);`.

use std::collections::HashMap;
use std::rc::Rc;

use crate::evaluator::env::{ValueEnv, ValueEnvHandle};
use crate::evaluator::value::{Constructor, Value};
use crate::types::{FunctionSignature, SumType, Type, VariantType};
use crate::typechecker::env::TypeEnvHandle;

/// Registers `Result<T, E> = Ok(T) | Err(E)` and `Option<T> = Some(T) | None` into `type_env`,
/// mirroring exactly how a user `type` declaration would be checked.
pub fn seed_types(type_env: &TypeEnvHandle) {
    seed_sum(
        type_env,
        "Result",
        &["T".to_string(), "E".to_string()],
        &[("Ok", vec![tv("T")]), ("Err", vec![tv("E")])],
    );
    seed_sum(
        type_env,
        "Option",
        &["T".to_string()],
        &[("Some", vec![tv("T")]), ("None", vec![])],
    );
}

fn tv(name: &str) -> Type {
    Type::TypeVariable {
        name: name.to_string(),
        bounds: vec![],
    }
}

fn seed_sum(type_env: &TypeEnvHandle, name: &str, type_params: &[String], variants: &[(&str, Vec<Type>)]) {
    let mut variant_types = HashMap::new();
    for (vname, params) in variants {
        variant_types.insert(
            vname.to_string(),
            Rc::new(VariantType {
                name: vname.to_string(),
                params: params.clone(),
                parent: name.to_string(),
            }),
        );
    }
    let sum = Rc::new(SumType {
        name: name.to_string(),
        variants: variant_types.clone(),
        type_params: type_params.to_vec(),
        type_args: type_params.iter().map(|p| tv(p)).collect(),
    });

    for (vname, vty) in &variant_types {
        let ctor_type = Type::Function(FunctionSignature {
            params: vty.params.clone(),
            return_type: Box::new(Type::Sum(sum.clone())),
            type_params: type_params.to_vec(),
        });
        type_env.borrow_mut().define_constructor(vname.clone(), ctor_type.clone());
        type_env.borrow_mut().define(vname.clone(), ctor_type, false);
    }
    type_env.borrow_mut().define(name.to_string(), Type::Sum(sum), false);
}

/// Registers the matching runtime constructors (`Ok`, `Err`, `Some`, `None`) into `value_env`, so
/// calling them at runtime builds a [`crate::evaluator::value::SumInstanceValue`] the same way a
/// user-declared variant constructor does.
pub fn seed_values(value_env: &ValueEnvHandle) {
    for (sum_name, variant_name) in [("Result", "Ok"), ("Result", "Err"), ("Option", "Some"), ("Option", "None")] {
        value_env.borrow_mut().define_constructor(
            variant_name.to_string(),
            Value::Constructor(Rc::new(Constructor::Variant {
                sum_name: sum_name.to_string(),
                variant_name: variant_name.to_string(),
            })),
        );
    }
}

/// Builds a fresh root type/value environment pair with the prelude already seeded — the entry
/// point the CLI, REPL and module loader all share instead of each re-declaring `Result`/`Option`.
pub fn root_envs() -> (TypeEnvHandle, ValueEnvHandle) {
    let type_env = crate::typechecker::env::TypeEnv::root();
    seed_types(&type_env);
    let value_env = ValueEnv::root();
    seed_values(&value_env);
    (type_env, value_env)
}
