use std::collections::HashMap;

use super::Type;

/// A finite map from type-variable names to types (§4.3, GLOSSARY "Substitution").
#[derive(Debug, Clone, Default)]
pub struct Substitution {
    bindings: HashMap<String, Type>,
}

impl Substitution {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, name: impl Into<String>, ty: Type) {
        self.bindings.insert(name.into(), ty);
    }

    pub fn get(&self, name: &str) -> Option<&Type> {
        self.bindings.get(name)
    }
}

/// Attempts to make `a` (the expected type) and `b` (the actual type) structurally equal by
/// extending `subst`, per the rules in §4.3: `Any`/unresolved variables bind to the other side;
/// matching kinds unify component-wise; `Integer` unifies into an expected `Double` — one
/// direction only, `(a = Double, b = Integer)` — since accepting the reverse would silently let
/// a `Double` stand in wherever an `Integer` is declared; otherwise kinds must already be equal.
/// Callers that unify two sides with no real expected/actual relationship (e.g. two `match` arm
/// bodies) still pass the first-seen side as `a`; that side wins any narrowing so the relaxation
/// stays one-directional everywhere it applies.
pub fn unify(a: &Type, b: &Type, subst: &mut Substitution) -> Result<(), String> {
    match (a, b) {
        (Type::TypeVariable { name, .. }, other) | (other, Type::TypeVariable { name, .. }) => {
            if let Some(bound) = subst.get(name).cloned() {
                if let Type::TypeVariable { name: bound_name, .. } = &bound {
                    if bound_name == name {
                        return Ok(());
                    }
                }
                return unify(&bound, other, subst);
            }
            subst.bind(name.clone(), other.clone());
            Ok(())
        }
        (Type::Any, _) | (_, Type::Any) => Ok(()),
        (Type::Double, Type::Integer) => Ok(()),
        (Type::Array(a), Type::Array(b)) => unify(a, b, subst),
        (Type::Hash(ak, av), Type::Hash(bk, bv)) => {
            unify(ak, bk, subst)?;
            unify(av, bv, subst)
        }
        (Type::Tuple(a_els), Type::Tuple(b_els)) => {
            if a_els.len() != b_els.len() {
                return Err(format!(
                    "cannot unify tuples of different arity ({} vs {})",
                    a_els.len(),
                    b_els.len()
                ));
            }
            for (x, y) in a_els.iter().zip(b_els.iter()) {
                unify(x, y, subst)?;
            }
            Ok(())
        }
        (Type::Function(f1), Type::Function(f2)) => {
            if f1.params.len() != f2.params.len() {
                return Err(format!(
                    "cannot unify functions of different arity ({} vs {})",
                    f1.params.len(),
                    f2.params.len()
                ));
            }
            for (x, y) in f1.params.iter().zip(f2.params.iter()) {
                unify(x, y, subst)?;
            }
            unify(&f1.return_type, &f2.return_type, subst)
        }
        (Type::Sum(s1), Type::Sum(s2)) => {
            if s1.name != s2.name {
                return Err(format!("cannot unify `{}` with `{}`", s1.name, s2.name));
            }
            unify_type_args(&s1.type_args, &s2.type_args, subst)
        }
        (Type::Record(r1), Type::Record(r2)) => {
            if r1.name != r2.name {
                return Err(format!("cannot unify `{}` with `{}`", r1.name, r2.name));
            }
            unify_type_args(&r1.type_args, &r2.type_args, subst)
        }
        (Type::Trait(t1), Type::Trait(t2)) => {
            if t1.name != t2.name {
                return Err(format!("cannot unify `{}` with `{}`", t1.name, t2.name));
            }
            unify_type_args(&t1.type_args, &t2.type_args, subst)
        }
        (Type::Variant(v1), Type::Variant(v2)) => {
            if v1.name != v2.name || v1.parent != v2.parent {
                return Err(format!("cannot unify variant `{}` with `{}`", v1.name, v2.name));
            }
            Ok(())
        }
        (Type::Module { name: n1, .. }, Type::Module { name: n2, .. }) => {
            if n1 != n2 {
                return Err(format!("cannot unify module `{n1}` with `{n2}`"));
            }
            Ok(())
        }
        _ => {
            if a.kind_name() == b.kind_name() {
                Ok(())
            } else {
                Err(format!("cannot unify `{a}` with `{b}`"))
            }
        }
    }
}

fn unify_type_args(a: &[Type], b: &[Type], subst: &mut Substitution) -> Result<(), String> {
    if a.len() != b.len() {
        return Err(format!(
            "type argument count mismatch ({} vs {})",
            a.len(),
            b.len()
        ));
    }
    for (x, y) in a.iter().zip(b.iter()) {
        unify(x, y, subst)?;
    }
    Ok(())
}

/// Replaces every free type variable in `ty` with its image under `subst`, following chains of
/// bindings. A `seen` memo of variable names prevents infinite recursion when a variable's image
/// is (or contains) a recursive sum type that references itself through a further variable.
pub fn substitute(ty: &Type, subst: &Substitution) -> Type {
    substitute_inner(ty, subst, &mut Vec::new())
}

fn substitute_inner(ty: &Type, subst: &Substitution, seen: &mut Vec<String>) -> Type {
    match ty {
        Type::TypeVariable { name, bounds } => {
            if seen.contains(name) {
                return ty.clone();
            }
            match subst.get(name) {
                Some(bound) => {
                    seen.push(name.clone());
                    let result = substitute_inner(&bound.clone(), subst, seen);
                    seen.pop();
                    result
                }
                None => Type::TypeVariable {
                    name: name.clone(),
                    bounds: bounds.clone(),
                },
            }
        }
        Type::Array(el) => Type::Array(Box::new(substitute_inner(el, subst, seen))),
        Type::Hash(k, v) => Type::Hash(
            Box::new(substitute_inner(k, subst, seen)),
            Box::new(substitute_inner(v, subst, seen)),
        ),
        Type::Tuple(els) => Type::Tuple(els.iter().map(|e| substitute_inner(e, subst, seen)).collect()),
        Type::Function(sig) => Type::Function(super::FunctionSignature {
            params: sig.params.iter().map(|p| substitute_inner(p, subst, seen)).collect(),
            return_type: Box::new(substitute_inner(&sig.return_type, subst, seen)),
            type_params: sig.type_params.clone(),
        }),
        Type::Record(r) => {
            if r.type_args.is_empty() {
                ty.clone()
            } else {
                let mut new_r = (**r).clone();
                new_r.type_args = r.type_args.iter().map(|a| substitute_inner(a, subst, seen)).collect();
                Type::Record(std::rc::Rc::new(new_r))
            }
        }
        Type::Sum(s) => {
            if s.type_args.is_empty() {
                ty.clone()
            } else {
                let mut new_s = (**s).clone();
                new_s.type_args = s.type_args.iter().map(|a| substitute_inner(a, subst, seen)).collect();
                Type::Sum(std::rc::Rc::new(new_s))
            }
        }
        Type::Trait(t) => {
            if t.type_args.is_empty() {
                ty.clone()
            } else {
                let mut new_t = (**t).clone();
                new_t.type_args = t.type_args.iter().map(|a| substitute_inner(a, subst, seen)).collect();
                Type::Trait(std::rc::Rc::new(new_t))
            }
        }
        _ => ty.clone(),
    }
}
