//! The type checker's scoped environment (§3 "Environments").
//!
//! Grounded on the teacher's `TypeScope` push/pop discipline (`typechecker/mod.rs`), generalized
//! from a single `Vec<HashMap<...>>` stack to a parent-chained `Rc<RefCell<_>>` graph so that
//! function closures (captured at definition time) and module environments (cached across
//! `use` sites) can each hold their own independent reference to an ancestor scope.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::Rc;

use crate::ast::Statement;
use crate::types::Type;

pub type TypeEnvHandle = Rc<RefCell<TypeEnv>>;

/// One `impl` block on record under the implementation table, paired with the environment it
/// was declared in (needed to resolve the impl's own type parameters when dispatching).
pub type ImplEntry = (Rc<Statement>, TypeEnvHandle);

pub struct TypeEnv {
    parent: Option<TypeEnvHandle>,
    bindings: HashMap<String, (Type, bool)>,
    constructors: HashMap<String, Type>,
    impls: HashMap<String, Vec<ImplEntry>>,
    exposed: Option<HashSet<String>>,
    current_return_type: Option<Type>,
}

impl fmt::Debug for TypeEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeEnv")
            .field("bindings", &self.bindings.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl TypeEnv {
    pub fn root() -> TypeEnvHandle {
        Rc::new(RefCell::new(TypeEnv {
            parent: None,
            bindings: HashMap::new(),
            constructors: HashMap::new(),
            impls: HashMap::new(),
            exposed: None,
            current_return_type: None,
        }))
    }

    pub fn child(parent: &TypeEnvHandle) -> TypeEnvHandle {
        Rc::new(RefCell::new(TypeEnv {
            parent: Some(parent.clone()),
            bindings: HashMap::new(),
            constructors: HashMap::new(),
            impls: HashMap::new(),
            exposed: None,
            current_return_type: None,
        }))
    }

    pub fn define(&mut self, name: impl Into<String>, ty: Type, mutable: bool) {
        self.bindings.insert(name.into(), (ty, mutable));
    }

    pub fn define_constructor(&mut self, name: impl Into<String>, ty: Type) {
        self.constructors.insert(name.into(), ty);
    }

    pub fn add_impl(&mut self, base_type_name: impl Into<String>, entry: ImplEntry) {
        self.impls.entry(base_type_name.into()).or_default().push(entry);
    }

    pub fn set_exposed(&mut self, names: HashSet<String>) {
        self.exposed = Some(names);
    }

    pub fn is_exposed(&self, name: &str) -> bool {
        match &self.exposed {
            None => true,
            Some(set) => set.contains(name),
        }
    }

    pub fn set_return_type(&mut self, ty: Type) {
        self.current_return_type = Some(ty);
    }

    /// A copy of this frame's own implementation table (not the chain), used by the loader to
    /// merge a `use`d module's impls into the importer unconditionally (§4.5 "trait
    /// implementations are always merged").
    pub fn impls_snapshot(&self) -> HashMap<String, Vec<ImplEntry>> {
        self.impls.clone()
    }
}

/// Resolves a binding by walking the environment chain; constructors shadow plain bindings at
/// every scope (§4.3 "Identifiers resolve in the constructor table first").
pub fn resolve(env: &TypeEnvHandle, name: &str) -> Option<Type> {
    if let Some(ty) = resolve_constructor(env, name) {
        return Some(ty);
    }
    let mut current = env.clone();
    loop {
        if let Some((ty, _)) = current.borrow().bindings.get(name) {
            return Some(ty.clone());
        }
        let parent = current.borrow().parent.clone();
        match parent {
            Some(p) => current = p,
            None => return None,
        }
    }
}

pub fn resolve_mutability(env: &TypeEnvHandle, name: &str) -> Option<bool> {
    let mut current = env.clone();
    loop {
        if let Some((_, mutable)) = current.borrow().bindings.get(name) {
            return Some(*mutable);
        }
        let parent = current.borrow().parent.clone();
        match parent {
            Some(p) => current = p,
            None => return None,
        }
    }
}

pub fn resolve_constructor(env: &TypeEnvHandle, name: &str) -> Option<Type> {
    let mut current = env.clone();
    loop {
        if let Some(ty) = current.borrow().constructors.get(name) {
            return Some(ty.clone());
        }
        let parent = current.borrow().parent.clone();
        match parent {
            Some(p) => current = p,
            None => return None,
        }
    }
}

/// Collects every `(impl-node, defining-env)` registered for `base_type_name` anywhere up the
/// chain — impls merge across module boundaries and are never shadowed (§4.5 "Trait
/// implementations are always merged").
pub fn impls_for(env: &TypeEnvHandle, base_type_name: &str) -> Vec<ImplEntry> {
    let mut out = vec![];
    let mut current = env.clone();
    loop {
        if let Some(entries) = current.borrow().impls.get(base_type_name) {
            out.extend(entries.iter().cloned());
        }
        let parent = current.borrow().parent.clone();
        match parent {
            Some(p) => current = p,
            None => break,
        }
    }
    out
}

pub fn current_return_type(env: &TypeEnvHandle) -> Option<Type> {
    let mut current = env.clone();
    loop {
        if let Some(ty) = current.borrow().current_return_type.clone() {
            return Some(ty);
        }
        let parent = current.borrow().parent.clone();
        match parent {
            Some(p) => current = p,
            None => return None,
        }
    }
}

/// Rebinds an already-mutable identifier at the frame that declares it, per the evaluator's
/// matching discipline in §4.4 (the checker only needs to validate mutability, not rewrite the
/// binding, since types don't change across reassignment of the same name).
pub fn assert_mutable(env: &TypeEnvHandle, name: &str) -> Result<(), String> {
    match resolve_mutability(env, name) {
        Some(true) => Ok(()),
        Some(false) => Err(format!("cannot assign to immutable binding `{name}`")),
        None => Err(format!("unknown identifier `{name}`")),
    }
}
