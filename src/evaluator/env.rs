//! The evaluator's scoped environment, mirroring [`crate::typechecker::env::TypeEnv`] one level
//! down: same parent-chain/constructor-table/impl-table shape, holding [`Value`]s instead of
//! [`crate::types::Type`]s so reassignment walks the chain to the frame that actually owns the
//! binding (§4.4 "mutable assignment updates the declaring frame, not a new shadow").

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::Rc;

use super::value::{FunctionValue, Value};

pub type ValueEnvHandle = Rc<RefCell<ValueEnv>>;

pub struct ValueEnv {
    parent: Option<ValueEnvHandle>,
    bindings: HashMap<String, (Value, bool)>,
    constructors: HashMap<String, Value>,
    /// `base_type_name -> method_name -> function`, merged across the whole chain the same way
    /// the checker's impl table is (§4.5 "trait implementations are always merged").
    methods: HashMap<String, HashMap<String, Rc<FunctionValue>>>,
    exposed: Option<HashSet<String>>,
}

impl fmt::Debug for ValueEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueEnv")
            .field("bindings", &self.bindings.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ValueEnv {
    pub fn root() -> ValueEnvHandle {
        Rc::new(RefCell::new(ValueEnv {
            parent: None,
            bindings: HashMap::new(),
            constructors: HashMap::new(),
            methods: HashMap::new(),
            exposed: None,
        }))
    }

    pub fn child(parent: &ValueEnvHandle) -> ValueEnvHandle {
        Rc::new(RefCell::new(ValueEnv {
            parent: Some(parent.clone()),
            bindings: HashMap::new(),
            constructors: HashMap::new(),
            methods: HashMap::new(),
            exposed: None,
        }))
    }

    pub fn define(&mut self, name: impl Into<String>, value: Value, mutable: bool) {
        self.bindings.insert(name.into(), (value, mutable));
    }

    pub fn define_constructor(&mut self, name: impl Into<String>, value: Value) {
        self.constructors.insert(name.into(), value);
    }

    pub fn add_method(&mut self, base_type_name: impl Into<String>, method_name: impl Into<String>, func: Rc<FunctionValue>) {
        self.methods.entry(base_type_name.into()).or_default().insert(method_name.into(), func);
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

    /// A copy of this frame's own method table (not the chain); the loader's counterpart to
    /// [`crate::typechecker::env::TypeEnv::impls_snapshot`].
    pub fn methods_snapshot(&self) -> HashMap<String, HashMap<String, Rc<FunctionValue>>> {
        self.methods.clone()
    }
}

pub fn resolve(env: &ValueEnvHandle, name: &str) -> Option<Value> {
    if let Some(v) = resolve_constructor(env, name) {
        return Some(v);
    }
    let mut current = env.clone();
    loop {
        if let Some((v, _)) = current.borrow().bindings.get(name) {
            return Some(v.clone());
        }
        let parent = current.borrow().parent.clone();
        match parent {
            Some(p) => current = p,
            None => return None,
        }
    }
}

pub fn resolve_constructor(env: &ValueEnvHandle, name: &str) -> Option<Value> {
    let mut current = env.clone();
    loop {
        if let Some(v) = current.borrow().constructors.get(name) {
            return Some(v.clone());
        }
        let parent = current.borrow().parent.clone();
        match parent {
            Some(p) => current = p,
            None => return None,
        }
    }
}

/// Collects every method registered for `base_type_name` anywhere up the chain; a name defined
/// closer to the call site shadows one defined further up.
pub fn methods_for(env: &ValueEnvHandle, base_type_name: &str) -> HashMap<String, Rc<FunctionValue>> {
    let mut out = HashMap::new();
    let mut chain = vec![];
    let mut current = env.clone();
    loop {
        chain.push(current.clone());
        let parent = current.borrow().parent.clone();
        match parent {
            Some(p) => current = p,
            None => break,
        }
    }
    for frame in chain.into_iter().rev() {
        if let Some(entries) = frame.borrow().methods.get(base_type_name) {
            for (name, func) in entries {
                out.insert(name.clone(), func.clone());
            }
        }
    }
    out
}

/// Rebinds `name` at the frame that actually declares it (§4.4). Returns an error if no frame in
/// the chain owns the binding; the type checker already verified mutability before evaluation
/// runs, so this only needs to locate the frame.
pub fn assign(env: &ValueEnvHandle, name: &str, value: Value) -> Result<(), String> {
    let mut current = env.clone();
    loop {
        let owns = current.borrow().bindings.contains_key(name);
        if owns {
            current.borrow_mut().bindings.insert(name.to_string(), (value, true));
            return Ok(());
        }
        let parent = current.borrow().parent.clone();
        match parent {
            Some(p) => current = p,
            None => return Err(format!("unknown identifier `{name}`")),
        }
    }
}
