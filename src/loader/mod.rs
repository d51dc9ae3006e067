//! Module loader (§4.5): resolves dotted module names to source files, detects cycles, memoizes
//! loaded modules, and seeds prelude bindings. Native modules (§4.6) bypass parsing entirely.
//!
//! Grounded on the teacher's `load_module`/`load_modules` pair (`loader/mod.rs`): a
//! `Modules<T> = HashMap<String, Module<T>>` cache keyed by module name, built up by walking a
//! file's imports. This loader folds the teacher's two-pass "load everything, then type-check
//! everything" shape (its `type_safe_modules` loop in `src/bin/why/main.rs`) into a single
//! recursive `load`, since here each module's checking and evaluation genuinely depend on its
//! imports being fully loaded (checked and evaluated) first, not merely parsed.

mod error;

pub use error::LoadError;

use std::cell::RefCell;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use log::{debug, trace};

use crate::ast::Statement;
use crate::evaluator::env::{ValueEnv, ValueEnvHandle};
use crate::evaluator::{self, Evaluator};
use crate::lexer::{Lexer, Token};
use crate::parser;
use crate::prelude;
use crate::stdlib;
use crate::typechecker::env::{TypeEnv, TypeEnvHandle};
use crate::typechecker::{self, Checker};
use crate::types::Type;

/// A fully loaded module: its checked-and-evaluated type/value environments, cached for the
/// process lifetime (§3 "Lifecycles"). `program` is `None` for native modules, which never have
/// an AST (§4.5 step 4 "native modules bypass parsing").
pub struct LoadedModule {
    pub name: String,
    pub type_env: TypeEnvHandle,
    pub value_env: ValueEnvHandle,
}

/// Resolves and caches modules for one interpreter run. Holds a base directory dotted names
/// resolve against and two caches: the loaded-module map and a loading stack used for cycle
/// detection (§4.5 "A loader has a base directory and two caches").
pub struct ModuleLoader {
    base_dir: PathBuf,
    cache: RefCell<std::collections::HashMap<String, Rc<LoadedModule>>>,
    loading: RefCell<Vec<String>>,
}

impl ModuleLoader {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            cache: RefCell::new(std::collections::HashMap::new()),
            loading: RefCell::new(Vec::new()),
        }
    }

    fn resolve_path(&self, dotted_name: &str) -> PathBuf {
        let mut path = self.base_dir.clone();
        for segment in dotted_name.split('.') {
            path.push(segment);
        }
        path.set_extension("lu");
        path
    }

    /// Loads and caches `name` (§4.5 `load(name)`, steps 1-10). Returns the cached module on a
    /// repeat call with no further work.
    pub fn load(&self, name: &str) -> Result<Rc<LoadedModule>, LoadError> {
        if let Some(cached) = self.cache.borrow().get(name) {
            trace!("module `{name}` already cached");
            return Ok(cached.clone());
        }

        if self.loading.borrow().iter().any(|n| n == name) {
            let mut chain = self.loading.borrow().clone();
            chain.push(name.to_string());
            return Err(LoadError::new(format!(
                "circular dependency while loading modules: {}",
                chain.join(" -> ")
            )));
        }

        debug!("loading module `{name}`");
        self.loading.borrow_mut().push(name.to_string());
        let result = self.load_uncached(name);
        self.loading.borrow_mut().pop();

        let module = result?;
        self.cache.borrow_mut().insert(name.to_string(), module.clone());
        Ok(module)
    }

    fn load_uncached(&self, name: &str) -> Result<Rc<LoadedModule>, LoadError> {
        if let Some(native) = stdlib::load_native(name) {
            return Ok(Rc::new(self.build_native_module(name, native)));
        }

        let path = self.resolve_path(name);
        let source = fs::read_to_string(&path)
            .map_err(|e| LoadError::new(format!("cannot read module `{name}` ({}): {e}", path.display())))?;

        let tokens = Lexer::new(&source).lex();
        let program = parser::parse(tokens, &source).map_err(|errors| {
            let rendered = errors
                .into_iter()
                .map(|mut e| {
                    patch_file(&mut e.pos, &path);
                    e.to_string()
                })
                .collect::<Vec<_>>()
                .join("\n");
            LoadError::new(format!("parse errors in `{}`:\n{rendered}", path.display()))
        })?;

        let (type_env, value_env) = prelude::root_envs();
        self.apply_module_header(&program, &type_env, &value_env);

        for stmt in &program.statements {
            if let Statement::Use {
                token,
                path: use_path,
                alias,
                exposing,
            } = stmt
            {
                self.process_use(use_path, alias.as_deref(), exposing.as_deref(), token, &type_env, &value_env)?;
            }
        }

        let source_rc: Rc<str> = Rc::from(source.as_str());

        let checker = Checker::new(source_rc.clone());
        checker.check_program(&program, &type_env).map_err(|mut e| {
            patch_file(&mut e.pos, &path);
            LoadError::new(e.to_string())
        })?;

        let evaluator = Evaluator::new(source_rc);
        evaluator.eval_program(&program, &value_env).map_err(|mut e| {
            patch_file(&mut e.pos, &path);
            LoadError::new(e.to_string())
        })?;

        Ok(Rc::new(LoadedModule {
            name: name.to_string(),
            type_env,
            value_env,
        }))
    }

    fn build_native_module(&self, name: &str, native: stdlib::NativeModule) -> LoadedModule {
        let type_env = TypeEnv::root();
        let value_env = ValueEnv::root();
        for (member_name, ty) in native.types {
            type_env.borrow_mut().define(member_name, ty, false);
        }
        for (member_name, value) in native.values {
            value_env.borrow_mut().define(member_name, value, false);
        }
        // "mark all names exposed" (§4.5 step 4) is the default (`exposed: None`) already.
        LoadedModule {
            name: name.to_string(),
            type_env,
            value_env,
        }
    }

    /// A `module Name [exposing (a, b)];` header, if present, is required to be the first
    /// statement (§6 "File and module conventions"). Absent header or absent exposing clause
    /// leaves both environments with their default "everything exposed" state.
    fn apply_module_header(&self, program: &crate::ast::Program, type_env: &TypeEnvHandle, value_env: &ValueEnvHandle) {
        if let Some(Statement::Module { exposing: Some(names), .. }) = program.statements.first() {
            let set: HashSet<String> = names.iter().cloned().collect();
            type_env.borrow_mut().set_exposed(set.clone());
            value_env.borrow_mut().set_exposed(set);
        }
    }

    /// `use path [as alias] [exposing (n1, n2, …)]` (§4.5). Trait implementations from the
    /// loaded module are always merged into the importer, regardless of whether anything was
    /// exposed (§4.5 "Trait implementations are always merged").
    fn process_use(
        &self,
        path: &[String],
        alias: Option<&str>,
        exposing: Option<&[String]>,
        token: &Token,
        type_env: &TypeEnvHandle,
        value_env: &ValueEnvHandle,
    ) -> Result<(), LoadError> {
        let dotted = path.join(".");
        let loaded = self.load(&dotted)?;

        match (alias, exposing) {
            (Some(alias), _) => {
                type_env.borrow_mut().define(
                    alias.to_string(),
                    Type::Module {
                        name: dotted.clone(),
                        env: loaded.type_env.clone(),
                    },
                    false,
                );
                value_env.borrow_mut().define(
                    alias.to_string(),
                    evaluator::Value::Module {
                        name: dotted.clone(),
                        env: loaded.value_env.clone(),
                    },
                    false,
                );
            }
            (None, Some(names)) => {
                for exposed_name in names {
                    if !loaded.type_env.borrow().is_exposed(exposed_name) {
                        return Err(LoadError::new(format!(
                            "`{exposed_name}` is not exposed by module `{dotted}` ({}:{}:{})",
                            dotted, token.line, token.column
                        )));
                    }
                    let ty = typechecker::env::resolve(&loaded.type_env, exposed_name).ok_or_else(|| {
                        LoadError::new(format!("module `{dotted}` has no member `{exposed_name}`"))
                    })?;
                    type_env.borrow_mut().define(exposed_name.clone(), ty, false);

                    if let Some(value) = evaluator::env::resolve(&loaded.value_env, exposed_name) {
                        value_env.borrow_mut().define(exposed_name.clone(), value, false);
                    }
                }
            }
            (None, None) => {
                let last = path.last().cloned().unwrap_or_default();
                type_env.borrow_mut().define(
                    last.clone(),
                    Type::Module {
                        name: dotted.clone(),
                        env: loaded.type_env.clone(),
                    },
                    false,
                );
                value_env.borrow_mut().define(
                    last,
                    evaluator::Value::Module {
                        name: dotted.clone(),
                        env: loaded.value_env.clone(),
                    },
                    false,
                );
            }
        }

        for (base_name, entries) in loaded.type_env.borrow().impls_snapshot() {
            for entry in entries {
                type_env.borrow_mut().add_impl(base_name.clone(), entry);
            }
        }
        for (base_name, methods) in loaded.value_env.borrow().methods_snapshot() {
            for (method_name, func) in methods {
                value_env.borrow_mut().add_method(base_name.clone(), method_name, func);
            }
        }

        Ok(())
    }
}

fn patch_file(pos: &mut Option<crate::diagnostics::SourcePos>, path: &Path) {
    if let Some(pos) = pos {
        pos.file = Some(path.display().to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_module(dir: &Path, rel_path: &str, contents: &str) {
        let full = dir.join(rel_path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        let mut file = fs::File::create(full).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
    }

    #[test]
    fn loads_and_caches_a_simple_module() {
        let dir = std::env::temp_dir().join(format!("lumen-loader-test-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        write_module(&dir, "greet.lu", "let greeting = \"hi\";");

        let loader = ModuleLoader::new(&dir);
        let first = loader.load("greet").expect("first load");
        let second = loader.load("greet").expect("second load (cached)");
        assert!(Rc::ptr_eq(&first, &second));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn detects_circular_imports() {
        let dir = std::env::temp_dir().join(format!("lumen-loader-cycle-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        write_module(&dir, "a.lu", "use b;");
        write_module(&dir, "b.lu", "use a;");

        let loader = ModuleLoader::new(&dir);
        let err = loader.load("a").expect_err("expected a cycle error");
        assert!(err.message.contains("circular dependency"));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn use_exposing_binds_imported_names() {
        let dir = std::env::temp_dir().join(format!("lumen-loader-expose-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        write_module(&dir, "math_extra.lu", "module math_extra exposing (double);\nlet double = (x: Integer) -> Integer => x * 2;");
        write_module(&dir, "main.lu", "use math_extra exposing (double);\ndouble(21);");

        let loader = ModuleLoader::new(&dir);
        let module = loader.load("main").expect("load main");
        assert!(evaluator::env::resolve(&module.value_env, "double").is_some());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn native_module_resolves_without_touching_the_filesystem() {
        let dir = std::env::temp_dir().join(format!("lumen-loader-native-{}", std::process::id()));
        let loader = ModuleLoader::new(&dir);
        let module = loader.load("math").expect("native modules don't read from disk");
        assert!(typechecker::env::resolve(&module.type_env, "sqrt").is_some());
    }
}
