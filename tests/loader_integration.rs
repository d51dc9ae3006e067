//! Exercises [`lumen::loader::ModuleLoader`] against real files on disk: cross-module `use`,
//! trait-impl merging across a module boundary, and native-module dispatch. Grounded on the same
//! scenario the loader's own `#[cfg(test)]` module covers, but through multi-statement fixtures
//! closer to a real program.

use std::fs;
use std::path::{Path, PathBuf};

use lumen::loader::ModuleLoader;

fn scratch_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("lumen-it-{tag}-{}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn write(dir: &Path, rel: &str, contents: &str) {
    fs::write(dir.join(rel), contents).unwrap();
}

#[test]
fn imported_module_runs_before_the_importer_continues() {
    let dir = scratch_dir("order");
    write(
        &dir,
        "greeter.lu",
        r#"
        module greeter exposing (greet);
        let greet = (name: String) -> String => strFormat("hello, {?}", name);
        "#,
    );
    write(&dir, "main.lu", "use greeter exposing (greet);\ngreet(\"world\");");

    let loader = ModuleLoader::new(&dir);
    let module = loader.load("main").expect("loads main and its dependency");
    assert!(lumen::evaluator::env::resolve(&module.value_env, "greet").is_some());

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn trait_impls_merge_across_a_module_boundary() {
    let dir = scratch_dir("traits");
    write(
        &dir,
        "shapes.lu",
        r#"
        module shapes;
        trait Area { fn area(self) -> Integer; }
        record Square(side: Integer);
        impl Area for Square { fn area(self) -> Integer => self.side * self.side; }
        "#,
    );
    write(&dir, "main.lu", "use shapes exposing (Square);\nSquare(4).area();");

    let loader = ModuleLoader::new(&dir);
    let module = loader.load("main").expect("merges shapes' Area impl into main");
    assert!(lumen::typechecker::env::resolve(&module.type_env, "Square").is_some());

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn aliased_use_binds_a_module_value() {
    let dir = scratch_dir("alias");
    write(&dir, "main.lu", "use math as m;\nm.sqrt(9.0);");

    let loader = ModuleLoader::new(&dir);
    let module = loader.load("main").expect("aliases the native math module");
    assert!(lumen::evaluator::env::resolve(&module.value_env, "m").is_some());

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn unexposed_names_cannot_be_imported() {
    let dir = scratch_dir("unexposed");
    write(
        &dir,
        "secret.lu",
        "module secret exposing (publicOnly);\nlet publicOnly = 1;\nlet hidden = 2;",
    );
    write(&dir, "main.lu", "use secret exposing (hidden);");

    let loader = ModuleLoader::new(&dir);
    let err = loader.load("main").expect_err("hidden is not exposed");
    assert!(err.message.contains("hidden"));

    let _ = fs::remove_dir_all(&dir);
}
