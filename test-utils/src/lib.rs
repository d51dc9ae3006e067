//! Shared harness for integration tests under `../tests`: runs a source string through the full
//! lex/parse/check/eval pipeline in-process, mirroring the teacher's `check_compilation` /
//! `check_failing_type_checking` pair (`test-utils/src/lib.rs`) but adapted to a tree-walking
//! interpreter with no separate compile step.

use std::rc::Rc;

use lumen::evaluator::value::Value;
use lumen::evaluator::Evaluator;
use lumen::lexer::Lexer;
use lumen::parser;
use lumen::prelude;
use lumen::typechecker::Checker;

/// Runs `source` to completion, returning the value of the final statement. Fails the caller's
/// `Result` on the first parse, type, or runtime error encountered, the same "stop at first
/// failure" policy the CLI's `run` subcommand uses.
pub fn run_source(source: &str) -> Result<Value, String> {
    let tokens = Lexer::new(source).lex();
    let program = parser::parse(tokens, source).map_err(|errors| {
        errors.into_iter().map(|e| e.to_string()).collect::<Vec<_>>().join("\n")
    })?;

    let (type_env, value_env) = prelude::root_envs();

    let source_rc: Rc<str> = Rc::from(source);
    Checker::new(source_rc.clone()).check_program(&program, &type_env).map_err(|e| e.to_string())?;

    Evaluator::new(source_rc).eval_program(&program, &value_env).map_err(|e| e.to_string())
}

/// Asserts `source` evaluates successfully and returns the value it produced.
pub fn check_runs(source: &str) -> Value {
    run_source(source).unwrap_or_else(|e| panic!("expected `{source}` to run, but it failed:\n{e}"))
}

/// Asserts `source` fails somewhere in the pipeline (parse, type check, or evaluation), mirroring
/// the teacher's `check_failing_type_checking`.
pub fn check_fails(source: &str) -> String {
    match run_source(source) {
        Ok(value) => panic!("expected `{source}` to fail, but it produced {value:?}"),
        Err(message) => message,
    }
}

/// Builds a fresh value environment seeded with the `Result`/`Option` prelude (§3), for tests
/// that want to evaluate a pre-parsed program directly instead of going through [`run_source`].
pub fn fresh_value_env() -> lumen::evaluator::env::ValueEnvHandle {
    prelude::root_envs().1
}
