//! Read-eval-print loop (ambient expansion of §6's CLI surface): a `rustyline`-backed input loop
//! that accumulates one module-level type/value environment across lines, echoing the value of
//! each top-level expression statement and persisting `let` bindings between lines, mirroring the
//! loader's per-module environment lifecycle (§4.5) rather than starting a fresh scope per line.

use std::rc::Rc;

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use crate::ast::Statement;
use crate::evaluator::value::Value;
use crate::evaluator::Evaluator;
use crate::lexer::Lexer;
use crate::parser;
use crate::prelude;
use crate::typechecker::Checker;

const PROMPT: &str = "lumen> ";

/// Runs the loop until EOF (Ctrl-D) or `Ctrl-C`. Each accepted line is lexed, parsed, type
/// checked, and evaluated against the same pair of environments built once at startup, so a `let`
/// on one line is visible on the next.
pub fn run() {
    let mut editor = DefaultEditor::new().expect("failed to initialize line editor");
    let (type_env, value_env) = prelude::root_envs();

    loop {
        match editor.readline(PROMPT) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let _ = editor.add_history_entry(line);
                eval_line(line, &type_env, &value_env);
            }
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("error: {e}");
                break;
            }
        }
    }
}

fn eval_line(line: &str, type_env: &crate::typechecker::env::TypeEnvHandle, value_env: &crate::evaluator::env::ValueEnvHandle) {
    let source = if line.trim_end().ends_with(';') { line.to_string() } else { format!("{line};") };

    let tokens = Lexer::new(&source).lex();
    let program = match parser::parse(tokens, &source) {
        Ok(program) => program,
        Err(errors) => {
            for error in errors {
                eprintln!("{error}");
            }
            return;
        }
    };

    let source_rc: Rc<str> = Rc::from(source.as_str());

    let checker = Checker::new(source_rc.clone());
    if let Err(e) = checker.check_program(&program, type_env) {
        eprintln!("{e}");
        return;
    }

    let evaluator = Evaluator::new(source_rc);
    match evaluator.eval_program(&program, value_env) {
        Ok(value) => echo_result(&program, &value),
        Err(e) => eprintln!("{e}"),
    }
}

/// Only expression statements produce output worth echoing; `let`/type declarations already
/// describe themselves by the name they bind.
fn echo_result(program: &crate::ast::Program, value: &Value) {
    if matches!(program.statements.last(), Some(Statement::Expression { .. })) && !matches!(value, Value::Null) {
        println!("{value}");
    }
}
