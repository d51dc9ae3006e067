//! Console I/O adapter (§4.6): `readLine` over stdin, plus `print`/`writeln`, which are also
//! bound unqualified into every scope via [`crate::evaluator::builtins`] (§4.3's builtin table)
//! so `module.io` gives the same two names a plain top-level call already reaches.

use std::io::{self, Write as _};

use crate::evaluator::value::Value;
use crate::types::{FunctionSignature, Type};

use super::{native_fn, result_of, NativeModule};

pub fn module() -> NativeModule {
    NativeModule {
        name: "io",
        types: vec![
            (
                "readLine".to_string(),
                Type::Function(FunctionSignature {
                    params: vec![],
                    return_type: Box::new(result_of(Type::String, Type::String)),
                    type_params: vec![],
                }),
            ),
            (
                "print".to_string(),
                Type::Function(FunctionSignature {
                    params: vec![Type::Any],
                    return_type: Box::new(Type::Null),
                    type_params: vec![],
                }),
            ),
            (
                "writeln".to_string(),
                Type::Function(FunctionSignature {
                    params: vec![Type::Any],
                    return_type: Box::new(Type::Null),
                    type_params: vec![],
                }),
            ),
        ],
        values: vec![
            ("readLine".to_string(), native_fn("io.readLine", read_line)),
            ("print".to_string(), native_fn("io.print", print_fn)),
            ("writeln".to_string(), native_fn("io.writeln", writeln_fn)),
        ],
    }
}

fn read_line(_args: &[Value]) -> Result<Value, String> {
    let mut line = String::new();
    match io::stdin().read_line(&mut line) {
        Ok(0) => Ok(super::err(Value::String("EOF".to_string()))),
        Ok(_) => {
            if line.ends_with('\n') {
                line.pop();
                if line.ends_with('\r') {
                    line.pop();
                }
            }
            Ok(super::ok(Value::String(line)))
        }
        Err(e) => Ok(super::err(Value::String(e.to_string()))),
    }
}

fn display_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn print_fn(args: &[Value]) -> Result<Value, String> {
    print!("{}", display_string(&args[0]));
    io::stdout().flush().map_err(|e| e.to_string())?;
    Ok(Value::Null)
}

fn writeln_fn(args: &[Value]) -> Result<Value, String> {
    println!("{}", display_string(&args[0]));
    Ok(Value::Null)
}
