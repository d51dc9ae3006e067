//! Filesystem adapter over `std::fs` (§4.6).

use std::fs;
use std::rc::Rc;

use crate::evaluator::value::Value;
use crate::types::{FunctionSignature, Type};

use super::{err, native_fn, ok, result_of, NativeModule};

pub fn module() -> NativeModule {
    NativeModule {
        name: "fs",
        types: vec![
            (
                "readFile".to_string(),
                Type::Function(FunctionSignature {
                    params: vec![Type::String],
                    return_type: Box::new(result_of(Type::String, Type::String)),
                    type_params: vec![],
                }),
            ),
            (
                "writeFile".to_string(),
                Type::Function(FunctionSignature {
                    params: vec![Type::String, Type::String],
                    return_type: Box::new(result_of(Type::Null, Type::String)),
                    type_params: vec![],
                }),
            ),
            (
                "exists".to_string(),
                Type::Function(FunctionSignature {
                    params: vec![Type::String],
                    return_type: Box::new(Type::Boolean),
                    type_params: vec![],
                }),
            ),
            (
                "removeFile".to_string(),
                Type::Function(FunctionSignature {
                    params: vec![Type::String],
                    return_type: Box::new(result_of(Type::Null, Type::String)),
                    type_params: vec![],
                }),
            ),
            (
                "listDir".to_string(),
                Type::Function(FunctionSignature {
                    params: vec![Type::String],
                    return_type: Box::new(result_of(Type::Array(Box::new(Type::String)), Type::String)),
                    type_params: vec![],
                }),
            ),
        ],
        values: vec![
            ("readFile".to_string(), native_fn("fs.readFile", read_file)),
            ("writeFile".to_string(), native_fn("fs.writeFile", write_file)),
            ("exists".to_string(), native_fn("fs.exists", exists)),
            ("removeFile".to_string(), native_fn("fs.removeFile", remove_file)),
            ("listDir".to_string(), native_fn("fs.listDir", list_dir)),
        ],
    }
}

fn read_file(args: &[Value]) -> Result<Value, String> {
    let Value::String(path) = &args[0] else {
        return Err("`readFile` expects a String path".to_string());
    };
    match fs::read_to_string(path) {
        Ok(contents) => Ok(ok(Value::String(contents))),
        Err(e) => Ok(err(Value::String(e.to_string()))),
    }
}

fn write_file(args: &[Value]) -> Result<Value, String> {
    let (Value::String(path), Value::String(contents)) = (&args[0], &args[1]) else {
        return Err("`writeFile` expects (String, String)".to_string());
    };
    match fs::write(path, contents) {
        Ok(()) => Ok(ok(Value::Null)),
        Err(e) => Ok(err(Value::String(e.to_string()))),
    }
}

fn exists(args: &[Value]) -> Result<Value, String> {
    let Value::String(path) = &args[0] else {
        return Err("`exists` expects a String path".to_string());
    };
    Ok(Value::Boolean(std::path::Path::new(path).exists()))
}

fn remove_file(args: &[Value]) -> Result<Value, String> {
    let Value::String(path) = &args[0] else {
        return Err("`removeFile` expects a String path".to_string());
    };
    match fs::remove_file(path) {
        Ok(()) => Ok(ok(Value::Null)),
        Err(e) => Ok(err(Value::String(e.to_string()))),
    }
}

fn list_dir(args: &[Value]) -> Result<Value, String> {
    let Value::String(path) = &args[0] else {
        return Err("`listDir` expects a String path".to_string());
    };
    let entries = match fs::read_dir(path) {
        Ok(entries) => entries,
        Err(e) => return Ok(err(Value::String(e.to_string()))),
    };
    let mut names = vec![];
    for entry in entries {
        match entry {
            Ok(entry) => names.push(Value::String(entry.file_name().to_string_lossy().into_owned())),
            Err(e) => return Ok(err(Value::String(e.to_string()))),
        }
    }
    Ok(ok(Value::Array(Rc::new(names))))
}
