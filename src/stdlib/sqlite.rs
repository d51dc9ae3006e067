//! SQLite adapter over `rusqlite` (§4.6): `open`, `exec`, `query`.
//!
//! The closed runtime [`Value`] set (§3) has no "opaque handle" variant, so an open connection is
//! kept out of the language entirely: `open` stores the [`rusqlite::Connection`] in a
//! process-local table and hands the caller back the Integer key, the same trick an untyped
//! embedding would use to expose a file descriptor. The core never inspects this Integer beyond
//! passing it straight back into `exec`/`query`.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use rusqlite::types::ValueRef;
use rusqlite::Connection;

use crate::evaluator::value::{hash_key, Value};
use crate::types::{FunctionSignature, Type};

use super::{as_string, err, native_fn, ok, result_of, NativeModule};

thread_local! {
    static CONNECTIONS: RefCell<HashMap<i64, Connection>> = RefCell::new(HashMap::new());
    static NEXT_HANDLE: RefCell<i64> = const { RefCell::new(1) };
}

fn row_type() -> Type {
    Type::Hash(Box::new(Type::String), Box::new(Type::Any))
}

pub fn module() -> NativeModule {
    NativeModule {
        name: "sqlite",
        types: vec![
            (
                "open".to_string(),
                Type::Function(FunctionSignature {
                    params: vec![Type::String],
                    return_type: Box::new(result_of(Type::Integer, Type::String)),
                    type_params: vec![],
                }),
            ),
            (
                "exec".to_string(),
                Type::Function(FunctionSignature {
                    params: vec![Type::Integer, Type::String],
                    return_type: Box::new(result_of(Type::Null, Type::String)),
                    type_params: vec![],
                }),
            ),
            (
                "query".to_string(),
                Type::Function(FunctionSignature {
                    params: vec![Type::Integer, Type::String],
                    return_type: Box::new(result_of(Type::Array(Box::new(row_type())), Type::String)),
                    type_params: vec![],
                }),
            ),
        ],
        values: vec![
            ("open".to_string(), native_fn("sqlite.open", open)),
            ("exec".to_string(), native_fn("sqlite.exec", exec)),
            ("query".to_string(), native_fn("sqlite.query", query)),
        ],
    }
}

fn as_handle(value: &Value) -> Result<i64, String> {
    match value {
        Value::Integer(n) => Ok(*n),
        other => Err(format!("expected a sqlite connection handle (Integer), found `{}`", other.kind_name())),
    }
}

fn open(args: &[Value]) -> Result<Value, String> {
    let path = as_string(&args[0])?;
    let conn = if path == ":memory:" {
        Connection::open_in_memory()
    } else {
        Connection::open(&path)
    };
    match conn {
        Ok(conn) => {
            let handle = NEXT_HANDLE.with(|n| {
                let mut n = n.borrow_mut();
                let id = *n;
                *n += 1;
                id
            });
            CONNECTIONS.with(|c| c.borrow_mut().insert(handle, conn));
            Ok(ok(Value::Integer(handle)))
        }
        Err(e) => Ok(err(Value::String(e.to_string()))),
    }
}

fn exec(args: &[Value]) -> Result<Value, String> {
    let handle = as_handle(&args[0])?;
    let sql = as_string(&args[1])?;
    CONNECTIONS.with(|c| {
        let conns = c.borrow();
        let Some(conn) = conns.get(&handle) else {
            return Err(format!("no open sqlite connection for handle {handle}"));
        };
        match conn.execute_batch(&sql) {
            Ok(()) => Ok(ok(Value::Null)),
            Err(e) => Ok(err(Value::String(e.to_string()))),
        }
    })
}

fn query(args: &[Value]) -> Result<Value, String> {
    let handle = as_handle(&args[0])?;
    let sql = as_string(&args[1])?;
    CONNECTIONS.with(|c| {
        let conns = c.borrow();
        let Some(conn) = conns.get(&handle) else {
            return Err(format!("no open sqlite connection for handle {handle}"));
        };
        let mut stmt = match conn.prepare(&sql) {
            Ok(stmt) => stmt,
            Err(e) => return Ok(err(Value::String(e.to_string()))),
        };
        let column_names: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();
        let rows = stmt.query_map([], |row| {
            let mut fields = HashMap::new();
            for (i, name) in column_names.iter().enumerate() {
                let value = sql_value_to_lumen(row.get_ref(i)?);
                let key = Value::String(name.clone());
                fields.insert(hash_key(&key), (key, value));
            }
            Ok(Value::Hash(Rc::new(RefCell::new(fields))))
        });
        let rows = match rows {
            Ok(rows) => rows,
            Err(e) => return Ok(err(Value::String(e.to_string()))),
        };
        let mut out = Vec::new();
        for row in rows {
            match row {
                Ok(v) => out.push(v),
                Err(e) => return Ok(err(Value::String(e.to_string()))),
            }
        }
        Ok(ok(Value::Array(Rc::new(out))))
    })
}

fn sql_value_to_lumen(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(n) => Value::Integer(n),
        ValueRef::Real(f) => Value::Double(f),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::String(String::from_utf8_lossy(b).into_owned()),
    }
}
