//! Tree-walking evaluator (§4.4).
//!
//! Grounded on the teacher's `Interpreter` (`interpreter/mod.rs`): a struct walking the AST with
//! `run_statement`/`run_expression`/`run_binary_operation`/`run_fn_call` methods over a scope
//! stack. This evaluator keeps that method shape (`eval_*` in place of `run_*`) but replaces the
//! teacher's `Vec<HashMap<_>>` scope stack with the same parent-chained [`env::ValueEnv`] the type
//! checker uses, since closures here (unlike the teacher's, which has none) must capture a
//! specific ancestor scope rather than the top of a shared stack.

pub mod builtins;
pub mod env;
mod error;
pub mod value;

pub use error::RuntimeError;
pub use value::Value;

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::ast::{Expression, FunctionLiteral, Pattern, Program, Statement};
use crate::lexer::Token;

use env::{ValueEnv, ValueEnvHandle};
use value::{hash_key, Constructor, FunctionValue, RecordValue, SumInstanceValue};

pub struct Evaluator {
    source: Rc<str>,
}

impl Evaluator {
    pub fn new(source: Rc<str>) -> Self {
        Self { source }
    }

    pub fn err(&self, message: impl Into<String>, token: &Token) -> RuntimeError {
        RuntimeError::new(message, token, Some(self.source.clone()))
    }

    pub fn eval_program(&self, program: &Program, env: &ValueEnvHandle) -> Result<Value, RuntimeError> {
        let mut result = Value::Null;
        for stmt in &program.statements {
            result = self.eval_statement(stmt, env)?;
            if matches!(result, Value::Return(_)) {
                return Ok(result);
            }
        }
        Ok(result)
    }

    pub fn eval_statement(&self, stmt: &Statement, env: &ValueEnvHandle) -> Result<Value, RuntimeError> {
        match stmt {
            // Loading and exposure are handled by the module loader before these ever reach the
            // evaluator at module scope; nested occurrences (inside a block) are no-ops.
            Statement::Module { .. } | Statement::Use { .. } => Ok(Value::Null),
            Statement::Let { pattern, value, .. } => {
                let val = self.eval_expression(value, env)?;
                if matches!(val, Value::Return(_)) {
                    return Ok(val);
                }
                self.bind_pattern(pattern, val, env);
                Ok(Value::Null)
            }
            Statement::Return { value, token } => match value {
                Some(expr) => {
                    let v = self.eval_expression(expr, env)?;
                    Ok(Value::Return(Box::new(v.into_inner())))
                }
                None => {
                    let _ = token;
                    Ok(Value::Return(Box::new(Value::Null)))
                }
            },
            Statement::TypeDecl { name, variants, .. } => {
                for variant in variants {
                    env.borrow_mut().define_constructor(
                        variant.name.clone(),
                        Value::Constructor(Rc::new(Constructor::Variant {
                            sum_name: name.clone(),
                            variant_name: variant.name.clone(),
                        })),
                    );
                }
                Ok(Value::Null)
            }
            Statement::RecordDecl { name, fields, .. } => {
                env.borrow_mut().define_constructor(
                    name.clone(),
                    Value::Constructor(Rc::new(Constructor::Record {
                        name: name.clone(),
                        fields: fields.iter().map(|f| f.name.clone()).collect(),
                    })),
                );
                Ok(Value::Null)
            }
            Statement::TraitDecl { .. } => Ok(Value::Null),
            Statement::Impl { target, methods, .. } => {
                let base_name = base_type_name_from_node(target);
                for method in methods {
                    let Some(method_name) = &method.name else {
                        continue;
                    };
                    let func = Rc::new(FunctionValue {
                        name: Some(method_name.clone()),
                        params: method.params.iter().map(|(n, _)| n.clone()).collect(),
                        body: Rc::new((*method.body).clone()),
                        env: env.clone(),
                    });
                    env.borrow_mut().add_method(base_name.clone(), method_name.clone(), func);
                }
                Ok(Value::Null)
            }
            Statement::Expression { expression, .. } => self.eval_expression(expression, env),
        }
    }

    fn bind_pattern(&self, pattern: &Pattern, value: Value, env: &ValueEnvHandle) {
        match pattern {
            Pattern::Identifier { name, .. } => env.borrow_mut().define(name.clone(), value, false),
            Pattern::Wildcard { .. } => {}
            Pattern::Tuple { elements, .. } => {
                if let Value::Tuple(els) = value {
                    for (p, v) in elements.iter().zip(els.iter()) {
                        self.bind_pattern(p, v.clone(), env);
                    }
                }
            }
            Pattern::Array { elements, rest, .. } => {
                if let Value::Array(els) = value {
                    for (p, v) in elements.iter().zip(els.iter()) {
                        self.bind_pattern(p, v.clone(), env);
                    }
                    if let Some(rest_pat) = rest {
                        let remainder = els.get(elements.len()..).unwrap_or(&[]).to_vec();
                        self.bind_pattern(rest_pat, Value::Array(Rc::new(remainder)), env);
                    }
                }
            }
            Pattern::Variant { .. } | Pattern::Literal { .. } => {
                // The checker rejects these in `let` bindings; unreachable from a checked program.
            }
        }
    }

    pub fn eval_expression(&self, expr: &Expression, env: &ValueEnvHandle) -> Result<Value, RuntimeError> {
        match expr {
            Expression::Integer { value, .. } => Ok(Value::Integer(*value)),
            Expression::Double { value, .. } => Ok(Value::Double(*value)),
            Expression::Boolean { value, .. } => Ok(Value::Boolean(*value)),
            Expression::String { value, .. } => Ok(Value::String(value.clone())),
            Expression::Null { .. } => Ok(Value::Null),
            Expression::InterpolatedString { parts, .. } => {
                let mut out = String::new();
                for part in parts {
                    match part {
                        crate::ast::InterpolationPart::Literal(s) => out.push_str(s),
                        crate::ast::InterpolationPart::Expr(e) => {
                            let v = self.eval_expression(e, env)?;
                            out.push_str(&match v {
                                Value::String(s) => s,
                                other => other.to_string(),
                            });
                        }
                    }
                }
                Ok(Value::String(out))
            }
            Expression::Identifier { token, name } => env::resolve(env, name)
                .ok_or_else(|| self.err(format!("unknown identifier `{name}`"), token)),
            Expression::Array { elements, .. } => {
                let mut out = Vec::with_capacity(elements.len());
                for el in elements {
                    out.push(self.eval_expression(el, env)?);
                }
                Ok(Value::Array(Rc::new(out)))
            }
            Expression::Hash { pairs, .. } => {
                let mut map = HashMap::new();
                for (k, v) in pairs {
                    let kv = self.eval_expression(k, env)?;
                    let vv = self.eval_expression(v, env)?;
                    map.insert(hash_key(&kv), (kv, vv));
                }
                Ok(Value::Hash(Rc::new(RefCell::new(map))))
            }
            Expression::Tuple { elements, .. } => {
                let mut out = Vec::with_capacity(elements.len());
                for el in elements {
                    out.push(self.eval_expression(el, env)?);
                }
                Ok(Value::Tuple(Rc::new(out)))
            }
            Expression::Prefix { token, operator, right } => {
                let v = self.eval_expression(right, env)?;
                match (operator.as_str(), v) {
                    ("-", Value::Integer(n)) => Ok(Value::Integer(-n)),
                    ("-", Value::Double(n)) => Ok(Value::Double(-n)),
                    ("!", Value::Boolean(b)) => Ok(Value::Boolean(!b)),
                    (op, other) => Err(self.err(format!("`{op}` is not defined for `{}`", other.kind_name()), token)),
                }
            }
            Expression::Infix {
                token,
                operator,
                left,
                right,
            } => self.eval_infix(token, operator, left, right, env),
            Expression::Try { token, value } => {
                let v = self.eval_expression(value, env)?;
                match v {
                    Value::SumInstance(s) if s.type_name == "Result" && s.variant_name == "Ok" => {
                        Ok(s.values.first().cloned().unwrap_or(Value::Null))
                    }
                    Value::SumInstance(s) if s.type_name == "Result" && s.variant_name == "Err" => {
                        Ok(Value::Return(Box::new(Value::SumInstance(s))))
                    }
                    other => Err(self.err(format!("`?` used on a non-`Result` value `{other}`"), token)),
                }
            }
            Expression::Call {
                token,
                function,
                arguments,
            } => self.eval_call(token, function, arguments, env),
            Expression::Index { token, left, index } => {
                let left_val = self.eval_expression(left, env)?;
                let index_val = self.eval_expression(index, env)?;
                self.eval_index(token, left_val, index_val)
            }
            Expression::Member { token, left, property } => self.eval_member(token, left, property, env),
            Expression::Path { token, .. } => Err(self.err("path expressions are not produced by this parser", token)),
            Expression::If {
                condition,
                consequence,
                alternative,
                ..
            } => {
                let cond = self.eval_expression(condition, env)?;
                if cond.is_truthy() {
                    self.eval_expression(consequence, env)
                } else if let Some(alt) = alternative {
                    self.eval_expression(alt, env)
                } else {
                    Ok(Value::Null)
                }
            }
            Expression::Match { token, subjects, arms } => self.eval_match(token, subjects, arms, env),
            Expression::When {
                token,
                subject,
                arms,
                otherwise,
            } => self.eval_when(token, subject, arms, otherwise, env),
            Expression::Function(f) => Ok(self.eval_function_literal(f, env)),
            Expression::Block { statements, .. } => {
                let child = ValueEnv::child(env);
                let mut result = Value::Null;
                for stmt in statements {
                    result = self.eval_statement(stmt, &child)?;
                    if matches!(result, Value::Return(_)) {
                        return Ok(result);
                    }
                }
                Ok(result)
            }
        }
    }

    fn eval_infix(
        &self,
        token: &Token,
        operator: &str,
        left: &Expression,
        right: &Expression,
        env: &ValueEnvHandle,
    ) -> Result<Value, RuntimeError> {
        match operator {
            "=" | "+=" => {
                let mut value = self.eval_expression(right, env)?;
                if operator == "+=" {
                    let current = self.eval_assign_target_get(left, env)?;
                    value = self.numeric_add(token, &current, &value)?;
                }
                self.eval_assign_target_set(left, value.clone(), env, token)?;
                Ok(Value::Null)
            }
            "&&" => {
                let l = self.eval_expression(left, env)?;
                if !l.is_truthy() {
                    return Ok(Value::Boolean(false));
                }
                Ok(Value::Boolean(self.eval_expression(right, env)?.is_truthy()))
            }
            "||" => {
                let l = self.eval_expression(left, env)?;
                if l.is_truthy() {
                    return Ok(Value::Boolean(true));
                }
                Ok(Value::Boolean(self.eval_expression(right, env)?.is_truthy()))
            }
            "==" | "!=" => {
                let l = self.eval_expression(left, env)?;
                let r = self.eval_expression(right, env)?;
                let eq = values_equal(&l, &r);
                Ok(Value::Boolean(if operator == "==" { eq } else { !eq }))
            }
            "<" | ">" | "<=" | ">=" => {
                let l = self.eval_expression(left, env)?;
                let r = self.eval_expression(right, env)?;
                let ordering = compare_values(&l, &r).ok_or_else(|| {
                    self.err(format!("cannot compare `{}` and `{}`", l.kind_name(), r.kind_name()), token)
                })?;
                let result = match operator {
                    "<" => ordering.is_lt(),
                    ">" => ordering.is_gt(),
                    "<=" => ordering.is_le(),
                    _ => ordering.is_ge(),
                };
                Ok(Value::Boolean(result))
            }
            "%" => {
                let l = self.eval_expression(left, env)?;
                let r = self.eval_expression(right, env)?;
                match (l, r) {
                    (Value::Integer(_), Value::Integer(0)) => Err(self.err("division by zero in `%`", token)),
                    (Value::Integer(a), Value::Integer(b)) => Ok(Value::Integer(a % b)),
                    (l, r) => Err(self.err(format!("`%` is not defined for `{}` and `{}`", l.kind_name(), r.kind_name()), token)),
                }
            }
            "+" => {
                let l = self.eval_expression(left, env)?;
                let r = self.eval_expression(right, env)?;
                if let Value::String(s) = &l {
                    let rs = match &r {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    return Ok(Value::String(format!("{s}{rs}")));
                }
                self.numeric_add(token, &l, &r)
            }
            "-" | "*" | "/" => {
                let l = self.eval_expression(left, env)?;
                let r = self.eval_expression(right, env)?;
                self.numeric_binop(token, operator, &l, &r)
            }
            other => Err(self.err(format!("unknown operator `{other}`"), token)),
        }
    }

    fn numeric_add(&self, token: &Token, l: &Value, r: &Value) -> Result<Value, RuntimeError> {
        self.numeric_binop(token, "+", l, r)
    }

    fn numeric_binop(&self, token: &Token, operator: &str, l: &Value, r: &Value) -> Result<Value, RuntimeError> {
        match (l, r) {
            (Value::Integer(a), Value::Integer(b)) => match operator {
                "+" => Ok(Value::Integer(a + b)),
                "-" => Ok(Value::Integer(a - b)),
                "*" => Ok(Value::Integer(a * b)),
                "/" => {
                    if *b == 0 {
                        Err(self.err("division by zero", token))
                    } else {
                        Ok(Value::Integer(a / b))
                    }
                }
                _ => unreachable!(),
            },
            (a, b) if a.is_numeric() && b.is_numeric() => {
                let af = as_f64(a);
                let bf = as_f64(b);
                match operator {
                    "+" => Ok(Value::Double(af + bf)),
                    "-" => Ok(Value::Double(af - bf)),
                    "*" => Ok(Value::Double(af * bf)),
                    "/" => {
                        if bf == 0.0 {
                            Err(self.err("division by zero", token))
                        } else {
                            Ok(Value::Double(af / bf))
                        }
                    }
                    _ => unreachable!(),
                }
            }
            (a, b) => Err(self.err(
                format!("`{operator}` requires numeric operands, found `{}` and `{}`", a.kind_name(), b.kind_name()),
                token,
            )),
        }
    }

    fn eval_assign_target_get(&self, target: &Expression, env: &ValueEnvHandle) -> Result<Value, RuntimeError> {
        self.eval_expression(target, env)
    }

    fn eval_assign_target_set(
        &self,
        target: &Expression,
        value: Value,
        env: &ValueEnvHandle,
        token: &Token,
    ) -> Result<(), RuntimeError> {
        match target {
            Expression::Identifier { name, .. } => {
                env::assign(env, name, value).map_err(|m| self.err(m, token))
            }
            Expression::Index { left, index, .. } => {
                let left_val = self.eval_expression(left, env)?;
                let index_val = self.eval_expression(index, env)?;
                match left_val {
                    Value::Hash(map) => {
                        map.borrow_mut().insert(hash_key(&index_val), (index_val, value));
                        Ok(())
                    }
                    other => Err(self.err(format!("cannot assign into `{}`", other.kind_name()), token)),
                }
            }
            Expression::Member { left, property, .. } => {
                let left_val = self.eval_expression(left, env)?;
                match left_val {
                    Value::Record(r) => {
                        let mut r = r.borrow_mut();
                        match r.fields.iter_mut().find(|(name, _)| name == property) {
                            Some((_, slot)) => {
                                *slot = value;
                                Ok(())
                            }
                            None => Err(self.err(format!("`{}` has no field `{property}`", r.name), token)),
                        }
                    }
                    Value::Hash(map) => {
                        let key = Value::String(property.to_string());
                        map.borrow_mut().insert(hash_key(&key), (key, value));
                        Ok(())
                    }
                    other => Err(self.err(format!("cannot assign into `{}`", other.kind_name()), token)),
                }
            }
            _ => Err(self.err("assignment target must be a mutable identifier, hash index, or field access", token)),
        }
    }

    fn eval_index(&self, token: &Token, left: Value, index: Value) -> Result<Value, RuntimeError> {
        match left {
            Value::Array(els) => {
                let Value::Integer(i) = index else {
                    return Err(self.err("array index must be an integer", token));
                };
                usize::try_from(i)
                    .ok()
                    .and_then(|i| els.get(i).cloned())
                    .ok_or_else(|| self.err(format!("array index {i} out of bounds"), token))
            }
            Value::Tuple(els) => {
                let Value::Integer(i) = index else {
                    return Err(self.err("tuple index must be an integer", token));
                };
                usize::try_from(i)
                    .ok()
                    .and_then(|i| els.get(i).cloned())
                    .ok_or_else(|| self.err(format!("tuple index {i} out of bounds"), token))
            }
            Value::Hash(map) => map
                .borrow()
                .get(&hash_key(&index))
                .map(|(_, v)| v.clone())
                .ok_or_else(|| self.err(format!("hash has no key `{index}`"), token)),
            other => Err(self.err(format!("cannot index into `{}`", other.kind_name()), token)),
        }
    }

    fn eval_member(&self, token: &Token, left: &Expression, property: &str, env: &ValueEnvHandle) -> Result<Value, RuntimeError> {
        let left_val = self.eval_expression(left, env)?;
        match &left_val {
            Value::Record(r) => {
                let r = r.borrow();
                r.fields
                    .iter()
                    .find(|(name, _)| name == property)
                    .map(|(_, v)| v.clone())
                    .ok_or_else(|| self.err(format!("`{}` has no field `{property}`", r.name), token))
            }
            Value::Hash(map) => map
                .borrow()
                .get(&hash_key(&Value::String(property.to_string())))
                .map(|(_, v)| v.clone())
                .ok_or_else(|| self.err(format!("hash has no key `{property}`"), token)),
            Value::Module { name, env: mod_env } => {
                if !mod_env.borrow().is_exposed(property) {
                    return Err(self.err(format!("`{property}` is not exposed by module `{name}`"), token));
                }
                env::resolve(mod_env, property)
                    .ok_or_else(|| self.err(format!("module `{name}` has no member `{property}`"), token))
            }
            other => {
                let base = base_type_name_of_value(other);
                let methods = env::methods_for(env, &base);
                match methods.get(property) {
                    Some(func) => Ok(bind_self(func, other.clone())),
                    None => Err(self.err(format!("`{base}` has no member `{property}`"), token)),
                }
            }
        }
    }

    fn eval_match(
        &self,
        token: &Token,
        subjects: &[Expression],
        arms: &[crate::ast::MatchArm],
        env: &ValueEnvHandle,
    ) -> Result<Value, RuntimeError> {
        let subject_vals = subjects
            .iter()
            .map(|s| self.eval_expression(s, env))
            .collect::<Result<Vec<_>, _>>()?;

        for arm in arms {
            let child = ValueEnv::child(env);
            let mut matched = true;
            for (pattern, val) in arm.patterns.iter().zip(subject_vals.iter()) {
                if !self.try_match(pattern, val.clone(), &child)? {
                    matched = false;
                    break;
                }
            }
            if matched {
                return self.eval_expression(&arm.body, &child);
            }
        }
        Err(self.err("no match arm matched (non-exhaustive match reached at runtime)", token))
    }

    fn try_match(&self, pattern: &Pattern, value: Value, env: &ValueEnvHandle) -> Result<bool, RuntimeError> {
        match pattern {
            Pattern::Identifier { name, .. } => {
                env.borrow_mut().define(name.clone(), value, false);
                Ok(true)
            }
            Pattern::Wildcard { .. } => Ok(true),
            Pattern::Literal { value: lit, .. } => {
                let lit_val = self.eval_expression(lit, env)?;
                Ok(values_equal(&lit_val, &value))
            }
            Pattern::Variant { name, bindings, .. } => match value {
                Value::SumInstance(s) if &s.variant_name == name => {
                    for (b, v) in bindings.iter().zip(s.values.iter()) {
                        if !self.try_match(b, v.clone(), env)? {
                            return Ok(false);
                        }
                    }
                    Ok(true)
                }
                _ => Ok(false),
            },
            Pattern::Array { elements, rest, .. } => match value {
                Value::Array(els) if els.len() >= elements.len() => {
                    for (p, v) in elements.iter().zip(els.iter()) {
                        if !self.try_match(p, v.clone(), env)? {
                            return Ok(false);
                        }
                    }
                    match rest {
                        Some(rest_pat) => {
                            let remainder = els[elements.len()..].to_vec();
                            self.try_match(rest_pat, Value::Array(Rc::new(remainder)), env)
                        }
                        None => Ok(els.len() == elements.len()),
                    }
                }
                _ => Ok(false),
            },
            Pattern::Tuple { elements, .. } => match value {
                Value::Tuple(els) if els.len() == elements.len() => {
                    for (p, v) in elements.iter().zip(els.iter()) {
                        if !self.try_match(p, v.clone(), env)? {
                            return Ok(false);
                        }
                    }
                    Ok(true)
                }
                _ => Ok(false),
            },
        }
    }

    fn eval_when(
        &self,
        _token: &Token,
        subject: &Option<Box<Expression>>,
        arms: &[crate::ast::WhenArm],
        otherwise: &Expression,
        env: &ValueEnvHandle,
    ) -> Result<Value, RuntimeError> {
        let subject_val = match subject {
            Some(s) => Some(self.eval_expression(s, env)?),
            None => None,
        };

        for arm in arms {
            for pattern_expr in &arm.patterns {
                let pv = self.eval_expression(pattern_expr, env)?;
                // A subject-less `when` is always a chain of predicates. With a subject, a
                // `Boolean` pattern is a predicate unless the subject is itself a `Boolean`
                // (in which case it reads as an equality check, matching the checker's
                // equality-first, predicate-fallback rule in `check_when`).
                let matches = match &subject_val {
                    Some(sv @ Value::Boolean(_)) => values_equal(sv, &pv),
                    Some(sv) => match &pv {
                        Value::Boolean(b) => *b,
                        _ => values_equal(sv, &pv),
                    },
                    None => pv.is_truthy(),
                };
                if matches {
                    return self.eval_expression(&arm.body, env);
                }
            }
        }
        self.eval_expression(otherwise, env)
    }

    fn eval_function_literal(&self, f: &FunctionLiteral, env: &ValueEnvHandle) -> Value {
        let closure_env = if f.name.is_some() { ValueEnv::child(env) } else { env.clone() };
        let func = Rc::new(FunctionValue {
            name: f.name.clone(),
            params: f.params.iter().map(|(n, _)| n.clone()).collect(),
            body: Rc::new((*f.body).clone()),
            env: closure_env.clone(),
        });
        if let Some(name) = &f.name {
            closure_env.borrow_mut().define(name.clone(), Value::Function(func.clone()), false);
        }
        Value::Function(func)
    }

    fn eval_call(
        &self,
        token: &Token,
        function: &Expression,
        arguments: &[Expression],
        env: &ValueEnvHandle,
    ) -> Result<Value, RuntimeError> {
        if let Expression::Identifier { name, .. } = function {
            if builtins::is_builtin(name) && env::resolve_constructor(env, name).is_none() {
                let args = arguments
                    .iter()
                    .map(|a| self.eval_expression(a, env))
                    .collect::<Result<Vec<_>, _>>()?;
                return builtins::call(self, name, &args, token);
            }
        }

        let func_val = self.eval_expression(function, env)?;
        let args = arguments
            .iter()
            .map(|a| self.eval_expression(a, env))
            .collect::<Result<Vec<_>, _>>()?;
        self.call_value(&func_val, args, token)
    }

    /// Invokes anything callable at runtime: a closure, a builtin, or a variant/record
    /// constructor (§4.4 "calling a value built by a `type`/`record` declaration constructs an
    /// instance instead of invoking a function body"). Shared between direct calls and the
    /// higher-order builtins (`map`, `filter`, `reduce`) that call back into a user-supplied
    /// function value.
    pub fn call_value(&self, func: &Value, args: Vec<Value>, token: &Token) -> Result<Value, RuntimeError> {
        match func {
            Value::Function(f) => {
                if f.params.len() != args.len() {
                    return Err(self.err(
                        format!("expected {} argument(s), found {}", f.params.len(), args.len()),
                        token,
                    ));
                }
                let call_env = ValueEnv::child(&f.env);
                for (pname, arg) in f.params.iter().zip(args.into_iter()) {
                    call_env.borrow_mut().define(pname.clone(), arg, false);
                }
                Ok(self.eval_expression(&f.body, &call_env)?.into_inner())
            }
            Value::Builtin(b) => (b.func)(&args).map_err(|m| self.err(m, token)),
            Value::Constructor(c) => Ok(build_constructor_value(c, args)),
            other => Err(self.err(format!("cannot call a value of kind `{}`", other.kind_name()), token)),
        }
    }
}

fn build_constructor_value(c: &Rc<Constructor>, args: Vec<Value>) -> Value {
    match c.as_ref() {
        Constructor::Variant { sum_name, variant_name } => Value::SumInstance(Rc::new(SumInstanceValue {
            type_name: sum_name.clone(),
            variant_name: variant_name.clone(),
            values: args,
        })),
        Constructor::Record { name, fields } => Value::Record(Rc::new(RefCell::new(RecordValue {
            name: name.clone(),
            fields: fields.iter().cloned().zip(args).collect(),
        }))),
    }
}

/// Binds a method's first parameter (conventionally `self`) to the receiver, returning a new
/// closure over the remaining parameters — the runtime counterpart of the checker's
/// `check_member` stripping `self` from a dispatched method's signature.
fn bind_self(func: &Rc<FunctionValue>, receiver: Value) -> Value {
    let child = ValueEnv::child(&func.env);
    let params = if let Some(self_name) = func.params.first() {
        child.borrow_mut().define(self_name.clone(), receiver, false);
        func.params[1..].to_vec()
    } else {
        func.params.clone()
    };
    Value::Function(Rc::new(FunctionValue {
        name: func.name.clone(),
        params,
        body: func.body.clone(),
        env: child,
    }))
}

fn base_type_name_from_node(node: &crate::ast::TypeNode) -> String {
    match node {
        crate::ast::TypeNode::Named { name, .. } => name.clone(),
        crate::ast::TypeNode::Path { segments, .. } => segments.last().cloned().unwrap_or_default(),
        crate::ast::TypeNode::Function { .. } => "Function".to_string(),
        crate::ast::TypeNode::Tuple { .. } => "Tuple".to_string(),
    }
}

fn base_type_name_of_value(value: &Value) -> String {
    match value {
        Value::Record(r) => r.borrow().name.clone(),
        Value::SumInstance(s) => s.type_name.clone(),
        Value::Hash(_) => "Hash".to_string(),
        other => other.kind_name().to_string(),
    }
}

fn as_f64(value: &Value) -> f64 {
    match value {
        Value::Integer(n) => *n as f64,
        Value::Double(n) => *n,
        _ => 0.0,
    }
}

trait Numeric {
    fn is_numeric(&self) -> bool;
}

impl Numeric for Value {
    fn is_numeric(&self) -> bool {
        matches!(self, Value::Integer(_) | Value::Double(_))
    }
}

/// Structural value equality (§4.4 "`==` widens `Integer`/`Double` the same way arithmetic
/// does"); compound values compare element-wise, constructors and closures never compare equal.
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Integer(x), Value::Integer(y)) => x == y,
        (Value::Double(x), Value::Double(y)) => x == y,
        (Value::Integer(x), Value::Double(y)) | (Value::Double(y), Value::Integer(x)) => *x as f64 == *y,
        (Value::Boolean(x), Value::Boolean(y)) => x == y,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Null, Value::Null) => true,
        (Value::Array(x), Value::Array(y)) => x.len() == y.len() && x.iter().zip(y.iter()).all(|(a, b)| values_equal(a, b)),
        (Value::Tuple(x), Value::Tuple(y)) => x.len() == y.len() && x.iter().zip(y.iter()).all(|(a, b)| values_equal(a, b)),
        (Value::Record(x), Value::Record(y)) => {
            let x = x.borrow();
            let y = y.borrow();
            x.name == y.name
                && x.fields.len() == y.fields.len()
                && x.fields.iter().zip(y.fields.iter()).all(|((n1, v1), (n2, v2))| n1 == n2 && values_equal(v1, v2))
        }
        (Value::SumInstance(x), Value::SumInstance(y)) => {
            x.type_name == y.type_name
                && x.variant_name == y.variant_name
                && x.values.len() == y.values.len()
                && x.values.iter().zip(y.values.iter()).all(|(a, b)| values_equal(a, b))
        }
        _ => false,
    }
}

fn compare_values(a: &Value, b: &Value) -> Option<std::cmp::Ordering> {
    match (a, b) {
        (Value::Integer(x), Value::Integer(y)) => x.partial_cmp(y),
        (Value::String(x), Value::String(y)) => x.partial_cmp(y),
        (a, b) if a.is_numeric() && b.is_numeric() => as_f64(a).partial_cmp(&as_f64(b)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser::parse;

    fn run(source: &str) -> Value {
        let tokens = Lexer::new(source).lex();
        let program = parse(tokens, source).expect("parse");
        let evaluator = Evaluator::new(Rc::from(source));
        let env = ValueEnv::root();
        evaluator.eval_program(&program, &env).expect("eval")
    }

    #[test]
    fn evaluates_arithmetic_with_widening() {
        let result = run("1 + 2 * 3.0;");
        assert!(matches!(result, Value::Double(n) if (n - 7.0).abs() < f64::EPSILON));
    }

    #[test]
    fn higher_order_closure_captures_outer_binding() {
        let result = run(
            r#"
            let n = 10;
            let addN = (x) => x + n;
            addN(5);
            "#,
        );
        assert!(matches!(result, Value::Integer(15)));
    }

    #[test]
    fn mutable_identifier_reassignment_updates_declaring_frame() {
        let result = run(
            r#"
            let mut counter = 0;
            let bump = () => { counter = counter + 1; };
            bump();
            bump();
            counter;
            "#,
        );
        assert!(matches!(result, Value::Integer(2)));
    }

    #[test]
    fn sum_type_pattern_match_binds_variant_payload() {
        let result = run(
            r#"
            type Shape = Circle(Double) | Square(Double);
            let area = (s) => match (s) {
                | Circle(r) => 3.14 * r * r,
                | Square(side) => side * side,
            };
            area(Square(4.0));
            "#,
        );
        assert!(matches!(result, Value::Double(n) if (n - 16.0).abs() < f64::EPSILON));
    }

    #[test]
    fn pipe_chains_calls_left_to_right() {
        let result = run(
            r#"
            let double = (x) => x * 2;
            let addOne = (x) => x + 1;
            5 |> double |> addOne;
            "#,
        );
        assert!(matches!(result, Value::Integer(11)));
    }

    #[test]
    fn when_with_subject_evaluates_boolean_predicate_arms() {
        let result = run(
            r#"
            let n = 5;
            when (n) { | n > 0 => "pos", | n < 0 => "neg", else => "zero" };
            "#,
        );
        match result {
            Value::String(s) => assert_eq!(s, "pos"),
            other => panic!("expected a String, got {other:?}"),
        }
    }

    #[test]
    fn when_with_subject_evaluates_equality_arms() {
        let result = run(
            r#"
            let n = 5;
            when (n) { | 5 => "five", else => "other" };
            "#,
        );
        match result {
            Value::String(s) => assert_eq!(s, "five"),
            other => panic!("expected a String, got {other:?}"),
        }
    }

    #[test]
    fn when_without_subject_falls_through_to_else() {
        let result = run(r#"when { | false => "no", else => "fallback" };"#);
        match result {
            Value::String(s) => assert_eq!(s, "fallback"),
            other => panic!("expected a String, got {other:?}"),
        }
    }
}
