//! Constraint/substitution-based type checker (§4.3).
//!
//! Grounded on the teacher's `Typechecker` (`typechecker/mod.rs`): a struct walking the AST with
//! `check_statement`/`check_expression` methods and scope push/pop. The teacher's checker threads
//! a phantom `<TypeInfo>` parameter through a typed-AST rewrite; this checker instead returns a
//! plain [`Type`] per node (the spec's AST has no typed-AST variant), matching the teacher's
//! recursive-descent shape without the phantom-type machinery.

pub mod env;
mod error;

pub use error::TypeError;

use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::ast::{Expression, FunctionLiteral, Pattern, Program, Statement, TypeNode};
use crate::types::{
    self, substitute, unify, FunctionSignature, RecordType, Substitution, SumType, TraitType, Type,
    VariantType,
};

use env::TypeEnvHandle;

pub struct Checker {
    source: Rc<str>,
    fresh_counter: Cell<usize>,
}

impl Checker {
    pub fn new(source: Rc<str>) -> Self {
        Self {
            source,
            fresh_counter: Cell::new(0),
        }
    }

    fn err(&self, message: impl Into<String>, token: &crate::lexer::Token) -> TypeError {
        TypeError::new(message, token, Some(self.source.clone()))
    }

    fn fresh_var(&self) -> Type {
        let n = self.fresh_counter.get();
        self.fresh_counter.set(n + 1);
        Type::TypeVariable {
            name: format!("?T{n}"),
            bounds: vec![],
        }
    }

    fn unify(&self, a: &Type, b: &Type, token: &crate::lexer::Token) -> Result<Substitution, TypeError> {
        let mut subst = Substitution::new();
        unify(a, b, &mut subst).map_err(|msg| self.err(msg, token))?;
        Ok(subst)
    }

    pub fn check_program(&self, program: &Program, env: &TypeEnvHandle) -> Result<(), TypeError> {
        for stmt in &program.statements {
            self.check_statement(stmt, env)?;
        }
        Ok(())
    }

    pub fn check_statement(&self, stmt: &Statement, env: &TypeEnvHandle) -> Result<Type, TypeError> {
        match stmt {
            Statement::Module { .. } => Ok(Type::Null),
            Statement::Use { .. } => Ok(Type::Null),
            Statement::Let {
                token,
                mutable,
                pattern,
                type_annotation,
                value,
            } => {
                let expected = match type_annotation {
                    Some(tn) => Some(self.resolve_type_node(tn, env)?),
                    None => None,
                };
                let value_type = self.check_expression(value, env, expected.as_ref())?;
                if let Some(expected) = &expected {
                    self.unify(expected, &value_type, token)?;
                }
                self.bind_pattern(pattern, &value_type, *mutable, env)?;
                Ok(Type::Null)
            }
            Statement::Return { value, .. } => match value {
                Some(expr) => self.check_expression(expr, env, None),
                None => Ok(Type::Null),
            },
            Statement::TypeDecl {
                name,
                type_params,
                variants,
                ..
            } => {
                self.check_type_decl(name, type_params, variants, env)?;
                Ok(Type::Null)
            }
            Statement::RecordDecl {
                name,
                type_params,
                fields,
                ..
            } => {
                self.check_record_decl(name, type_params, fields, env)?;
                Ok(Type::Null)
            }
            Statement::TraitDecl {
                name,
                type_params,
                methods,
                ..
            } => {
                self.check_trait_decl(name, type_params, methods, env)?;
                Ok(Type::Null)
            }
            Statement::Impl {
                token,
                type_params,
                trait_name,
                target,
                methods,
            } => {
                self.check_impl_decl(token, type_params, trait_name, target, methods, env)?;
                Ok(Type::Null)
            }
            Statement::Expression { expression, .. } => self.check_expression(expression, env, None),
        }
    }

    fn bind_pattern(
        &self,
        pattern: &Pattern,
        ty: &Type,
        mutable: bool,
        env: &TypeEnvHandle,
    ) -> Result<(), TypeError> {
        match pattern {
            Pattern::Identifier { name, .. } => {
                env.borrow_mut().define(name.clone(), ty.clone(), mutable);
                Ok(())
            }
            Pattern::Wildcard { .. } => Ok(()),
            Pattern::Tuple { token, elements, .. } => match ty {
                Type::Tuple(types) if types.len() == elements.len() => {
                    for (p, t) in elements.iter().zip(types.iter()) {
                        self.bind_pattern(p, t, mutable, env)?;
                    }
                    Ok(())
                }
                _ => Err(self.err(format!("cannot destructure `{ty}` as a tuple"), token)),
            },
            Pattern::Array {
                token,
                elements,
                rest,
            } => match ty {
                Type::Array(el_ty) => {
                    for p in elements {
                        self.bind_pattern(p, el_ty, mutable, env)?;
                    }
                    if let Some(rest_pat) = rest {
                        self.bind_pattern(rest_pat, ty, mutable, env)?;
                    }
                    Ok(())
                }
                _ => Err(self.err(format!("cannot destructure `{ty}` as an array"), token)),
            },
            Pattern::Variant { token, .. } | Pattern::Literal { token, .. } => Err(self.err(
                "variant and literal patterns are not allowed in `let` bindings",
                token,
            )),
        }
    }

    // ---- declarations ----

    fn check_type_decl(
        &self,
        name: &str,
        type_params: &[String],
        variants: &[crate::ast::VariantDecl],
        env: &TypeEnvHandle,
    ) -> Result<(), TypeError> {
        let mut variant_types = HashMap::new();
        for v in variants {
            let params = v
                .params
                .iter()
                .map(|p| self.resolve_type_node(p, env))
                .collect::<Result<Vec<_>, _>>()?;
            variant_types.insert(
                v.name.clone(),
                Rc::new(VariantType {
                    name: v.name.clone(),
                    params,
                    parent: name.to_string(),
                }),
            );
        }
        let sum = Rc::new(SumType {
            name: name.to_string(),
            variants: variant_types.clone(),
            type_params: type_params.to_vec(),
            type_args: type_params
                .iter()
                .map(|p| Type::TypeVariable {
                    name: p.clone(),
                    bounds: vec![],
                })
                .collect(),
        });

        for (vname, vty) in &variant_types {
            let ctor_type = Type::Function(FunctionSignature {
                params: vty.params.clone(),
                return_type: Box::new(Type::Sum(sum.clone())),
                type_params: type_params.to_vec(),
            });
            env.borrow_mut().define_constructor(vname.clone(), ctor_type.clone());
            env.borrow_mut().define(vname.clone(), ctor_type, false);
        }
        env.borrow_mut().define(name.to_string(), Type::Sum(sum), false);
        Ok(())
    }

    fn check_record_decl(
        &self,
        name: &str,
        type_params: &[String],
        fields: &[crate::ast::FieldDecl],
        env: &TypeEnvHandle,
    ) -> Result<(), TypeError> {
        let mut field_types = vec![];
        for f in fields {
            field_types.push((f.name.clone(), self.resolve_type_node(&f.type_annotation, env)?));
        }
        let record = Rc::new(RecordType {
            name: name.to_string(),
            fields: field_types.clone(),
            type_params: type_params.to_vec(),
            type_args: type_params
                .iter()
                .map(|p| Type::TypeVariable {
                    name: p.clone(),
                    bounds: vec![],
                })
                .collect(),
        });
        let ctor_type = Type::Function(FunctionSignature {
            params: field_types.into_iter().map(|(_, t)| t).collect(),
            return_type: Box::new(Type::Record(record.clone())),
            type_params: type_params.to_vec(),
        });
        env.borrow_mut().define_constructor(name.to_string(), ctor_type.clone());
        env.borrow_mut().define(name.to_string(), ctor_type, false);
        Ok(())
    }

    fn check_trait_decl(
        &self,
        name: &str,
        type_params: &[String],
        methods: &[crate::ast::MethodSignature],
        env: &TypeEnvHandle,
    ) -> Result<(), TypeError> {
        let mut sigs = HashMap::new();
        for m in methods {
            let mut params = vec![];
            for (pname, ann) in &m.params {
                let ty = match ann {
                    Some(tn) => self.resolve_type_node(tn, env)?,
                    None if pname == "self" => Type::TypeVariable {
                        name: "Self".to_string(),
                        bounds: vec![name.to_string()],
                    },
                    None => Type::Any,
                };
                params.push(ty);
            }
            let return_type = match &m.return_type {
                Some(tn) => self.resolve_type_node(tn, env)?,
                None => Type::Null,
            };
            sigs.insert(
                m.name.clone(),
                FunctionSignature {
                    params,
                    return_type: Box::new(return_type),
                    type_params: type_params.to_vec(),
                },
            );
        }
        let trait_ty = Rc::new(TraitType {
            name: name.to_string(),
            methods: sigs,
            type_params: type_params.to_vec(),
            type_args: vec![],
        });
        env.borrow_mut().define(name.to_string(), Type::Trait(trait_ty), false);
        Ok(())
    }

    fn check_impl_decl(
        &self,
        token: &crate::lexer::Token,
        type_params: &[String],
        trait_name: &str,
        target: &TypeNode,
        methods: &[FunctionLiteral],
        env: &TypeEnvHandle,
    ) -> Result<(), TypeError> {
        let target_type = self.resolve_type_node(target, env)?;
        let base_name = base_type_name(&target_type);

        let trait_ty = match env::resolve(env, trait_name) {
            Some(Type::Trait(t)) => t,
            _ => return Err(self.err(format!("unknown trait `{trait_name}`"), token)),
        };

        for (mname, sig) in &trait_ty.methods {
            let Some(method_lit) = methods.iter().find(|m| m.name.as_deref() == Some(mname)) else {
                return Err(self.err(
                    format!("impl of `{trait_name}` for `{base_name}` is missing method `{mname}`"),
                    token,
                ));
            };
            let impl_env = env::TypeEnv::child(env);
            let mut subst = Substitution::new();
            subst.bind("Self", target_type.clone());
            let expected_sig = FunctionSignature {
                params: sig
                    .params
                    .iter()
                    .map(|p| substitute(p, &subst))
                    .collect(),
                return_type: Box::new(substitute(&sig.return_type, &subst)),
                type_params: sig.type_params.clone(),
            };
            let actual = self.check_function_literal(method_lit, &impl_env, Some(&Type::Function(expected_sig)))?;
            let Type::Function(_) = actual else {
                return Err(self.err(format!("`{mname}` must be a function"), token));
            };
        }

        let impl_node = Rc::new(Statement::Impl {
            token: token.clone(),
            type_params: type_params.to_vec(),
            trait_name: trait_name.to_string(),
            target: target.clone(),
            methods: methods.to_vec(),
        });
        env.borrow_mut().add_impl(base_name, (impl_node, env.clone()));
        Ok(())
    }

    // ---- expressions ----

    pub fn check_expression(
        &self,
        expr: &Expression,
        env: &TypeEnvHandle,
        expected: Option<&Type>,
    ) -> Result<Type, TypeError> {
        match expr {
            Expression::Integer { .. } => Ok(Type::Integer),
            Expression::Double { .. } => Ok(Type::Double),
            Expression::Boolean { .. } => Ok(Type::Boolean),
            Expression::String { .. } => Ok(Type::String),
            Expression::Null { .. } => Ok(Type::Null),
            Expression::InterpolatedString { parts, .. } => {
                for part in parts {
                    if let crate::ast::InterpolationPart::Expr(e) = part {
                        self.check_expression(e, env, None)?;
                    }
                }
                Ok(Type::String)
            }
            Expression::Identifier { token, name } => match env::resolve(env, name) {
                Some(ty) => Ok(ty),
                None => Err(self.err(format!("unknown identifier `{name}`"), token)),
            },
            Expression::Array { token, elements } => {
                if elements.is_empty() {
                    return match expected {
                        Some(Type::Array(_)) => Ok(expected.unwrap().clone()),
                        _ => Err(self.err("empty array literal requires an expected type", token)),
                    };
                }
                let el_expected = match expected {
                    Some(Type::Array(el)) => Some((**el).clone()),
                    _ => None,
                };
                let first = self.check_expression(&elements[0], env, el_expected.as_ref())?;
                for el in &elements[1..] {
                    let t = self.check_expression(el, env, Some(&first))?;
                    self.unify(&first, &t, token)?;
                }
                Ok(Type::Array(Box::new(first)))
            }
            Expression::Hash { token, pairs } => {
                if pairs.is_empty() {
                    return match expected {
                        Some(Type::Hash(_, _)) => Ok(expected.unwrap().clone()),
                        _ => Err(self.err("empty hash literal requires an expected type", token)),
                    };
                }
                let (k0, v0) = &pairs[0];
                let key_ty = self.check_expression(k0, env, None)?;
                let val_ty = self.check_expression(v0, env, None)?;
                for (k, v) in &pairs[1..] {
                    let kt = self.check_expression(k, env, Some(&key_ty))?;
                    self.unify(&key_ty, &kt, token)?;
                    let vt = self.check_expression(v, env, Some(&val_ty))?;
                    self.unify(&val_ty, &vt, token)?;
                }
                Ok(Type::Hash(Box::new(key_ty), Box::new(val_ty)))
            }
            Expression::Tuple { elements, .. } => {
                let types = elements
                    .iter()
                    .map(|e| self.check_expression(e, env, None))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Type::Tuple(types))
            }
            Expression::Prefix {
                token,
                operator,
                right,
            } => {
                let right_ty = self.check_expression(right, env, None)?;
                match operator.as_str() {
                    "-" if right_ty.is_numeric() => Ok(right_ty),
                    "!" => {
                        self.unify(&Type::Boolean, &right_ty, token)?;
                        Ok(Type::Boolean)
                    }
                    _ => Err(self.err(format!("invalid operand `{right_ty}` for `{operator}`"), token)),
                }
            }
            Expression::Infix {
                token,
                operator,
                left,
                right,
            } => self.check_infix(token, operator, left, right, env),
            Expression::Try { token, value } => {
                let value_ty = self.check_expression(value, env, None)?;
                let (ok_ty, err_ty) = expect_result(&value_ty).ok_or_else(|| {
                    self.err(format!("`?` requires a Result operand, found `{value_ty}`"), token)
                })?;
                match env::current_return_type(env) {
                    Some(ret) => {
                        let (_, fn_err_ty) = expect_result(&ret).ok_or_else(|| {
                            self.err("`?` used outside a function returning Result", token)
                        })?;
                        self.unify(&fn_err_ty, &err_ty, token)?;
                        Ok(ok_ty)
                    }
                    None => Err(self.err("`?` used outside a function returning Result", token)),
                }
            }
            Expression::Call {
                token,
                function,
                arguments,
            } => self.check_call(token, function, arguments, env, expected),
            Expression::Index { token, left, index } => {
                let left_ty = self.check_expression(left, env, None)?;
                let index_ty = self.check_expression(index, env, None)?;
                match left_ty {
                    Type::Array(el) => {
                        self.unify(&Type::Integer, &index_ty, token)?;
                        Ok(*el)
                    }
                    Type::Hash(key, val) => {
                        self.unify(&key, &index_ty, token)?;
                        Ok(*val)
                    }
                    Type::Tuple(els) => {
                        if let Expression::Integer { value, .. } = index.as_ref() {
                            els.get(*value as usize).cloned().ok_or_else(|| {
                                self.err("tuple index out of range", token)
                            })
                        } else {
                            Err(self.err("tuple index must be an integer literal", token))
                        }
                    }
                    other => Err(self.err(format!("cannot index into `{other}`"), token)),
                }
            }
            Expression::Member {
                token,
                left,
                property,
            } => self.check_member(token, left, property, env),
            Expression::If {
                token,
                condition,
                consequence,
                alternative,
            } => {
                let cond_ty = self.check_expression(condition, env, None)?;
                self.unify(&Type::Boolean, &cond_ty, token)?;
                let cons_ty = self.check_expression(consequence, env, expected)?;
                match alternative {
                    Some(alt) => {
                        let alt_ty = self.check_expression(alt, env, Some(&cons_ty))?;
                        self.unify(&cons_ty, &alt_ty, token)?;
                        Ok(cons_ty)
                    }
                    None => Ok(Type::Null),
                }
            }
            Expression::Match {
                token,
                subjects,
                arms,
            } => self.check_match(token, subjects, arms, env, expected),
            Expression::When {
                token,
                subject,
                arms,
                otherwise,
            } => self.check_when(token, subject, arms, otherwise, env, expected),
            Expression::Function(f) => self.check_function_literal(f, env, expected),
            Expression::Block { statements, .. } => {
                let child = env::TypeEnv::child(env);
                let mut result = Type::Null;
                for stmt in statements {
                    result = self.check_statement(stmt, &child)?;
                }
                Ok(result)
            }
            Expression::Path { token, .. } => Err(self.err("path expressions are not produced by this parser", token)),
        }
    }

    fn check_infix(
        &self,
        token: &crate::lexer::Token,
        operator: &str,
        left: &Expression,
        right: &Expression,
        env: &TypeEnvHandle,
    ) -> Result<Type, TypeError> {
        match operator {
            "=" | "+=" => {
                let target_ty = self.check_assign_target(left, env, token)?;
                let value_ty = self.check_expression(right, env, Some(&target_ty))?;
                if operator == "+=" && !(target_ty.is_numeric() && value_ty.is_numeric()) {
                    return Err(self.err("`+=` requires numeric operands", token));
                }
                self.unify(&target_ty, &value_ty, token)?;
                Ok(Type::Null)
            }
            "&&" | "||" => {
                let left_ty = self.check_expression(left, env, Some(&Type::Boolean))?;
                self.unify(&Type::Boolean, &left_ty, token)?;
                let right_ty = self.check_expression(right, env, Some(&Type::Boolean))?;
                self.unify(&Type::Boolean, &right_ty, token)?;
                Ok(Type::Boolean)
            }
            "==" | "!=" => {
                let left_ty = self.check_expression(left, env, None)?;
                let right_ty = self.check_expression(right, env, Some(&left_ty))?;
                if !matches!(left_ty, Type::Null) && !matches!(right_ty, Type::Null) {
                    self.unify(&left_ty, &right_ty, token)?;
                }
                Ok(Type::Boolean)
            }
            "<" | ">" | "<=" | ">=" => {
                let left_ty = self.check_expression(left, env, None)?;
                let right_ty = self.check_expression(right, env, Some(&left_ty))?;
                self.unify(&left_ty, &right_ty, token)?;
                Ok(Type::Boolean)
            }
            "%" => {
                let left_ty = self.check_expression(left, env, Some(&Type::Integer))?;
                let right_ty = self.check_expression(right, env, Some(&Type::Integer))?;
                self.unify(&Type::Integer, &left_ty, token)?;
                self.unify(&Type::Integer, &right_ty, token)?;
                Ok(Type::Integer)
            }
            "+" | "-" | "*" | "/" => {
                let left_ty = self.check_expression(left, env, None)?;
                let right_ty = self.check_expression(right, env, Some(&left_ty))?;
                if operator == "+" && matches!(left_ty, Type::String) {
                    self.unify(&Type::String, &right_ty, token)?;
                    return Ok(Type::String);
                }
                if !left_ty.is_numeric() || !right_ty.is_numeric() {
                    return Err(self.err(
                        format!("`{operator}` requires numeric operands, found `{left_ty}` and `{right_ty}`"),
                        token,
                    ));
                }
                if matches!(left_ty, Type::Double) || matches!(right_ty, Type::Double) {
                    Ok(Type::Double)
                } else {
                    Ok(Type::Integer)
                }
            }
            other => Err(self.err(format!("unknown operator `{other}`"), token)),
        }
    }

    fn check_assign_target(
        &self,
        target: &Expression,
        env: &TypeEnvHandle,
        token: &crate::lexer::Token,
    ) -> Result<Type, TypeError> {
        match target {
            Expression::Identifier { name, .. } => {
                env::assert_mutable(env, name).map_err(|msg| self.err(msg, token))?;
                env::resolve(env, name).ok_or_else(|| self.err(format!("unknown identifier `{name}`"), token))
            }
            Expression::Index { left, index, .. } => {
                let left_ty = self.check_expression(left, env, None)?;
                match left_ty {
                    Type::Hash(key, val) => {
                        let index_ty = self.check_expression(index, env, None)?;
                        self.unify(&key, &index_ty, token)?;
                        Ok(*val)
                    }
                    other => Err(self.err(format!("cannot assign into `{other}`"), token)),
                }
            }
            Expression::Member { left, property, .. } => {
                let left_ty = self.check_expression(left, env, None)?;
                match &left_ty {
                    Type::Record(r) => r
                        .fields
                        .iter()
                        .find(|(name, _)| name == property)
                        .map(|(_, ty)| ty.clone())
                        .ok_or_else(|| self.err(format!("`{}` has no field `{property}`", r.name), token)),
                    Type::Hash(key, val) => {
                        self.unify(key, &Type::String, token)?;
                        Ok((**val).clone())
                    }
                    other => Err(self.err(format!("cannot assign into `{other}`"), token)),
                }
            }
            _ => Err(self.err("assignment target must be a mutable identifier, hash index, or field access", token)),
        }
    }

    fn check_call(
        &self,
        token: &crate::lexer::Token,
        function: &Expression,
        arguments: &[Expression],
        env: &TypeEnvHandle,
        expected: Option<&Type>,
    ) -> Result<Type, TypeError> {
        if let Expression::Identifier { name, .. } = function {
            if let Some(builtin) = builtin_signature(name) {
                return self.check_ordinary_call(token, &Type::Function(builtin), arguments, env, expected);
            }
        }

        let fn_ty = self.check_expression(function, env, None)?;
        match fn_ty {
            // Variant and record constructors are ordinary `Function` values whose return type
            // carries fresh type variables (§4.1); unifying call arguments against `sig.params`
            // already pins those variables down, so no separate constructor path is needed here.
            Type::Function(_) => self.check_ordinary_call(token, &fn_ty, arguments, env, expected),
            other => Err(self.err(format!("cannot call a value of type `{other}`"), token)),
        }
    }

    fn check_ordinary_call(
        &self,
        token: &crate::lexer::Token,
        fn_ty: &Type,
        arguments: &[Expression],
        env: &TypeEnvHandle,
        expected: Option<&Type>,
    ) -> Result<Type, TypeError> {
        let Type::Function(sig) = fn_ty else {
            return Err(self.err("not a function", token));
        };
        if sig.params.len() != arguments.len() {
            return Err(self.err(
                format!(
                    "expected {} argument(s), found {}",
                    sig.params.len(),
                    arguments.len()
                ),
                token,
            ));
        }
        let mut subst = Substitution::new();
        // Pin down type parameters the arguments alone can't recover — e.g. `None` in
        // `let x: Option<Integer> = None;` supplies no argument for `T` at all, so without
        // unifying the call's own expected type against the signature's return type first,
        // `T` would stay a dangling unresolved variable through the rest of this call (§4.3
        // "unifies parent type arguments with the expected type to infer missing payloads").
        if let Some(expected_ty) = expected {
            unify(sig.return_type.as_ref(), expected_ty, &mut subst).map_err(|msg| self.err(msg, token))?;
        }
        for (param, arg) in sig.params.iter().zip(arguments.iter()) {
            let arg_ty = self.check_expression(arg, env, Some(param))?;
            unify(param, &arg_ty, &mut subst).map_err(|msg| self.err(msg, token))?;
        }
        for param in sig.params.iter().chain(std::iter::once(sig.return_type.as_ref())) {
            self.check_trait_bounds(param, &subst, env, token)?;
        }
        Ok(substitute(&sig.return_type, &subst))
    }

    /// After unifying call arguments, every bound type variable that landed on a concrete type
    /// must actually implement the traits it was bound by (§4.3 "remaining bound variables are
    /// checked against their trait bounds using the implementation table"). Variables still
    /// unresolved at this point are left for the caller's own unification to pin down later.
    fn check_trait_bounds(
        &self,
        ty: &Type,
        subst: &Substitution,
        env: &TypeEnvHandle,
        token: &crate::lexer::Token,
    ) -> Result<(), TypeError> {
        match ty {
            Type::TypeVariable { bounds, .. } if !bounds.is_empty() => {
                let resolved = substitute(ty, subst);
                if matches!(resolved, Type::TypeVariable { .. }) {
                    return Ok(());
                }
                let base = base_type_name(&resolved);
                for bound in bounds {
                    let implements = env::impls_for(env, &base)
                        .iter()
                        .any(|(node, _)| matches!(node.as_ref(), Statement::Impl { trait_name, .. } if trait_name == bound));
                    if !implements {
                        return Err(self.err(
                            format!("`{resolved}` does not implement trait `{bound}`"),
                            token,
                        ));
                    }
                }
                Ok(())
            }
            Type::Array(el) => self.check_trait_bounds(el, subst, env, token),
            Type::Hash(k, v) => {
                self.check_trait_bounds(k, subst, env, token)?;
                self.check_trait_bounds(v, subst, env, token)
            }
            Type::Tuple(els) => {
                for el in els {
                    self.check_trait_bounds(el, subst, env, token)?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn check_member(
        &self,
        token: &crate::lexer::Token,
        left: &Expression,
        property: &str,
        env: &TypeEnvHandle,
    ) -> Result<Type, TypeError> {
        let left_ty = self.check_expression(left, env, None)?;
        match &left_ty {
            Type::Record(r) => r
                .fields
                .iter()
                .find(|(name, _)| name == property)
                .map(|(_, ty)| ty.clone())
                .ok_or_else(|| self.err(format!("`{}` has no field `{property}`", r.name), token)),
            Type::Hash(key, val) => {
                self.unify(key, &Type::String, token)?;
                Ok((**val).clone())
            }
            Type::Module { env: mod_env, name } => {
                if !mod_env.borrow().is_exposed(property) {
                    return Err(self.err(format!("`{property}` is not exposed by module `{name}`"), token));
                }
                env::resolve(mod_env, property)
                    .ok_or_else(|| self.err(format!("module `{name}` has no member `{property}`"), token))
            }
            other => {
                let base_name = base_type_name(other);
                for (impl_node, impl_env) in env::impls_for(env, &base_name) {
                    let Statement::Impl { methods, .. } = impl_node.as_ref() else {
                        continue;
                    };
                    if let Some(m) = methods.iter().find(|m| m.name.as_deref() == Some(property)) {
                        let method_ty = self.check_function_literal(m, &impl_env, None)?;
                        if let Type::Function(sig) = method_ty {
                            let mut params = sig.params;
                            if !params.is_empty() {
                                params.remove(0);
                            }
                            return Ok(Type::Function(FunctionSignature {
                                params,
                                return_type: sig.return_type,
                                type_params: sig.type_params,
                            }));
                        }
                    }
                }
                Err(self.err(format!("`{other}` has no member `{property}`"), token))
            }
        }
    }

    fn check_match(
        &self,
        token: &crate::lexer::Token,
        subjects: &[Expression],
        arms: &[crate::ast::MatchArm],
        env: &TypeEnvHandle,
        expected: Option<&Type>,
    ) -> Result<Type, TypeError> {
        let subject_types = subjects
            .iter()
            .map(|s| self.check_expression(s, env, None))
            .collect::<Result<Vec<_>, _>>()?;

        let mut result_ty: Option<Type> = expected.cloned();
        let mut covered_variants = std::collections::HashSet::new();
        let mut has_wildcard = false;

        for arm in arms {
            let child = env::TypeEnv::child(env);
            for (pattern, subject_ty) in arm.patterns.iter().zip(subject_types.iter()) {
                if let Pattern::Variant { name, .. } = pattern {
                    covered_variants.insert(name.clone());
                }
                if matches!(pattern, Pattern::Wildcard { .. } | Pattern::Identifier { .. }) {
                    has_wildcard = true;
                }
                self.bind_match_pattern(pattern, subject_ty, &child)?;
            }
            let body_ty = self.check_expression(&arm.body, &child, result_ty.as_ref())?;
            match &result_ty {
                Some(rt) => {
                    self.unify(rt, &body_ty, token)?;
                }
                None => result_ty = Some(body_ty),
            }
        }

        if let Some(Type::Sum(sum)) = subject_types.first() {
            if !has_wildcard {
                let missing: Vec<&String> = sum
                    .variants
                    .keys()
                    .filter(|v| !covered_variants.contains(*v))
                    .collect();
                if !missing.is_empty() {
                    let names = missing.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", ");
                    return Err(self.err(
                        format!("non-exhaustive match on `{}`: missing variant(s) {names}", sum.name),
                        token,
                    ));
                }
            }
        }

        Ok(result_ty.unwrap_or(Type::Null))
    }

    fn bind_match_pattern(&self, pattern: &Pattern, ty: &Type, env: &TypeEnvHandle) -> Result<(), TypeError> {
        match pattern {
            Pattern::Identifier { name, .. } => {
                env.borrow_mut().define(name.clone(), ty.clone(), false);
                Ok(())
            }
            Pattern::Wildcard { .. } => Ok(()),
            Pattern::Literal { .. } => Ok(()),
            Pattern::Variant { token, name, bindings } => match ty {
                Type::Sum(sum) => {
                    let variant = sum.variants.get(name).ok_or_else(|| {
                        self.err(format!("`{}` has no variant `{name}`", sum.name), token)
                    })?;
                    for (binding, param_ty) in bindings.iter().zip(variant.params.iter()) {
                        self.bind_match_pattern(binding, param_ty, env)?;
                    }
                    Ok(())
                }
                other => Err(self.err(format!("cannot match variant pattern against `{other}`"), token)),
            },
            Pattern::Array { token, elements, rest } => match ty {
                Type::Array(el_ty) => {
                    for el in elements {
                        self.bind_match_pattern(el, el_ty, env)?;
                    }
                    if let Some(rest_pat) = rest {
                        self.bind_match_pattern(rest_pat, ty, env)?;
                    }
                    Ok(())
                }
                other => Err(self.err(format!("cannot match array pattern against `{other}`"), token)),
            },
            Pattern::Tuple { token, elements } => match ty {
                Type::Tuple(types) if types.len() == elements.len() => {
                    for (p, t) in elements.iter().zip(types.iter()) {
                        self.bind_match_pattern(p, t, env)?;
                    }
                    Ok(())
                }
                other => Err(self.err(format!("cannot match tuple pattern against `{other}`"), token)),
            },
        }
    }

    fn check_when(
        &self,
        token: &crate::lexer::Token,
        subject: &Option<Box<Expression>>,
        arms: &[crate::ast::WhenArm],
        otherwise: &Expression,
        env: &TypeEnvHandle,
        expected: Option<&Type>,
    ) -> Result<Type, TypeError> {
        let subject_ty = match subject {
            Some(s) => Some(self.check_expression(s, env, None)?),
            None => None,
        };

        let mut result_ty: Option<Type> = expected.cloned();
        for arm in arms {
            for pattern in &arm.patterns {
                let pattern_ty = self.check_expression(pattern, env, subject_ty.as_ref())?;
                match &subject_ty {
                    // With a subject, a pattern either equals the subject or is itself a
                    // boolean predicate (§4.2 "each pattern either equals the subject or is a
                    // boolean expression"); try the equality reading first and only demand
                    // `Boolean` when the pattern's type doesn't actually match the subject's.
                    Some(s) => {
                        if unify(s, &pattern_ty, &mut Substitution::new()).is_err() {
                            self.unify(&Type::Boolean, &pattern_ty, token)?;
                        }
                    }
                    None => {
                        self.unify(&Type::Boolean, &pattern_ty, token)?;
                    }
                }
            }
            let body_ty = self.check_expression(&arm.body, env, result_ty.as_ref())?;
            match &result_ty {
                Some(rt) => {
                    self.unify(rt, &body_ty, token)?;
                }
                None => result_ty = Some(body_ty),
            }
        }
        let otherwise_ty = self.check_expression(otherwise, env, result_ty.as_ref())?;
        match &result_ty {
            Some(rt) => self.unify(rt, &otherwise_ty, token)?,
            None => {}
        };
        Ok(result_ty.unwrap_or(otherwise_ty))
    }

    fn check_function_literal(
        &self,
        f: &FunctionLiteral,
        env: &TypeEnvHandle,
        expected: Option<&Type>,
    ) -> Result<Type, TypeError> {
        let expected_sig = match expected {
            Some(Type::Function(sig)) => Some(sig.clone()),
            _ => None,
        };

        let child = env::TypeEnv::child(env);
        let mut param_types = vec![];
        for (i, (pname, ann)) in f.params.iter().enumerate() {
            let ty = match ann {
                Some(tn) => self.resolve_type_node(tn, env)?,
                None => match &expected_sig {
                    Some(sig) if i < sig.params.len() => sig.params[i].clone(),
                    _ => self.fresh_var(),
                },
            };
            child.borrow_mut().define(pname.clone(), ty.clone(), false);
            param_types.push(ty);
        }

        let declared_return = match &f.return_type {
            Some(tn) => Some(self.resolve_type_node(tn, env)?),
            None => expected_sig.as_ref().map(|s| (*s.return_type).clone()),
        };

        if let Some(name) = &f.name {
            if let Some(ret) = &declared_return {
                let self_sig = Type::Function(FunctionSignature {
                    params: param_types.clone(),
                    return_type: Box::new(ret.clone()),
                    type_params: f.type_params.clone(),
                });
                child.borrow_mut().define(name.clone(), self_sig, false);
            }
        }

        if let Some(ret) = &declared_return {
            child.borrow_mut().set_return_type(ret.clone());
        }

        let body_ty = self.check_expression(&f.body, &child, declared_return.as_ref())?;
        let return_type = match declared_return {
            Some(rt) => {
                self.unify(&rt, &body_ty, f.body.token())?;
                rt
            }
            None => body_ty,
        };

        Ok(Type::Function(FunctionSignature {
            params: param_types,
            return_type: Box::new(return_type),
            type_params: f.type_params.clone(),
        }))
    }

    // ---- type nodes ----

    pub fn resolve_type_node(&self, node: &TypeNode, env: &TypeEnvHandle) -> Result<Type, TypeError> {
        match node {
            TypeNode::Named { token, name, type_args } => {
                self.resolve_named_type(token, name, type_args, env)
            }
            TypeNode::Path { token, segments, .. } => {
                Err(self.err(format!("unresolved qualified type `{}`", segments.join(".")), token))
            }
            TypeNode::Function {
                params,
                return_type,
                ..
            } => {
                let params = params
                    .iter()
                    .map(|p| self.resolve_type_node(p, env))
                    .collect::<Result<Vec<_>, _>>()?;
                let return_type = Box::new(self.resolve_type_node(return_type, env)?);
                Ok(Type::Function(FunctionSignature {
                    params,
                    return_type,
                    type_params: vec![],
                }))
            }
            TypeNode::Tuple { elements, .. } => {
                let els = elements
                    .iter()
                    .map(|e| self.resolve_type_node(e, env))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Type::Tuple(els))
            }
        }
    }

    fn resolve_named_type(
        &self,
        token: &crate::lexer::Token,
        name: &str,
        type_args: &[TypeNode],
        env: &TypeEnvHandle,
    ) -> Result<Type, TypeError> {
        match name {
            "Integer" => return Ok(Type::Integer),
            "Double" => return Ok(Type::Double),
            "Boolean" => return Ok(Type::Boolean),
            "String" => return Ok(Type::String),
            "Null" => return Ok(Type::Null),
            "Any" => return Ok(Type::Any),
            "Array" => {
                let el = type_args
                    .first()
                    .map(|t| self.resolve_type_node(t, env))
                    .transpose()?
                    .unwrap_or(Type::Any);
                return Ok(Type::Array(Box::new(el)));
            }
            "Hash" => {
                let key = type_args
                    .first()
                    .map(|t| self.resolve_type_node(t, env))
                    .transpose()?
                    .unwrap_or(Type::Any);
                let val = type_args
                    .get(1)
                    .map(|t| self.resolve_type_node(t, env))
                    .transpose()?
                    .unwrap_or(Type::Any);
                return Ok(Type::Hash(Box::new(key), Box::new(val)));
            }
            _ => {}
        }

        let args = type_args
            .iter()
            .map(|t| self.resolve_type_node(t, env))
            .collect::<Result<Vec<_>, _>>()?;

        match env::resolve(env, name) {
            Some(Type::Sum(sum)) => {
                if args.is_empty() {
                    Ok(Type::Sum(sum))
                } else {
                    let mut s = (*sum).clone();
                    s.type_args = args;
                    Ok(Type::Sum(Rc::new(s)))
                }
            }
            Some(Type::Record(rec)) => {
                if args.is_empty() {
                    Ok(Type::Record(rec))
                } else {
                    let mut r = (*rec).clone();
                    r.type_args = args;
                    Ok(Type::Record(Rc::new(r)))
                }
            }
            Some(Type::Trait(t)) => Ok(Type::Trait(t)),
            _ => Ok(Type::TypeVariable {
                name: name.to_string(),
                bounds: vec![],
            }),
        }
    }
}

fn base_type_name(ty: &Type) -> String {
    match ty {
        Type::Record(r) => r.name.clone(),
        Type::Sum(s) => s.name.clone(),
        Type::Hash(_, _) => "Hash".to_string(),
        other => other.to_string(),
    }
}

fn expect_result(ty: &Type) -> Option<(Type, Type)> {
    match ty {
        Type::Sum(sum) if sum.name == "Result" => {
            let ok = sum.type_args.first().cloned().unwrap_or(Type::Any);
            let err = sum.type_args.get(1).cloned().unwrap_or(Type::Any);
            Some((ok, err))
        }
        _ => None,
    }
}

/// Hardwired builtin signatures (§4.3 "Builtin functions").
pub fn builtin_signature(name: &str) -> Option<FunctionSignature> {
    let tv = |n: &str| Type::TypeVariable {
        name: n.to_string(),
        bounds: vec![],
    };
    Some(match name {
        "len" => FunctionSignature {
            params: vec![Type::Any],
            return_type: Box::new(Type::Integer),
            type_params: vec![],
        },
        "toString" => FunctionSignature {
            params: vec![Type::Any],
            return_type: Box::new(Type::String),
            type_params: vec![],
        },
        "writeln" | "write" => FunctionSignature {
            params: vec![Type::Any],
            return_type: Box::new(Type::Null),
            type_params: vec![],
        },
        "strFormat" => FunctionSignature {
            params: vec![Type::String, Type::Any],
            return_type: Box::new(Type::String),
            type_params: vec![],
        },
        "map" => FunctionSignature {
            params: vec![
                Type::Array(Box::new(tv("T"))),
                Type::Function(FunctionSignature {
                    params: vec![tv("T")],
                    return_type: Box::new(tv("U")),
                    type_params: vec![],
                }),
            ],
            return_type: Box::new(Type::Array(Box::new(tv("U")))),
            type_params: vec!["T".to_string(), "U".to_string()],
        },
        "filter" => FunctionSignature {
            params: vec![
                Type::Array(Box::new(tv("T"))),
                Type::Function(FunctionSignature {
                    params: vec![tv("T")],
                    return_type: Box::new(Type::Boolean),
                    type_params: vec![],
                }),
            ],
            return_type: Box::new(Type::Array(Box::new(tv("T")))),
            type_params: vec!["T".to_string()],
        },
        "reduce" => FunctionSignature {
            params: vec![
                Type::Array(Box::new(tv("T"))),
                tv("U"),
                Type::Function(FunctionSignature {
                    params: vec![tv("U"), tv("T")],
                    return_type: Box::new(tv("U")),
                    type_params: vec![],
                }),
            ],
            return_type: Box::new(tv("U")),
            type_params: vec!["T".to_string(), "U".to_string()],
        },
        "first" => FunctionSignature {
            params: vec![Type::Array(Box::new(tv("T")))],
            return_type: Box::new(tv("T")),
            type_params: vec!["T".to_string()],
        },
        "rest" => FunctionSignature {
            params: vec![Type::Array(Box::new(tv("T")))],
            return_type: Box::new(Type::Array(Box::new(tv("T")))),
            type_params: vec!["T".to_string()],
        },
        "prepend" => FunctionSignature {
            params: vec![tv("T"), Type::Array(Box::new(tv("T")))],
            return_type: Box::new(Type::Array(Box::new(tv("T")))),
            type_params: vec!["T".to_string()],
        },
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser::parse;

    fn check_source(src: &str) -> Result<Type, TypeError> {
        let tokens = Lexer::new(src).lex();
        let program = parse(tokens, src).expect("parses");
        let env = env::TypeEnv::root();
        crate::typechecker::env::resolve(&env, "x");
        let checker = Checker::new(Rc::from(src));
        let mut last = Type::Null;
        for stmt in &program.statements {
            last = checker.check_statement(stmt, &env)?;
        }
        Ok(last)
    }

    #[test]
    fn widens_integer_plus_double() {
        let ty = check_source("1 + 2.0").unwrap();
        assert_eq!(ty, Type::Double);
    }

    #[test]
    fn rejects_mutation_of_immutable_binding() {
        let err = check_source("let x = 1; x = 2;").unwrap_err();
        assert!(err.message.contains("immutable"));
    }

    #[test]
    fn when_with_subject_allows_boolean_predicate_arms() {
        let ty = check_source(
            r#"
            let n = 5;
            when (n) { | n > 0 => "pos", | n < 0 => "neg", else => "zero" };
            "#,
        )
        .unwrap();
        assert_eq!(ty, Type::String);
    }

    #[test]
    fn when_with_subject_allows_equality_arms() {
        let ty = check_source(
            r#"
            let n = 5;
            when (n) { | 5 => "five", else => "other" };
            "#,
        )
        .unwrap();
        assert_eq!(ty, Type::String);
    }

    #[test]
    fn when_without_subject_requires_boolean_patterns() {
        let err = check_source(r#"when { | 1 => "no", else => "fallback" };"#).unwrap_err();
        assert!(err.message.contains("cannot unify"));
    }

    #[test]
    fn let_with_expected_option_type_pins_constructor_type_argument() {
        let env = env::TypeEnv::root();
        crate::prelude::seed_types(&env);
        let src = "let x: Option<Integer> = None();";
        let tokens = Lexer::new(src).lex();
        let program = parse(tokens, src).expect("parses");
        let checker = Checker::new(Rc::from(src));
        for stmt in &program.statements {
            checker.check_statement(stmt, &env).unwrap();
        }
        match env::resolve(&env, "x") {
            Some(Type::Sum(sum)) => {
                assert_eq!(sum.name, "Option");
                assert_eq!(sum.type_args, vec![Type::Integer]);
            }
            other => panic!("expected `Option<Integer>`, got {other:?}"),
        }
    }

    #[test]
    fn declared_integer_return_rejects_a_double_body() {
        let err = check_source("let f = () -> Integer => 1.5;").unwrap_err();
        assert!(err.message.contains("cannot unify"));
    }

    #[test]
    fn allows_mutation_of_mutable_binding() {
        let ty = check_source("let mut x = 1; x = 2;").unwrap();
        assert_eq!(ty, Type::Null);
    }
}
