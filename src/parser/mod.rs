//! Pratt parser turning a token stream into a [`Program`] (§4.2).
//!
//! Grounded on the teacher's top-level `parse()` entry point and its error-accumulation
//! discipline (`parser/mod.rs`); the combinator (`Comb`) architecture itself is not reused —
//! the spec calls for hand-rolled precedence climbing instead.

mod error;

pub use error::ParseError;

use std::rc::Rc;

use crate::ast::{
    Expression, FieldDecl, FunctionLiteral, InterpolationPart, MatchArm, MethodSignature, Pattern,
    Program, Statement, TypeNode, VariantDecl, WhenArm,
};
use crate::lexer::{Token, TokenKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Precedence {
    Lowest,
    Pipe,
    Assign,
    Annotate,
    LogicalOr,
    LogicalAnd,
    Equals,
    LessGreater,
    Sum,
    Product,
    Prefix,
    Call,
    Index,
    Member,
    Try,
}

/// Whether `kind` is actually consumed by [`Parser::parse_infix`]. `Colon` carries an
/// `Annotate` precedence purely as a boundary so condition/key parsing stops before it, but it
/// has no generic infix form of its own — callers consume it explicitly (`let x: T`, hash
/// literal `k: v`) — so it must be excluded here or the Pratt loop would spin without advancing.
fn is_infix_operator(kind: TokenKind) -> bool {
    use TokenKind::*;
    matches!(
        kind,
        Plus | Minus
            | Star
            | Slash
            | Percent
            | Eq
            | NotEq
            | Lt
            | Gt
            | LtEq
            | GtEq
            | And
            | Or
            | PipeOperator
            | Assign
            | PlusAssign
            | FatArrow
            | LParen
            | LBracket
            | Dot
            | Question
    )
}

fn precedence_of(kind: TokenKind) -> Precedence {
    use Precedence::*;
    use TokenKind::*;
    match kind {
        PipeOperator => Pipe,
        Assign | PlusAssign | FatArrow => self::Precedence::Assign,
        Colon => Annotate,
        Or => LogicalOr,
        And => LogicalAnd,
        Eq | NotEq => Equals,
        Lt | Gt | LtEq | GtEq => LessGreater,
        Plus | Minus => Sum,
        Star | Slash | Percent => Product,
        LParen => Call,
        LBracket => Index,
        Dot => Member,
        Question => Try,
        _ => Lowest,
    }
}

/// Parses a complete token stream (teacher's `parse()` entry point, generalized to Pratt
/// parsing and error accumulation instead of combinators).
pub fn parse(tokens: Vec<Token>, source: &str) -> Result<Program, Vec<ParseError>> {
    let mut parser = Parser::new(tokens, source);
    let program = parser.parse_program();
    if parser.errors.is_empty() {
        Ok(program)
    } else {
        Err(parser.errors)
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    source: Rc<str>,
    errors: Vec<ParseError>,
}

impl Parser {
    fn new(tokens: Vec<Token>, source: &str) -> Self {
        Self {
            tokens,
            pos: 0,
            source: Rc::from(source),
            errors: vec![],
        }
    }

    fn current(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_kind(&self) -> TokenKind {
        self.current().kind
    }

    fn advance(&mut self) -> Token {
        let tok = self.current().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek_kind() == kind
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token, ParseError> {
        if self.at(kind) {
            Ok(self.advance())
        } else {
            let tok = self.current().clone();
            Err(self.error(
                format!("expected {kind}, found {} (`{}`)", tok.kind, tok.literal),
                &tok,
            ))
        }
    }

    fn error(&self, message: impl Into<String>, token: &Token) -> ParseError {
        ParseError::new(message, token, Some(self.source.clone()))
    }

    fn skip_semicolon(&mut self) {
        if self.at(TokenKind::Semicolon) {
            self.advance();
        }
    }

    fn synchronize(&mut self) {
        while !self.at(TokenKind::Eof) {
            if self.at(TokenKind::Semicolon) {
                self.advance();
                return;
            }
            self.advance();
        }
    }

    fn parse_program(&mut self) -> Program {
        let mut statements = vec![];
        while !self.at(TokenKind::Eof) {
            match self.parse_statement() {
                Ok(stmt) => statements.push(stmt),
                Err(e) => {
                    self.errors.push(e);
                    self.synchronize();
                }
            }
        }
        Program { statements }
    }

    fn parse_statement(&mut self) -> Result<Statement, ParseError> {
        match self.peek_kind() {
            TokenKind::Module => self.parse_module_statement(),
            TokenKind::Use => self.parse_use_statement(),
            TokenKind::Let => self.parse_let_statement(),
            TokenKind::Return => self.parse_return_statement(),
            TokenKind::Type => self.parse_type_decl(),
            TokenKind::Record => self.parse_record_decl(),
            TokenKind::Trait => self.parse_trait_decl(),
            TokenKind::Impl => self.parse_impl_decl(),
            _ => {
                let token = self.current().clone();
                let expression = self.parse_expression(Precedence::Lowest)?;
                self.skip_semicolon();
                Ok(Statement::Expression { token, expression })
            }
        }
    }

    fn parse_dotted_path(&mut self) -> Result<Vec<String>, ParseError> {
        let mut segments = vec![self.expect(TokenKind::Ident)?.literal];
        while self.at(TokenKind::Dot) {
            self.advance();
            segments.push(self.expect(TokenKind::Ident)?.literal);
        }
        Ok(segments)
    }

    fn parse_exposing_clause(&mut self) -> Result<Option<Vec<String>>, ParseError> {
        if !self.at(TokenKind::Exposing) {
            return Ok(None);
        }
        self.advance();
        self.expect(TokenKind::LParen)?;
        let mut names = vec![];
        if !self.at(TokenKind::RParen) {
            names.push(self.expect(TokenKind::Ident)?.literal);
            while self.at(TokenKind::Comma) {
                self.advance();
                names.push(self.expect(TokenKind::Ident)?.literal);
            }
        }
        self.expect(TokenKind::RParen)?;
        Ok(Some(names))
    }

    fn parse_module_statement(&mut self) -> Result<Statement, ParseError> {
        let token = self.expect(TokenKind::Module)?;
        let name = self.parse_dotted_path()?.join(".");
        let exposing = self.parse_exposing_clause()?;
        self.skip_semicolon();
        Ok(Statement::Module {
            token,
            name,
            exposing,
        })
    }

    fn parse_use_statement(&mut self) -> Result<Statement, ParseError> {
        let token = self.expect(TokenKind::Use)?;
        let path = self.parse_dotted_path()?;
        let alias = if self.at(TokenKind::As) {
            self.advance();
            Some(self.expect(TokenKind::Ident)?.literal)
        } else {
            None
        };
        let exposing = self.parse_exposing_clause()?;
        self.skip_semicolon();
        Ok(Statement::Use {
            token,
            path,
            alias,
            exposing,
        })
    }

    fn parse_let_statement(&mut self) -> Result<Statement, ParseError> {
        let token = self.expect(TokenKind::Let)?;
        let mutable = if self.at(TokenKind::Mut) {
            self.advance();
            true
        } else {
            false
        };
        let pattern = self.parse_pattern()?;
        let type_annotation = if self.at(TokenKind::Colon) {
            if !matches!(pattern, Pattern::Identifier { .. }) {
                let tok = self.current().clone();
                return Err(self.error(
                    "type annotations are not allowed on destructuring patterns",
                    &tok,
                ));
            }
            self.advance();
            Some(self.parse_type_node()?)
        } else {
            None
        };
        self.expect(TokenKind::Assign)?;
        let value = self.parse_expression(Precedence::Lowest)?;
        self.skip_semicolon();
        Ok(Statement::Let {
            token,
            mutable,
            pattern,
            type_annotation,
            value,
        })
    }

    fn parse_return_statement(&mut self) -> Result<Statement, ParseError> {
        let token = self.expect(TokenKind::Return)?;
        let value = if self.at(TokenKind::Semicolon) || self.at(TokenKind::RBrace) || self.at(TokenKind::Eof) {
            None
        } else {
            Some(self.parse_expression(Precedence::Lowest)?)
        };
        self.skip_semicolon();
        Ok(Statement::Return { token, value })
    }

    fn parse_type_params(&mut self) -> Result<Vec<String>, ParseError> {
        if !self.at(TokenKind::Lt) {
            return Ok(vec![]);
        }
        self.advance();
        let mut params = vec![self.expect(TokenKind::Ident)?.literal];
        while self.at(TokenKind::Comma) {
            self.advance();
            params.push(self.expect(TokenKind::Ident)?.literal);
        }
        self.expect(TokenKind::Gt)?;
        Ok(params)
    }

    fn parse_type_decl(&mut self) -> Result<Statement, ParseError> {
        let token = self.expect(TokenKind::Type)?;
        let name = self.expect(TokenKind::Ident)?.literal;
        let type_params = self.parse_type_params()?;
        self.expect(TokenKind::Assign)?;

        let mut variants = vec![self.parse_variant_decl()?];
        while self.at(TokenKind::Pipe) {
            self.advance();
            variants.push(self.parse_variant_decl()?);
        }
        self.skip_semicolon();
        Ok(Statement::TypeDecl {
            token,
            name,
            type_params,
            variants,
        })
    }

    fn parse_variant_decl(&mut self) -> Result<VariantDecl, ParseError> {
        let name = self.expect(TokenKind::Ident)?.literal;
        let mut params = vec![];
        if self.at(TokenKind::LParen) {
            self.advance();
            if !self.at(TokenKind::RParen) {
                params.push(self.parse_type_node()?);
                while self.at(TokenKind::Comma) {
                    self.advance();
                    params.push(self.parse_type_node()?);
                }
            }
            self.expect(TokenKind::RParen)?;
        }
        Ok(VariantDecl { name, params })
    }

    fn parse_record_decl(&mut self) -> Result<Statement, ParseError> {
        let token = self.expect(TokenKind::Record)?;
        let name = self.expect(TokenKind::Ident)?.literal;
        let type_params = self.parse_type_params()?;
        self.expect(TokenKind::LParen)?;
        let mut fields = vec![];
        if !self.at(TokenKind::RParen) {
            fields.push(self.parse_field_decl()?);
            while self.at(TokenKind::Comma) {
                self.advance();
                fields.push(self.parse_field_decl()?);
            }
        }
        self.expect(TokenKind::RParen)?;
        self.skip_semicolon();
        Ok(Statement::RecordDecl {
            token,
            name,
            type_params,
            fields,
        })
    }

    fn parse_field_decl(&mut self) -> Result<FieldDecl, ParseError> {
        let name = self.expect(TokenKind::Ident)?.literal;
        self.expect(TokenKind::Colon)?;
        let type_annotation = self.parse_type_node()?;
        Ok(FieldDecl {
            name,
            type_annotation,
        })
    }

    fn parse_trait_decl(&mut self) -> Result<Statement, ParseError> {
        let token = self.expect(TokenKind::Trait)?;
        let name = self.expect(TokenKind::Ident)?.literal;
        let type_params = self.parse_type_params()?;
        self.expect(TokenKind::LBrace)?;
        let mut methods = vec![];
        while !self.at(TokenKind::RBrace) && !self.at(TokenKind::Eof) {
            methods.push(self.parse_method_signature()?);
        }
        self.expect(TokenKind::RBrace)?;
        Ok(Statement::TraitDecl {
            token,
            name,
            type_params,
            methods,
        })
    }

    fn parse_method_signature(&mut self) -> Result<MethodSignature, ParseError> {
        self.expect(TokenKind::Fn)?;
        let name = self.expect(TokenKind::Ident)?.literal;
        self.expect(TokenKind::LParen)?;
        let mut params = vec![];
        if !self.at(TokenKind::RParen) {
            params.push(self.parse_param()?);
            while self.at(TokenKind::Comma) {
                self.advance();
                params.push(self.parse_param()?);
            }
        }
        self.expect(TokenKind::RParen)?;
        let return_type = if self.at(TokenKind::Arrow) {
            self.advance();
            Some(self.parse_type_node()?)
        } else {
            None
        };
        self.expect(TokenKind::Semicolon)?;
        Ok(MethodSignature {
            name,
            params,
            return_type,
        })
    }

    fn parse_param(&mut self) -> Result<(String, Option<TypeNode>), ParseError> {
        let name = self.expect(TokenKind::Ident)?.literal;
        let type_annotation = if self.at(TokenKind::Colon) {
            self.advance();
            Some(self.parse_type_node()?)
        } else {
            None
        };
        Ok((name, type_annotation))
    }

    fn parse_impl_decl(&mut self) -> Result<Statement, ParseError> {
        let token = self.expect(TokenKind::Impl)?;
        let type_params = self.parse_type_params()?;
        let trait_name = self.expect(TokenKind::Ident)?.literal;
        self.expect(TokenKind::For)?;
        let target = self.parse_type_node()?;
        self.expect(TokenKind::LBrace)?;
        let mut methods = vec![];
        while !self.at(TokenKind::RBrace) && !self.at(TokenKind::Eof) {
            methods.push(self.parse_method_def()?);
        }
        self.expect(TokenKind::RBrace)?;
        Ok(Statement::Impl {
            token,
            type_params,
            trait_name,
            target,
            methods,
        })
    }

    fn parse_method_def(&mut self) -> Result<FunctionLiteral, ParseError> {
        match self.parse_function_literal()? {
            Expression::Function(f) => Ok(f),
            other => {
                let tok = other.token().clone();
                Err(self.error("expected a method definition", &tok))
            }
        }
    }

    // ---- patterns ----

    fn parse_pattern(&mut self) -> Result<Pattern, ParseError> {
        match self.peek_kind() {
            TokenKind::Underscore => {
                let token = self.advance();
                Ok(Pattern::Wildcard { token })
            }
            TokenKind::LBracket => self.parse_array_pattern(),
            TokenKind::LParen => self.parse_tuple_pattern(),
            TokenKind::Ident => {
                let token = self.advance();
                let name = token.literal.clone();
                if self.at(TokenKind::LParen) {
                    self.advance();
                    let mut bindings = vec![];
                    if !self.at(TokenKind::RParen) {
                        bindings.push(self.parse_pattern()?);
                        while self.at(TokenKind::Comma) {
                            self.advance();
                            bindings.push(self.parse_pattern()?);
                        }
                    }
                    self.expect(TokenKind::RParen)?;
                    Ok(Pattern::Variant {
                        token,
                        name,
                        bindings,
                    })
                } else {
                    Ok(Pattern::Identifier { token, name })
                }
            }
            TokenKind::Integer | TokenKind::Double | TokenKind::String | TokenKind::True | TokenKind::False => {
                let token = self.current().clone();
                let value = Box::new(self.parse_primary()?);
                Ok(Pattern::Literal { token, value })
            }
            _ => {
                let tok = self.current().clone();
                Err(self.error(format!("unexpected token in pattern: `{}`", tok.literal), &tok))
            }
        }
    }

    fn parse_array_pattern(&mut self) -> Result<Pattern, ParseError> {
        let token = self.expect(TokenKind::LBracket)?;
        let mut elements = vec![];
        let mut rest = None;
        if !self.at(TokenKind::RBracket) {
            loop {
                if self.at(TokenKind::DotDotDot) {
                    self.advance();
                    rest = Some(Box::new(self.parse_pattern()?));
                    break;
                }
                elements.push(self.parse_pattern()?);
                if self.at(TokenKind::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.expect(TokenKind::RBracket)?;
        Ok(Pattern::Array {
            token,
            elements,
            rest,
        })
    }

    fn parse_tuple_pattern(&mut self) -> Result<Pattern, ParseError> {
        let token = self.expect(TokenKind::LParen)?;
        let mut elements = vec![];
        if !self.at(TokenKind::RParen) {
            elements.push(self.parse_pattern()?);
            while self.at(TokenKind::Comma) {
                self.advance();
                elements.push(self.parse_pattern()?);
            }
        }
        self.expect(TokenKind::RParen)?;
        Ok(Pattern::Tuple { token, elements })
    }

    // ---- type nodes ----

    fn parse_type_node(&mut self) -> Result<TypeNode, ParseError> {
        match self.peek_kind() {
            TokenKind::Fn => {
                let token = self.advance();
                self.expect(TokenKind::LParen)?;
                let mut params = vec![];
                if !self.at(TokenKind::RParen) {
                    params.push(self.parse_type_node()?);
                    while self.at(TokenKind::Comma) {
                        self.advance();
                        params.push(self.parse_type_node()?);
                    }
                }
                self.expect(TokenKind::RParen)?;
                self.expect(TokenKind::Arrow)?;
                let return_type = Box::new(self.parse_type_node()?);
                Ok(TypeNode::Function {
                    token,
                    params,
                    return_type,
                })
            }
            TokenKind::LParen => {
                let token = self.advance();
                let mut elements = vec![];
                if !self.at(TokenKind::RParen) {
                    elements.push(self.parse_type_node()?);
                    while self.at(TokenKind::Comma) {
                        self.advance();
                        elements.push(self.parse_type_node()?);
                    }
                }
                self.expect(TokenKind::RParen)?;
                Ok(TypeNode::Tuple { token, elements })
            }
            TokenKind::Ident => {
                let token = self.advance();
                let mut segments = vec![token.literal.clone()];
                while self.at(TokenKind::Dot) {
                    self.advance();
                    segments.push(self.expect(TokenKind::Ident)?.literal);
                }
                let type_args = self.parse_type_args()?;
                if segments.len() == 1 {
                    Ok(TypeNode::Named {
                        token,
                        name: segments.remove(0),
                        type_args,
                    })
                } else {
                    Ok(TypeNode::Path {
                        token,
                        segments,
                        type_args,
                    })
                }
            }
            _ => {
                let tok = self.current().clone();
                Err(self.error(format!("expected a type, found `{}`", tok.literal), &tok))
            }
        }
    }

    fn parse_type_args(&mut self) -> Result<Vec<TypeNode>, ParseError> {
        if !self.at(TokenKind::Lt) {
            return Ok(vec![]);
        }
        self.advance();
        let mut args = vec![self.parse_type_node()?];
        while self.at(TokenKind::Comma) {
            self.advance();
            args.push(self.parse_type_node()?);
        }
        self.expect(TokenKind::Gt)?;
        Ok(args)
    }

    // ---- expressions ----

    fn parse_expression(&mut self, min_prec: Precedence) -> Result<Expression, ParseError> {
        let mut left = self.parse_prefix()?;

        while is_infix_operator(self.peek_kind()) && min_prec < precedence_of(self.peek_kind()) {
            left = self.parse_infix(left)?;
        }

        Ok(left)
    }

    fn parse_prefix(&mut self) -> Result<Expression, ParseError> {
        match self.peek_kind() {
            TokenKind::Minus | TokenKind::Bang => {
                let token = self.advance();
                let operator = token.literal.clone();
                let right = Box::new(self.parse_expression(Precedence::Prefix)?);
                Ok(Expression::Prefix {
                    token,
                    operator,
                    right,
                })
            }
            TokenKind::If => self.parse_if_expression(),
            TokenKind::Match => self.parse_match_expression(),
            TokenKind::When => self.parse_when_expression(),
            TokenKind::Fn => self.parse_function_literal(),
            TokenKind::LBrace => self.parse_brace_expression(),
            _ => self.parse_primary(),
        }
    }

    fn parse_primary(&mut self) -> Result<Expression, ParseError> {
        match self.peek_kind() {
            TokenKind::Integer => {
                let token = self.advance();
                let value = token.literal.parse::<i64>().map_err(|_| {
                    self.error(format!("invalid integer literal `{}`", token.literal), &token)
                })?;
                Ok(Expression::Integer { token, value })
            }
            TokenKind::Double => {
                let token = self.advance();
                let value = token.literal.parse::<f64>().map_err(|_| {
                    self.error(format!("invalid double literal `{}`", token.literal), &token)
                })?;
                Ok(Expression::Double { token, value })
            }
            TokenKind::True => {
                let token = self.advance();
                Ok(Expression::Boolean { token, value: true })
            }
            TokenKind::False => {
                let token = self.advance();
                Ok(Expression::Boolean {
                    token,
                    value: false,
                })
            }
            TokenKind::String => {
                let token = self.advance();
                let value = token.literal.clone();
                Ok(Expression::String { token, value })
            }
            TokenKind::InterpolatedString => self.parse_interpolated_string(),
            TokenKind::Ident => self.parse_identifier_or_path(),
            TokenKind::LParen => self.parse_grouped_expression(),
            TokenKind::LBracket => self.parse_array_literal(),
            _ => {
                let tok = self.current().clone();
                Err(self.error(
                    format!("unexpected token `{}` ({})", tok.literal, tok.kind),
                    &tok,
                ))
            }
        }
    }

    /// `a.b` in expression position is always a chain of `Member` nodes, never a flat `Path` —
    /// module-qualified access (§4.3 "member access on a Module returns the exposed binding")
    /// and record/method access share the same dotted surface syntax, so the type checker
    /// disambiguates by the left operand's resolved type rather than the parser guessing.
    /// `Expression::Path` stays reserved for non-parsed, host-constructed expressions; surface
    /// `module`/`use` statements build their own `Vec<String>` directly via `parse_dotted_path`.
    fn parse_identifier_or_path(&mut self) -> Result<Expression, ParseError> {
        let token = self.advance();
        let name = token.literal.clone();
        Ok(Expression::Identifier { token, name })
    }

    fn parse_interpolated_string(&mut self) -> Result<Expression, ParseError> {
        let token = self.advance();
        let raw = token.literal.clone();
        let mut parts = vec![];
        let mut literal = String::new();
        let mut chars = raw.chars().peekable();
        while let Some(c) = chars.next() {
            if c == '{' {
                let mut expr_src = String::new();
                let mut depth = 1;
                for c in chars.by_ref() {
                    if c == '{' {
                        depth += 1;
                    } else if c == '}' {
                        depth -= 1;
                        if depth == 0 {
                            break;
                        }
                    }
                    expr_src.push(c);
                }
                if !literal.is_empty() {
                    parts.push(InterpolationPart::Literal(std::mem::take(&mut literal)));
                }
                let sub_tokens = crate::lexer::Lexer::new(&expr_src).lex();
                let expr = match parse_expression_fragment(sub_tokens, &expr_src) {
                    Ok(expr) => expr,
                    Err(e) => return Err(e),
                };
                parts.push(InterpolationPart::Expr(expr));
            } else {
                literal.push(c);
            }
        }
        if !literal.is_empty() || parts.is_empty() {
            parts.push(InterpolationPart::Literal(literal));
        }
        Ok(Expression::InterpolatedString { token, parts })
    }

    fn parse_array_literal(&mut self) -> Result<Expression, ParseError> {
        let token = self.expect(TokenKind::LBracket)?;
        let mut elements = vec![];
        if !self.at(TokenKind::RBracket) {
            elements.push(self.parse_expression(Precedence::Lowest)?);
            while self.at(TokenKind::Comma) {
                self.advance();
                if self.at(TokenKind::RBracket) {
                    break;
                }
                elements.push(self.parse_expression(Precedence::Lowest)?);
            }
        }
        self.expect(TokenKind::RBracket)?;
        Ok(Expression::Array { token, elements })
    }

    /// Grouping per §4.2: empty `()` is the unit tuple, a single expression unwraps, and
    /// comma-separated contents build a tuple literal. Also doubles as the parenthesized
    /// identifier list on the left of a `=>` lambda (handled by the `FatArrow` infix handler).
    fn parse_grouped_expression(&mut self) -> Result<Expression, ParseError> {
        let token = self.expect(TokenKind::LParen)?;
        if self.at(TokenKind::RParen) {
            self.advance();
            return Ok(Expression::Tuple {
                token,
                elements: vec![],
            });
        }
        let mut elements = vec![self.parse_expression(Precedence::Lowest)?];
        let mut is_tuple = false;
        while self.at(TokenKind::Comma) {
            is_tuple = true;
            self.advance();
            if self.at(TokenKind::RParen) {
                break;
            }
            elements.push(self.parse_expression(Precedence::Lowest)?);
        }
        self.expect(TokenKind::RParen)?;
        if is_tuple {
            Ok(Expression::Tuple { token, elements })
        } else {
            Ok(elements.remove(0))
        }
    }

    /// `{` starts either a hash literal (`{k: v, ...}`) or a block. Disambiguated by looking
    /// past the opening brace: an empty `{}` or `{ expr : expr` is a hash, everything else is a
    /// block of statements.
    fn parse_brace_expression(&mut self) -> Result<Expression, ParseError> {
        if self.looks_like_hash_literal() {
            self.parse_hash_literal()
        } else {
            self.parse_block()
        }
    }

    fn looks_like_hash_literal(&self) -> bool {
        debug_assert!(self.at(TokenKind::LBrace));
        if self.tokens.get(self.pos + 1).map(|t| t.kind) == Some(TokenKind::RBrace) {
            return true;
        }
        // crude lookahead: scan forward for a top-level `:` before `;` or a statement keyword.
        let mut depth = 0;
        for tok in self.tokens.iter().skip(self.pos + 1) {
            match tok.kind {
                TokenKind::LBrace | TokenKind::LParen | TokenKind::LBracket => depth += 1,
                TokenKind::RBrace | TokenKind::RParen | TokenKind::RBracket => {
                    if depth == 0 {
                        return false;
                    }
                    depth -= 1;
                }
                TokenKind::Colon if depth == 0 => return true,
                TokenKind::Semicolon if depth == 0 => return false,
                TokenKind::Let | TokenKind::Return if depth == 0 => return false,
                _ => {}
            }
        }
        false
    }

    fn parse_hash_literal(&mut self) -> Result<Expression, ParseError> {
        let token = self.expect(TokenKind::LBrace)?;
        let mut pairs = vec![];
        if !self.at(TokenKind::RBrace) {
            loop {
                let key = self.parse_expression(Precedence::Annotate)?;
                self.expect(TokenKind::Colon)?;
                let value = self.parse_expression(Precedence::Lowest)?;
                pairs.push((key, value));
                if self.at(TokenKind::Comma) {
                    self.advance();
                    if self.at(TokenKind::RBrace) {
                        break;
                    }
                } else {
                    break;
                }
            }
        }
        self.expect(TokenKind::RBrace)?;
        Ok(Expression::Hash { token, pairs })
    }

    fn parse_block(&mut self) -> Result<Expression, ParseError> {
        let token = self.expect(TokenKind::LBrace)?;
        let mut statements = vec![];
        while !self.at(TokenKind::RBrace) && !self.at(TokenKind::Eof) {
            match self.parse_statement() {
                Ok(stmt) => statements.push(stmt),
                Err(e) => {
                    self.errors.push(e);
                    self.synchronize();
                }
            }
        }
        self.expect(TokenKind::RBrace)?;
        Ok(Expression::Block { token, statements })
    }

    fn parse_if_expression(&mut self) -> Result<Expression, ParseError> {
        let token = self.expect(TokenKind::If)?;
        let condition = Box::new(self.parse_expression(Precedence::Annotate)?);
        let consequence = Box::new(self.parse_branch_body()?);
        let alternative = if self.at(TokenKind::Else) {
            self.advance();
            Some(Box::new(self.parse_branch_body()?))
        } else {
            None
        };
        Ok(Expression::If {
            token,
            condition,
            consequence,
            alternative,
        })
    }

    fn parse_branch_body(&mut self) -> Result<Expression, ParseError> {
        if self.at(TokenKind::Colon) {
            self.advance();
            self.parse_expression(Precedence::Lowest)
        } else {
            self.parse_block()
        }
    }

    fn parse_match_expression(&mut self) -> Result<Expression, ParseError> {
        let token = self.expect(TokenKind::Match)?;
        self.expect(TokenKind::LParen)?;
        let mut subjects = vec![self.parse_expression(Precedence::Lowest)?];
        while self.at(TokenKind::Comma) {
            self.advance();
            subjects.push(self.parse_expression(Precedence::Lowest)?);
        }
        self.expect(TokenKind::RParen)?;
        self.expect(TokenKind::LBrace)?;
        let mut arms = vec![];
        while !self.at(TokenKind::RBrace) && !self.at(TokenKind::Eof) {
            let mut patterns = vec![self.parse_pattern()?];
            while self.at(TokenKind::Comma) {
                self.advance();
                patterns.push(self.parse_pattern()?);
            }
            self.expect(TokenKind::FatArrow)?;
            let body = self.parse_expression(Precedence::Lowest)?;
            arms.push(MatchArm { patterns, body });
            if self.at(TokenKind::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        self.expect(TokenKind::RBrace)?;
        Ok(Expression::Match {
            token,
            subjects,
            arms,
        })
    }

    fn parse_when_expression(&mut self) -> Result<Expression, ParseError> {
        let token = self.expect(TokenKind::When)?;
        let subject = if self.at(TokenKind::LParen) {
            self.advance();
            let expr = self.parse_expression(Precedence::Lowest)?;
            self.expect(TokenKind::RParen)?;
            Some(Box::new(expr))
        } else {
            None
        };
        self.expect(TokenKind::LBrace)?;
        let mut arms = vec![];
        let mut otherwise = None;
        while !self.at(TokenKind::RBrace) && !self.at(TokenKind::Eof) {
            if self.at(TokenKind::Pipe) {
                self.advance();
            }
            if self.at(TokenKind::Else) {
                self.advance();
                self.expect(TokenKind::FatArrow)?;
                otherwise = Some(Box::new(self.parse_expression(Precedence::Lowest)?));
            } else {
                let mut patterns = vec![self.parse_expression(Precedence::Annotate)?];
                while self.at(TokenKind::Comma) {
                    self.advance();
                    patterns.push(self.parse_expression(Precedence::Annotate)?);
                }
                self.expect(TokenKind::FatArrow)?;
                let body = self.parse_expression(Precedence::Lowest)?;
                arms.push(WhenArm { patterns, body });
            }
            if self.at(TokenKind::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        let otherwise = otherwise.ok_or_else(|| {
            let tok = self.current().clone();
            self.error("`when` requires an `else` branch", &tok)
        })?;
        self.expect(TokenKind::RBrace)?;
        Ok(Expression::When {
            token,
            subject,
            arms,
            otherwise,
        })
    }

    fn parse_function_literal(&mut self) -> Result<Expression, ParseError> {
        let token = self.expect(TokenKind::Fn)?;
        let name = if self.at(TokenKind::Ident) {
            Some(self.advance().literal)
        } else {
            None
        };
        let type_params = self.parse_type_params()?;
        self.expect(TokenKind::LParen)?;
        let mut params = vec![];
        if !self.at(TokenKind::RParen) {
            params.push(self.parse_param()?);
            while self.at(TokenKind::Comma) {
                self.advance();
                params.push(self.parse_param()?);
            }
        }
        self.expect(TokenKind::RParen)?;
        let return_type = if self.at(TokenKind::Arrow) {
            self.advance();
            Some(self.parse_type_node()?)
        } else {
            None
        };
        let body = Box::new(if self.at(TokenKind::Colon) {
            self.advance();
            self.parse_expression(Precedence::Lowest)?
        } else {
            self.parse_block()?
        });
        Ok(Expression::Function(FunctionLiteral {
            token,
            name,
            type_params,
            params,
            return_type,
            body,
        }))
    }

    fn parse_infix(&mut self, left: Expression) -> Result<Expression, ParseError> {
        let kind = self.peek_kind();
        match kind {
            TokenKind::Plus
            | TokenKind::Minus
            | TokenKind::Star
            | TokenKind::Slash
            | TokenKind::Percent
            | TokenKind::Eq
            | TokenKind::NotEq
            | TokenKind::Lt
            | TokenKind::Gt
            | TokenKind::LtEq
            | TokenKind::GtEq
            | TokenKind::And
            | TokenKind::Or => {
                let token = self.advance();
                let operator = token.literal.clone();
                let prec = precedence_of(kind);
                let right = Box::new(self.parse_expression(prec)?);
                Ok(Expression::Infix {
                    token,
                    operator,
                    left: Box::new(left),
                    right,
                })
            }
            TokenKind::PipeOperator => {
                self.advance();
                let right = self.parse_expression(Precedence::Pipe)?;
                Ok(desugar_pipe(left, right))
            }
            TokenKind::Assign | TokenKind::PlusAssign => {
                let token = self.advance();
                let operator = token.literal.clone();
                // right-associative: allow chained `a = b = c`.
                let right = Box::new(self.parse_expression(Precedence::Pipe)?);
                Ok(Expression::Infix {
                    token,
                    operator,
                    left: Box::new(left),
                    right,
                })
            }
            TokenKind::FatArrow => self.parse_lambda_or_arrow(left),
            TokenKind::LParen => self.parse_call(left),
            TokenKind::LBracket => self.parse_index(left),
            TokenKind::Dot => self.parse_member(left),
            TokenKind::Question => {
                let token = self.advance();
                Ok(Expression::Try {
                    token,
                    value: Box::new(left),
                })
            }
            _ => Ok(left),
        }
    }

    /// `=>` builds a lambda when its left side is an identifier or a parenthesized identifier
    /// list (§4.2); right-associative so `(n) => (x) => x + n` nests correctly.
    fn parse_lambda_or_arrow(&mut self, left: Expression) -> Result<Expression, ParseError> {
        let token = self.expect(TokenKind::FatArrow)?;
        let params = match &left {
            Expression::Identifier { name, .. } => vec![(name.clone(), None)],
            Expression::Tuple { elements, .. } => {
                let mut params = vec![];
                for el in elements {
                    match el {
                        Expression::Identifier { name, .. } => params.push((name.clone(), None)),
                        other => {
                            let tok = other.token().clone();
                            return Err(self.error(
                                "lambda parameter list must contain only identifiers",
                                &tok,
                            ));
                        }
                    }
                }
                params
            }
            other => {
                let tok = other.token().clone();
                return Err(self.error(
                    "left side of `=>` must be an identifier or parenthesized identifier list",
                    &tok,
                ));
            }
        };
        let body = Box::new(self.parse_expression(Precedence::Assign)?);
        Ok(Expression::Function(FunctionLiteral {
            token,
            name: None,
            type_params: vec![],
            params,
            return_type: None,
            body,
        }))
    }

    fn parse_call(&mut self, function: Expression) -> Result<Expression, ParseError> {
        let token = self.expect(TokenKind::LParen)?;
        let mut arguments = vec![];
        if !self.at(TokenKind::RParen) {
            arguments.push(self.parse_expression(Precedence::Lowest)?);
            while self.at(TokenKind::Comma) {
                self.advance();
                arguments.push(self.parse_expression(Precedence::Lowest)?);
            }
        }
        self.expect(TokenKind::RParen)?;
        Ok(Expression::Call {
            token,
            function: Box::new(function),
            arguments,
        })
    }

    fn parse_index(&mut self, left: Expression) -> Result<Expression, ParseError> {
        let token = self.expect(TokenKind::LBracket)?;
        let index = Box::new(self.parse_expression(Precedence::Lowest)?);
        self.expect(TokenKind::RBracket)?;
        Ok(Expression::Index {
            token,
            left: Box::new(left),
            index,
        })
    }

    fn parse_member(&mut self, left: Expression) -> Result<Expression, ParseError> {
        let token = self.expect(TokenKind::Dot)?;
        let property = self.expect(TokenKind::Ident)?.literal;
        Ok(Expression::Member {
            token,
            left: Box::new(left),
            property,
        })
    }
}

/// `x |> f` desugars to `f(x)`; if `f` is itself a call `g(a, b)`, `x` is inserted as its first
/// argument instead of wrapping a nested call (§4.2 "Pipe").
fn desugar_pipe(left: Expression, right: Expression) -> Expression {
    match right {
        Expression::Call {
            token,
            function,
            mut arguments,
        } => {
            arguments.insert(0, left);
            Expression::Call {
                token,
                function,
                arguments,
            }
        }
        other => {
            let token = other.token().clone();
            Expression::Call {
                token,
                function: Box::new(other),
                arguments: vec![left],
            }
        }
    }
}

fn parse_expression_fragment(tokens: Vec<Token>, source: &str) -> Result<Expression, ParseError> {
    let mut parser = Parser::new(tokens, source);
    let expr = parser.parse_expression(Precedence::Lowest)?;
    if let Some(e) = parser.errors.into_iter().next() {
        return Err(e);
    }
    Ok(expr)
}
