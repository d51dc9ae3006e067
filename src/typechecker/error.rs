use std::{fmt, rc::Rc};

use crate::diagnostics::{fmt_diagnostic, Diagnostic, SourcePos};
use crate::lexer::Token;

/// A semantic error (§7 taxon 3): unknown identifier, type mismatch, arity mismatch,
/// non-exhaustive match, missing trait method, method signature mismatch, unusable-as-hash-key,
/// immutable assignment, malformed `?` context.
#[derive(Debug, Clone)]
pub struct TypeError {
    pub message: String,
    pub pos: Option<SourcePos>,
    pub source: Option<Rc<str>>,
}

impl TypeError {
    pub fn new(message: impl Into<String>, token: &Token, source: Option<Rc<str>>) -> Self {
        Self {
            message: message.into(),
            pos: Some(SourcePos::new(None, token.line, token.column, token.literal.len())),
            source,
        }
    }
}

impl Diagnostic for TypeError {
    fn message(&self) -> &str {
        &self.message
    }

    fn position(&self) -> Option<&SourcePos> {
        self.pos.as_ref()
    }

    fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_diagnostic(self, f)
    }
}

impl std::error::Error for TypeError {}
