use std::fmt;
use std::rc::Rc;

use crate::diagnostics::{fmt_diagnostic, Diagnostic, SourcePos};
use crate::lexer::Token;

/// A runtime error (§7 taxon 4): division by zero, non-exhaustive match reached at runtime,
/// unusable-as-hash-key value, or a host-backed function reporting an I/O/parse failure back
/// through `stdlib`.
#[derive(Debug, Clone)]
pub struct RuntimeError {
    pub message: String,
    pub pos: Option<SourcePos>,
    pub source: Option<Rc<str>>,
}

impl RuntimeError {
    pub fn new(message: impl Into<String>, token: &Token, source: Option<Rc<str>>) -> Self {
        Self {
            message: message.into(),
            pos: Some(SourcePos::new(None, token.line, token.column, token.literal.len())),
            source,
        }
    }

    /// Built from a plain `String` raised deep inside a builtin or stdlib call, which has no
    /// token of its own; the caller attaches the call-site token.
    pub fn from_message(message: impl Into<String>, token: &Token, source: Option<Rc<str>>) -> Self {
        Self::new(message, token, source)
    }
}

impl Diagnostic for RuntimeError {
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

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_diagnostic(self, f)
    }
}

impl std::error::Error for RuntimeError {}
