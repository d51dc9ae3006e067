use std::{fmt, rc::Rc};

use crate::diagnostics::{fmt_diagnostic, Diagnostic, SourcePos};
use crate::lexer::Token;

/// A syntactic error (§7 taxon 2). The parser accumulates these and keeps going (§4.2 failure
/// semantics); a program with any is never type-checked or evaluated.
#[derive(Debug, Clone)]
pub struct ParseError {
    pub message: String,
    pub pos: Option<SourcePos>,
    pub source: Option<Rc<str>>,
}

impl ParseError {
    pub fn new(message: impl Into<String>, token: &Token, source: Option<Rc<str>>) -> Self {
        Self {
            message: message.into(),
            pos: Some(SourcePos::new(None, token.line, token.column, token.literal.len())),
            source,
        }
    }

    pub fn eof(item: &str) -> Self {
        Self {
            message: format!("hit EOF while parsing {item}"),
            pos: None,
            source: None,
        }
    }
}

impl Diagnostic for ParseError {
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

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_diagnostic(self, f)
    }
}

impl std::error::Error for ParseError {}
