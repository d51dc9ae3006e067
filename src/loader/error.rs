use std::error::Error;
use std::fmt;

/// Every failure the loader can raise that isn't already a [`crate::parser::ParseError`],
/// [`crate::typechecker::TypeError`] or [`crate::evaluator::RuntimeError`] from a loaded module's
/// own body — grounded on the teacher's `loader::loaderror::FileLoadError`/`ImportError`, which
/// played the same "loader-specific, not-a-language-error" role.
#[derive(Debug)]
pub struct LoadError {
    pub message: String,
}

impl LoadError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "error: {}", self.message)
    }
}

impl Error for LoadError {}
