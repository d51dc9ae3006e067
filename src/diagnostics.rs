//! Shared rendering for the one user-visible failure format used by every error taxon (§7):
//! a red bold header, a `file:line:column` pointer, two lines of context and a caret underline.
//!
//! Grounded on the teacher's `ParseError::fmt` in `parser/mod.rs`, which built this rendering
//! for parse errors only using `colored::Colorize`; here it is factored into one helper shared by
//! lexical, syntactic, semantic, runtime and loader errors alike.

use colored::Colorize;
use std::fmt;

/// A source position an error can be anchored to. `file` is `None` for errors without a
/// filesystem origin (e.g. a REPL line).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePos {
    pub file: Option<String>,
    pub line: usize,
    pub column: usize,
    pub token_len: usize,
}

impl SourcePos {
    pub fn new(file: Option<String>, line: usize, column: usize, token_len: usize) -> Self {
        Self {
            file,
            line,
            column,
            token_len: token_len.max(1),
        }
    }
}

/// Renders `message` against `source` (the full text the position was taken from) in the §7
/// format. When `source` is unavailable only the header and pointer are shown.
pub fn render(message: &str, pos: Option<&SourcePos>, source: Option<&str>) -> String {
    let header = format!("{} {}", "error:".red().bold(), message);

    let Some(pos) = pos else {
        return header;
    };

    let location = match &pos.file {
        Some(file) => format!("{file}:{}:{}", pos.line, pos.column),
        None => format!("{}:{}", pos.line, pos.column),
    };

    let Some(source) = source else {
        return format!("{header}\n  --> {location}");
    };

    let lines: Vec<&str> = source.lines().collect();
    let line_idx = pos.line.saturating_sub(1);
    let current_line = lines.get(line_idx).copied().unwrap_or("");
    let prev_line = if pos.line > 1 {
        lines.get(line_idx - 1).copied().unwrap_or("")
    } else {
        ""
    };

    let margin = format!("{}", pos.line).len();
    let fill = " ".repeat(margin);
    let pad = " ".repeat(pos.column.saturating_sub(1));
    let caret = "^".repeat(pos.token_len).red();

    format!(
        "{header}\n  --> {location}\n{fill} |{prev_line}\n{line} |{current_line}\n{fill} |{pad}{caret}",
        line = pos.line,
    )
}

/// Implemented by every error taxon's type so formatting stays in one place.
pub trait Diagnostic {
    fn message(&self) -> &str;
    fn position(&self) -> Option<&SourcePos>;
    fn source(&self) -> Option<&str>;
}

pub fn fmt_diagnostic(d: &impl Diagnostic, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", render(d.message(), d.position(), d.source()))
}
