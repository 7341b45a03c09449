//! Compiler diagnostics.
//!
//! The frontend is fail-fast: the first error aborts the build and is
//! surfaced to the caller as a single [`CompilerError`] carrying the exact
//! source row and column. There is no recovery and no partial output.

use crate::source::SourceLoc;
use thiserror::Error;

/// Broad classification of a diagnostic, mirroring the phase that raised it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed escape sequence, bad literal, unknown directive.
    Lexical,
    /// Unexpected or missing token, structural misuse.
    Syntax,
    /// Type errors, name errors, lvalue violations.
    Semantic,
}

/// A located, user-facing diagnostic. Raising one aborts the build.
#[derive(Debug, Clone, Error)]
#[error("{message} at {loc}")]
pub struct CompilerError {
    pub kind: ErrorKind,
    pub message: String,
    pub loc: SourceLoc,
}

impl CompilerError {
    pub fn lexical(message: impl Into<String>, loc: SourceLoc) -> Self {
        Self {
            kind: ErrorKind::Lexical,
            message: message.into(),
            loc,
        }
    }

    pub fn syntax(message: impl Into<String>, loc: SourceLoc) -> Self {
        Self {
            kind: ErrorKind::Syntax,
            message: message.into(),
            loc,
        }
    }

    pub fn semantic(message: impl Into<String>, loc: SourceLoc) -> Self {
        Self {
            kind: ErrorKind::Semantic,
            message: message.into(),
            loc,
        }
    }

    /// Render the diagnostic against the source lines it came from, with a
    /// caret under the offending column.
    pub fn render(&self, lines: &[&str]) -> String {
        let mut out = format!("error: {} at {}", self.message, self.loc);
        let row = self.loc.row as usize;
        if row >= 1 && row <= lines.len() {
            let line = lines[row - 1];
            out.push('\n');
            out.push_str(line);
            out.push('\n');
            let col = (self.loc.column as usize).saturating_sub(1);
            for ch in line.chars().take(col) {
                out.push(if ch == '\t' { '\t' } else { ' ' });
            }
            out.push('^');
        }
        out
    }
}

/// Result alias used by every frontend phase.
pub type CResult<T> = Result<T, CompilerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_points_at_column() {
        let err = CompilerError::syntax("Expected \";\"", SourceLoc::new(2, 7));
        let src = "int a;\nint b:3;\n";
        let lines: Vec<&str> = src.lines().collect();
        let rendered = err.render(&lines);
        assert!(rendered.contains("Expected \";\" at 2:7"));
        assert!(rendered.ends_with("      ^"));
    }

    #[test]
    fn render_out_of_range_row() {
        let err = CompilerError::semantic("Wrong tag kind", SourceLoc::new(99, 1));
        assert_eq!(err.render(&["one line"]), "error: Wrong tag kind at 99:1");
    }
}
