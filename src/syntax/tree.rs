use std::sync::Arc;

use super::diagnostic::Diagnostic;
use super::format;

/// Snapshot of the source produced by one parse.
///
/// The toolchain treats the text itself as its syntax tree; this type only
/// guarantees that text and diagnostics belong to the same point in time.
/// It is never mutated, a reparse replaces it.
#[derive(Debug, Clone)]
pub struct SyntaxTree {
    source: Arc<str>,
    diagnostics: Arc<[Diagnostic]>,
    revision: u64,
}

impl SyntaxTree {
    pub fn new(source: impl Into<Arc<str>>, diagnostics: Vec<Diagnostic>, revision: u64) -> Self {
        Self {
            source: source.into(),
            diagnostics: diagnostics.into(),
            revision,
        }
    }

    /// Tree of an empty buffer
    pub fn empty() -> Self {
        Self::new("", Vec::new(), 0)
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Buffer revision this tree was parsed from
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    /// Canonical whitespace-normalized rendering of the source
    pub fn normalize_whitespace(&self, tab_width: usize) -> String {
        format::normalize_whitespace(&self.source, tab_width)
    }
}

impl Default for SyntaxTree {
    fn default() -> Self {
        Self::empty()
    }
}
