//! Parsed snapshots of the script and the debounced reparse loop
//!
//! Parsing itself is delegated to the toolchain; this module holds the
//! immutable [`SyntaxTree`] it produces, its diagnostics, whitespace
//! normalization for `format`, and the quiet-period [`Reparser`].

mod diagnostic;
mod format;
mod reparser;
mod tree;

pub use diagnostic::{Diagnostic, Severity, Span};
pub use format::normalize_whitespace;
pub use reparser::Reparser;
pub use tree::SyntaxTree;
