//! Compiler toolchain seam
//!
//! Parsing and emission are delegated to an external compiler. The host only
//! sees the [`Toolchain`] trait; [`CcToolchain`] drives the system C compiler.

mod cc;

use std::io::Write;

use thiserror::Error;

use crate::resolve::LibraryRef;
use crate::script::OutputKind;
use crate::syntax::{Diagnostic, SyntaxTree};

pub use cc::{CcToolchain, parse_diagnostics};

/// Everything the toolchain needs to produce an artifact
pub struct EmitInput<'a> {
    pub tree: &'a SyntaxTree,
    pub references: &'a [LibraryRef],
    pub output_kind: OutputKind,
    /// Name the artifact is emitted under
    pub identity: &'a str,
}

#[derive(Debug, Clone)]
pub struct EmitOutput {
    pub success: bool,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Error)]
pub enum ToolchainError {
    #[error("Failed to run compiler `{compiler}`")]
    Spawn {
        compiler: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Toolchain IO error")]
    Io(#[from] std::io::Error),
}

pub trait Toolchain: Send + Sync {
    /// Parse source text into a tree with diagnostics
    fn parse(&self, source: &str, revision: u64) -> Result<SyntaxTree, ToolchainError>;

    /// Compile the tree and write the artifact bytes into `out`.
    ///
    /// Nothing is written to `out` when `success` is false.
    fn emit(&self, input: &EmitInput<'_>, out: &mut dyn Write) -> Result<EmitOutput, ToolchainError>;
}
