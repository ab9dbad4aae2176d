use thiserror::Error;

use crate::dispatch::BuildError;
use crate::script::ScriptError;
use crate::toolchain::ToolchainError;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("No file name, use :w <path>")]
    NoFile,

    #[error("Nothing to build")]
    NothingToBuild,

    #[error(transparent)]
    Script(#[from] ScriptError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error("Parsing failed")]
    Parse(#[from] ToolchainError),

    #[error("Failed to create a build directory")]
    Scratch(#[source] std::io::Error),

    #[error("Background task panicked: {0}")]
    Panicked(String),
}
