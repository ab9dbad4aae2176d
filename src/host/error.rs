use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HostError {
    #[error("Failed to load {}", .path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },

    #[error("{} has no `{symbol}` entry point", .path.display())]
    MissingEntryPoint { path: PathBuf, symbol: &'static str },

    #[error("No plugin is loaded")]
    NotLoaded,

    #[error("Argument contains a NUL byte")]
    InvalidArgument(#[from] std::ffi::NulError),

    #[error("Failed to start {}", .path.display())]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed waiting for the process to exit")]
    Wait(#[source] std::io::Error),

    #[error("Plugin call panicked: {0}")]
    Panicked(String),
}

impl From<tokio::task::JoinError> for HostError {
    fn from(e: tokio::task::JoinError) -> Self {
        HostError::Panicked(e.to_string())
    }
}
