//! Execution hosts for compiled artifacts
//!
//! A plugin artifact is mapped into this process and can be swapped after
//! every build. A process artifact runs as a child that the host waits on.

mod error;
mod in_process;
mod loader;
mod out_of_process;

use std::fmt;
use std::path::PathBuf;

pub use error::HostError;
pub use in_process::InProcessHost;
pub use loader::{DylibLoader, EXECUTE_SYMBOL, ModuleLoader, PluginModule, SETUP_SYMBOL};
pub use out_of_process::{OutOfProcessHost, split_arguments};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HostState {
    #[default]
    Unloaded,
    Loaded,
    Running,
}

impl fmt::Display for HostState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HostState::Unloaded => "unloaded",
            HostState::Loaded => "loaded",
            HostState::Running => "running",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostKind {
    InProcess,
    OutOfProcess,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRequest {
    pub artifact: PathBuf,
    pub argument: String,
}

/// The host for the current artifact
pub enum Host {
    InProcess(InProcessHost),
    OutOfProcess(OutOfProcessHost),
}

impl Host {
    pub fn kind(&self) -> HostKind {
        match self {
            Host::InProcess(_) => HostKind::InProcess,
            Host::OutOfProcess(_) => HostKind::OutOfProcess,
        }
    }

    pub fn state(&self) -> HostState {
        match self {
            Host::InProcess(host) => host.state(),
            Host::OutOfProcess(host) => host.state(),
        }
    }

    pub async fn unload(&mut self) {
        match self {
            Host::InProcess(host) => host.unload().await,
            Host::OutOfProcess(host) => host.unload().await,
        }
    }
}
