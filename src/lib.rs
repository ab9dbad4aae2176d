//! Hot-reloading host for C scripts
//!
//! Edits are reparsed in the background after a quiet period. A build
//! resolves the script's library imports, unloads the running plugin,
//! compiles with the system toolchain and loads the new artifact back into
//! the process (or runs it as a child for executables).

pub mod config;
pub mod console;
pub mod dispatch;
pub mod editor;
pub mod emit;
pub mod event;
pub mod host;
pub mod input;
pub mod recovery;
pub mod resolve;
pub mod script;
pub mod session;
pub mod syntax;
pub mod toolchain;
