//! Build-and-run sequencing
//!
//! A build validates imports, unloads the in-process plugin so its file can
//! be rewritten, emits the artifact, and on success hands it to the host
//! matching the output kind.

mod dispatcher;

pub use dispatcher::{BuildError, BuildReport, BuildRequest, Dispatcher};
