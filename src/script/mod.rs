//! Script metadata and the on-disk script format

mod error;
pub mod file;
mod metadata;

pub use error::ScriptError;
pub use file::{MetadataBlock, ScriptFile};
pub use metadata::{Import, Metadata, OutputKind};
