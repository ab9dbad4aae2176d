//! Artifact emission
//!
//! Places the compiled script next to its source and sidesteps targets that
//! are still held open by picking a randomized alternate name.

mod emitter;

pub use emitter::{
    CompiledArtifact, EmitError, EmitReport, alternate_target, canonical_target, emit, open_target,
};
