//! Library reference resolution
//!
//! Turns import locations into references the toolchain can link against.
//! Missing locations get one versioned-directory fallback before the import
//! is considered broken.

mod registry;
mod resolver;

pub use registry::LibraryRegistry;
pub use resolver::{LibraryRef, resolve, versioned_fallback};
