use std::fs;
use std::path::{Path, PathBuf};

/// A library the toolchain can link against
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LibraryRef {
    path: PathBuf,
}

impl LibraryRef {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Resolve an import location to a library reference.
///
/// Existing files resolve directly. Missing ones go through
/// [`versioned_fallback`] once; `None` means the import is broken.
pub fn resolve(location: &str) -> Option<LibraryRef> {
    let path = Path::new(location);
    if let Some(found) = resolve_existing(path) {
        return Some(found);
    }

    let candidate = versioned_fallback(path)?;
    let found = resolve_existing(&candidate)?;
    log::debug!(
        "[resolve] {} not found, using {}",
        location,
        found.path.display()
    );
    Some(found)
}

fn resolve_existing(path: &Path) -> Option<LibraryRef> {
    if !path.is_file() {
        return None;
    }
    let path = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    Some(LibraryRef { path })
}

/// Substitute the version folder of a missing path.
///
/// `location` is read as `<parent>/<version>/<suffix>`. The replacement
/// version is the subdirectory of `<parent>` whose name is greatest by plain
/// string comparison, so "2.0" wins over "10.0".
pub fn versioned_fallback(location: &Path) -> Option<PathBuf> {
    let suffix = location.file_name()?;
    let parent = location.parent()?.parent()?;
    if parent.as_os_str().is_empty() || !parent.is_dir() {
        return None;
    }

    let newest = fs::read_dir(parent)
        .ok()?
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .filter_map(|e| e.file_name().into_string().ok())
        .max()?;

    Some(parent.join(newest).join(suffix))
}
