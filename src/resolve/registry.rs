//! Static registry of well-known libraries seeded into new scripts

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Identifier and candidate locations of a base runtime library
struct KnownLibrary {
    id: &'static str,
    candidates: &'static [&'static str],
}

const KNOWN_LIBRARIES: &[KnownLibrary] = &[
    KnownLibrary {
        id: "libc",
        candidates: &[
            "/lib/x86_64-linux-gnu/libc.so.6",
            "/usr/lib/x86_64-linux-gnu/libc.so.6",
            "/lib/aarch64-linux-gnu/libc.so.6",
            "/usr/lib/aarch64-linux-gnu/libc.so.6",
            "/usr/lib64/libc.so.6",
            "/usr/lib/libc.so.6",
            "/usr/lib/libSystem.B.dylib",
        ],
    },
    KnownLibrary {
        id: "libm",
        candidates: &[
            "/lib/x86_64-linux-gnu/libm.so.6",
            "/usr/lib/x86_64-linux-gnu/libm.so.6",
            "/lib/aarch64-linux-gnu/libm.so.6",
            "/usr/lib/aarch64-linux-gnu/libm.so.6",
            "/usr/lib64/libm.so.6",
            "/usr/lib/libm.so.6",
        ],
    },
    KnownLibrary {
        id: "libpthread",
        candidates: &[
            "/lib/x86_64-linux-gnu/libpthread.so.0",
            "/usr/lib/x86_64-linux-gnu/libpthread.so.0",
            "/lib/aarch64-linux-gnu/libpthread.so.0",
            "/usr/lib/aarch64-linux-gnu/libpthread.so.0",
            "/usr/lib64/libpthread.so.0",
            "/usr/lib/libpthread.so.0",
        ],
    },
    KnownLibrary {
        id: "libdl",
        candidates: &[
            "/lib/x86_64-linux-gnu/libdl.so.2",
            "/usr/lib/x86_64-linux-gnu/libdl.so.2",
            "/lib/aarch64-linux-gnu/libdl.so.2",
            "/usr/lib/aarch64-linux-gnu/libdl.so.2",
            "/usr/lib64/libdl.so.2",
            "/usr/lib/libdl.so.2",
        ],
    },
];

/// Library identifiers and the locations new scripts import them from
#[derive(Debug, Clone, Default)]
pub struct LibraryRegistry {
    overrides: BTreeMap<String, PathBuf>,
}

impl LibraryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with configured locations taking precedence over the built-in candidates
    pub fn with_overrides(overrides: BTreeMap<String, PathBuf>) -> Self {
        Self { overrides }
    }

    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = KNOWN_LIBRARIES.iter().map(|l| l.id.to_string()).collect();
        for id in self.overrides.keys() {
            if !ids.contains(id) {
                ids.push(id.clone());
            }
        }
        ids
    }

    /// Location for an identifier, if one is configured or present on this system
    pub fn locate(&self, id: &str) -> Option<PathBuf> {
        if let Some(path) = self.overrides.get(id) {
            return Some(path.clone());
        }
        KNOWN_LIBRARIES
            .iter()
            .find(|l| l.id == id)?
            .candidates
            .iter()
            .map(Path::new)
            .find(|p| p.is_file())
            .map(Path::to_path_buf)
    }

    /// Locations seeded into a fresh script's imports
    pub fn default_locations(&self) -> Vec<String> {
        self.ids()
            .into_iter()
            .filter_map(|id| match self.locate(&id) {
                Some(path) => Some(path.to_string_lossy().into_owned()),
                None => {
                    log::debug!("[registry] {} not present on this system", id);
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_wins_and_is_listed() {
        let mut overrides = BTreeMap::new();
        overrides.insert("libc".to_string(), PathBuf::from("/custom/libc.so"));
        overrides.insert("libfoo".to_string(), PathBuf::from("/opt/libfoo.so"));
        let registry = LibraryRegistry::with_overrides(overrides);

        assert_eq!(registry.locate("libc"), Some(PathBuf::from("/custom/libc.so")));
        assert!(registry.ids().contains(&"libfoo".to_string()));
        assert_eq!(registry.ids().iter().filter(|id| *id == "libc").count(), 1);
    }

    #[test]
    fn default_locations_skip_missing_libraries() {
        let registry = LibraryRegistry::new();
        for location in registry.default_locations() {
            assert!(Path::new(&location).is_file());
        }
    }

    #[test]
    fn unknown_id_is_not_located() {
        assert_eq!(LibraryRegistry::new().locate("libnothing"), None);
    }
}
