use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::resolve::{self, LibraryRef, LibraryRegistry};

/// A library the script links against.
///
/// Serialized as its bare location; resolution runs whenever an import is
/// created or deserialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Import {
    location: String,
    resolved: Option<LibraryRef>,
    broken: bool,
}

impl Import {
    pub fn new(location: impl Into<String>) -> Self {
        let location = location.into();
        let resolved = resolve::resolve(&location);
        let broken = resolved.is_none();
        Self {
            location,
            resolved,
            broken,
        }
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn resolved(&self) -> Option<&LibraryRef> {
        self.resolved.as_ref()
    }

    pub fn is_broken(&self) -> bool {
        self.broken
    }

    /// Resolve again, e.g. after the library was installed
    pub fn refresh(&mut self) {
        *self = Self::new(std::mem::take(&mut self.location));
    }
}

impl From<String> for Import {
    fn from(location: String) -> Self {
        Self::new(location)
    }
}

impl From<Import> for String {
    fn from(import: Import) -> Self {
        import.location
    }
}

impl fmt::Display for Import {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.location)
    }
}

/// What the script compiles to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    /// Standalone executable, run as a child process
    Process,
    /// Dynamic library, loaded into the host
    #[default]
    Plugin,
}

impl OutputKind {
    /// File extension of the artifact, including the dot (empty for executables on unix)
    pub fn extension(&self) -> &'static str {
        match self {
            OutputKind::Process => std::env::consts::EXE_SUFFIX,
            OutputKind::Plugin => std::env::consts::DLL_SUFFIX,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            OutputKind::Process => "process",
            OutputKind::Plugin => "plugin",
        }
    }
}

impl fmt::Display for OutputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OutputKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "process" | "exe" | "executable" => Ok(OutputKind::Process),
            "plugin" | "lib" | "library" => Ok(OutputKind::Plugin),
            _ => Err(format!("Unknown output kind: {}", s)),
        }
    }
}

/// Build settings stored alongside a script
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Metadata {
    pub imports: Vec<Import>,
    pub output_kind: OutputKind,
    pub auto_load: bool,
    pub argument: String,
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            imports: Vec::new(),
            output_kind: OutputKind::Plugin,
            auto_load: true,
            argument: String::new(),
        }
    }
}

impl Metadata {
    /// Fresh metadata seeded with the registry's base libraries
    pub fn with_defaults(registry: &LibraryRegistry) -> Self {
        Self {
            imports: registry
                .default_locations()
                .into_iter()
                .map(Import::new)
                .collect(),
            ..Self::default()
        }
    }

    pub fn add_import(&mut self, location: impl Into<String>) -> &Import {
        self.imports.push(Import::new(location));
        &self.imports[self.imports.len() - 1]
    }

    pub fn remove_import(&mut self, index: usize) -> Option<Import> {
        if index < self.imports.len() {
            Some(self.imports.remove(index))
        } else {
            None
        }
    }

    pub fn broken_imports(&self) -> Vec<&Import> {
        self.imports.iter().filter(|i| i.is_broken()).collect()
    }

    /// References of every import that resolved
    pub fn references(&self) -> Vec<LibraryRef> {
        self.imports
            .iter()
            .filter_map(|i| i.resolved().cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn import_resolves_on_creation() {
        let dir = tempfile::tempdir().unwrap();
        let lib = dir.path().join("libok.so");
        fs::write(&lib, b"").unwrap();

        let ok = Import::new(lib.to_string_lossy());
        assert!(!ok.is_broken());
        assert!(ok.resolved().is_some());

        let missing = Import::new(dir.path().join("libmissing.so").to_string_lossy());
        assert!(missing.is_broken());
        assert!(missing.resolved().is_none());
    }

    #[test]
    fn refresh_picks_up_new_library() {
        let dir = tempfile::tempdir().unwrap();
        let lib = dir.path().join("liblate.so");
        let mut import = Import::new(lib.to_string_lossy());
        assert!(import.is_broken());

        fs::write(&lib, b"").unwrap();
        import.refresh();
        assert!(!import.is_broken());
        assert_eq!(import.location(), lib.to_string_lossy());
    }

    #[test]
    fn import_serializes_as_location() {
        let import = Import::new("/does/not/exist/libx.so");
        let json = serde_json::to_string(&import).unwrap();
        assert_eq!(json, "\"/does/not/exist/libx.so\"");

        let back: Import = serde_json::from_str(&json).unwrap();
        assert!(back.is_broken());
    }

    #[test]
    fn defaults() {
        let metadata = Metadata::default();
        assert!(metadata.imports.is_empty());
        assert_eq!(metadata.output_kind, OutputKind::Plugin);
        assert!(metadata.auto_load);
        assert!(metadata.argument.is_empty());
    }

    #[test]
    fn missing_fields_use_defaults() {
        let metadata: Metadata = serde_json::from_str(r#"{"output_kind":"process"}"#).unwrap();
        assert_eq!(metadata.output_kind, OutputKind::Process);
        assert!(metadata.auto_load);
    }

    #[test]
    fn broken_imports_and_references() {
        let dir = tempfile::tempdir().unwrap();
        let lib = dir.path().join("libok.so");
        fs::write(&lib, b"").unwrap();

        let mut metadata = Metadata::default();
        metadata.add_import(lib.to_string_lossy());
        metadata.add_import("/nope/a.so");
        metadata.add_import("/nope/b.so");

        let broken: Vec<&str> = metadata
            .broken_imports()
            .iter()
            .map(|i| i.location())
            .collect();
        assert_eq!(broken, vec!["/nope/a.so", "/nope/b.so"]);
        assert_eq!(metadata.references().len(), 1);

        assert_eq!(metadata.remove_import(1).unwrap().location(), "/nope/a.so");
        assert!(metadata.remove_import(5).is_none());
        assert_eq!(metadata.imports.len(), 2);
    }

    #[test]
    fn output_kind_from_str() {
        assert_eq!("Process".parse::<OutputKind>(), Ok(OutputKind::Process));
        assert_eq!("plugin".parse::<OutputKind>(), Ok(OutputKind::Plugin));
        assert!("module".parse::<OutputKind>().is_err());
    }
}
