use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::resolve::LibraryRef;
use crate::script::OutputKind;
use crate::syntax::{Diagnostic, SyntaxTree};
use crate::toolchain::{EmitInput, Toolchain, ToolchainError};

/// The emitted binary and the name it was emitted under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledArtifact {
    pub path: PathBuf,
    pub identity: String,
}

#[derive(Debug, Clone)]
pub struct EmitReport {
    pub artifact: CompiledArtifact,
    pub success: bool,
    pub diagnostics: Vec<Diagnostic>,
    /// The canonical path could not be opened and an alternate name was used
    pub fell_back: bool,
}

#[derive(Debug, Error)]
pub enum EmitError {
    #[error("Failed to open {} for writing", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Toolchain(#[from] ToolchainError),
}

/// Canonical artifact location: next to the source, named after it
pub fn canonical_target(source_path: &Path, kind: OutputKind) -> CompiledArtifact {
    let stem = source_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "script".to_string());
    let identity: String = stem.chars().filter(|c| !c.is_whitespace()).collect();

    CompiledArtifact {
        path: artifact_dir(source_path).join(format!("{}{}", stem, kind.extension())),
        identity,
    }
}

/// Randomized stand-in used when the canonical target is held open
pub fn alternate_target(source_path: &Path, kind: OutputKind) -> CompiledArtifact {
    let identity = format!("z{}", rand::random::<u32>());
    CompiledArtifact {
        path: artifact_dir(source_path).join(format!("{}{}", identity, kind.extension())),
        identity,
    }
}

fn artifact_dir(source_path: &Path) -> PathBuf {
    match source_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn open_for_write(path: &Path) -> io::Result<File> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}

/// Open the canonical target, falling back to an alternate name if it is locked
pub fn open_target(
    source_path: &Path,
    kind: OutputKind,
) -> Result<(CompiledArtifact, File, bool), EmitError> {
    let canonical = canonical_target(source_path, kind);
    match open_for_write(&canonical.path) {
        Ok(file) => Ok((canonical, file, false)),
        Err(e) => {
            let alternate = alternate_target(source_path, kind);
            log::info!(
                "[emit] {} could not be opened ({}), emitting to {}",
                canonical.path.display(),
                e,
                alternate.path.display()
            );
            let file = open_for_write(&alternate.path).map_err(|source| EmitError::Open {
                path: alternate.path.clone(),
                source,
            })?;
            Ok((alternate, file, true))
        }
    }
}

/// Compile `tree` into an artifact next to `source_path`.
///
/// Diagnostics are returned whether or not the build succeeded. Blocking;
/// callers on the async side run it on the blocking pool.
pub fn emit(
    toolchain: &dyn Toolchain,
    source_path: &Path,
    tree: &SyntaxTree,
    references: &[LibraryRef],
    kind: OutputKind,
) -> Result<EmitReport, EmitError> {
    let (artifact, mut file, fell_back) = open_target(source_path, kind)?;

    let input = EmitInput {
        tree,
        references,
        output_kind: kind,
        identity: &artifact.identity,
    };
    let output = toolchain.emit(&input, &mut file);
    drop(file);

    let output = match output {
        Ok(output) => output,
        Err(e) => {
            let _ = fs::remove_file(&artifact.path);
            return Err(e.into());
        }
    };

    if output.success {
        #[cfg(unix)]
        if kind == OutputKind::Process {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&artifact.path, fs::Permissions::from_mode(0o755)).map_err(
                |source| EmitError::Open {
                    path: artifact.path.clone(),
                    source,
                },
            )?;
        }
    } else {
        // Don't leave an empty artifact behind
        let _ = fs::remove_file(&artifact.path);
    }

    Ok(EmitReport {
        artifact,
        success: output.success,
        diagnostics: output.diagnostics,
        fell_back,
    })
}
