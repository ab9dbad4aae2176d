//! On-disk script format
//!
//! A script file is the C source, optionally followed by the metadata block:
//!
//! ```text
//! <source>
//! /*<ScriptMetadata/>
//! { ...json... }
//! */
//! ```
//!
//! Files with the plain `.c` extension hold the source only.

use std::path::Path;

use super::error::ScriptError;
use super::metadata::Metadata;

pub const METADATA_START: &str = "\n/*<ScriptMetadata/>\n";
pub const METADATA_END: &str = "\n*/";

/// Extension of scripts that carry metadata
pub const SCRIPT_EXTENSION: &str = "hc";
/// Extension of plain C files, saved without metadata
pub const SOURCE_EXTENSION: &str = "c";

/// Metadata found in a loaded file
#[derive(Debug)]
pub enum MetadataBlock {
    Present(Metadata),
    Absent,
    Unreadable(ScriptError),
}

#[derive(Debug)]
pub struct ScriptFile {
    pub source: String,
    pub metadata: MetadataBlock,
}

/// Split file contents into source and metadata
pub fn decode(contents: &str) -> ScriptFile {
    let Some((source, rest)) = contents.split_once(METADATA_START) else {
        return ScriptFile {
            source: contents.to_string(),
            metadata: MetadataBlock::Absent,
        };
    };

    let body = rest.trim_end();
    let body = body.strip_suffix(METADATA_END.trim_start()).unwrap_or(body);
    let metadata = match serde_json::from_str::<Metadata>(body) {
        Ok(metadata) => MetadataBlock::Present(metadata),
        Err(e) => MetadataBlock::Unreadable(ScriptError::Metadata(e)),
    };

    ScriptFile {
        source: source.to_string(),
        metadata,
    }
}

/// Render source and metadata into file contents
pub fn encode(source: &str, metadata: &Metadata) -> Result<String, ScriptError> {
    let json = serde_json::to_string_pretty(metadata)?;
    let mut contents =
        String::with_capacity(source.len() + json.len() + METADATA_START.len() + METADATA_END.len());
    contents.push_str(source);
    contents.push_str(METADATA_START);
    contents.push_str(&json);
    contents.push_str(METADATA_END);
    Ok(contents)
}

/// Whether a path is saved as source only
pub fn is_pure_source(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case(SOURCE_EXTENSION))
        .unwrap_or(false)
}

pub async fn read(path: &Path) -> Result<ScriptFile, ScriptError> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ScriptError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(decode(&contents))
}

pub async fn write(path: &Path, source: &str, metadata: &Metadata) -> Result<(), ScriptError> {
    let contents = if is_pure_source(path) {
        source.to_string()
    } else {
        encode(source, metadata)?
    };
    tokio::fs::write(path, contents)
        .await
        .map_err(|source| ScriptError::Write {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::OutputKind;

    fn sample_metadata(lib: &Path) -> Metadata {
        let mut metadata = Metadata {
            output_kind: OutputKind::Process,
            auto_load: false,
            argument: "--name \"a */ b\"\nsecond line".to_string(),
            ..Metadata::default()
        };
        metadata.add_import(lib.to_string_lossy());
        metadata.add_import("/missing/libgone.so");
        metadata
    }

    #[test]
    fn round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let lib = dir.path().join("libfoo.so");
        std::fs::write(&lib, b"").unwrap();

        let source = "#include <stdio.h>\n/* comment */\nint main(void) { return 0; }";
        let metadata = sample_metadata(&lib);

        let contents = encode(source, &metadata).unwrap();
        let file = decode(&contents);
        assert_eq!(file.source, source);
        match file.metadata {
            MetadataBlock::Present(loaded) => assert_eq!(loaded, metadata),
            other => panic!("expected metadata, got {:?}", other),
        }
    }

    #[test]
    fn round_trip_empty_source() {
        let metadata = Metadata::default();
        let file = decode(&encode("", &metadata).unwrap());
        assert_eq!(file.source, "");
        assert!(matches!(file.metadata, MetadataBlock::Present(m) if m == metadata));
    }

    #[test]
    fn no_sentinel_means_absent() {
        let file = decode("int x;\n");
        assert_eq!(file.source, "int x;\n");
        assert!(matches!(file.metadata, MetadataBlock::Absent));
    }

    #[test]
    fn garbage_metadata_is_unreadable() {
        let contents = format!("int x;{}<xml/>{}", METADATA_START, METADATA_END);
        let file = decode(&contents);
        assert_eq!(file.source, "int x;");
        assert!(matches!(file.metadata, MetadataBlock::Unreadable(_)));
    }

    #[test]
    fn trailing_newline_after_closing_sentinel() {
        let metadata = Metadata::default();
        let contents = encode("int x;", &metadata).unwrap() + "\n";
        assert!(matches!(decode(&contents).metadata, MetadataBlock::Present(_)));
    }

    #[test]
    fn pure_source_extension() {
        assert!(is_pure_source(Path::new("a/b.c")));
        assert!(is_pure_source(Path::new("B.C")));
        assert!(!is_pure_source(Path::new("a/b.hc")));
        assert!(!is_pure_source(Path::new("a/b")));
    }

    #[tokio::test]
    async fn write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("script.hc");
        let metadata = Metadata {
            argument: "x".to_string(),
            ..Metadata::default()
        };

        write(&path, "int y;\n", &metadata).await.unwrap();
        let file = read(&path).await.unwrap();
        assert_eq!(file.source, "int y;\n");
        assert!(matches!(file.metadata, MetadataBlock::Present(m) if m == metadata));
    }

    #[tokio::test]
    async fn pure_source_saves_without_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.c");

        write(&path, "int z;\n", &Metadata::default()).await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "int z;\n");
    }

    #[tokio::test]
    async fn read_missing_file() {
        let err = read(Path::new("/definitely/not/here.hc")).await.unwrap_err();
        assert!(matches!(err, ScriptError::Read { .. }));
    }
}
