//! System C compiler driver
//!
//! Invokes `cc` (or the configured compiler) on a scratch copy of the
//! source. Parsing uses `-fsyntax-only`; emission builds an executable or a
//! shared library and copies it into the caller's output.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use super::{EmitInput, EmitOutput, Toolchain, ToolchainError};
use crate::config::Settings;
use crate::script::OutputKind;
use crate::syntax::{Diagnostic, Severity, Span, SyntaxTree};

const SOURCE_NAME: &str = "script.c";

pub struct CcToolchain {
    compiler: String,
    cflags: Vec<String>,
}

impl CcToolchain {
    pub fn new(compiler: impl Into<String>, cflags: Vec<String>) -> Self {
        Self {
            compiler: compiler.into(),
            cflags,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.compiler.clone(), settings.cflags.clone())
    }

    pub fn compiler(&self) -> &str {
        &self.compiler
    }

    /// Check if the compiler can be run at all
    pub fn is_available(&self) -> bool {
        Command::new(&self.compiler)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    /// Write the source into a fresh scratch directory
    fn scratch(&self, source: &str) -> Result<(tempfile::TempDir, PathBuf), ToolchainError> {
        let dir = tempfile::Builder::new().prefix("scripter-").tempdir()?;
        let path = dir.path().join(SOURCE_NAME);
        std::fs::write(&path, source)?;
        Ok((dir, path))
    }

    fn run(&self, command: &mut Command) -> Result<Output, ToolchainError> {
        log::debug!("[toolchain] {:?}", command);
        command
            .stdin(Stdio::null())
            .output()
            .map_err(|source| ToolchainError::Spawn {
                compiler: self.compiler.clone(),
                source,
            })
    }

    fn emit_args(&self, input: &EmitInput<'_>, source: &Path, output: &Path) -> Vec<String> {
        let mut args: Vec<String> = self.cflags.clone();
        args.push(format!("-DSCRIPTER_ARTIFACT=\"{}\"", input.identity));

        if input.output_kind == OutputKind::Plugin {
            args.push("-shared".to_string());
            args.push("-fPIC".to_string());
            let library_name = format!("{}{}", input.identity, input.output_kind.extension());
            #[cfg(target_os = "macos")]
            args.push(format!("-Wl,-install_name,{}", library_name));
            #[cfg(not(target_os = "macos"))]
            args.push(format!("-Wl,-soname,{}", library_name));
        }

        args.push("-x".to_string());
        args.push("c".to_string());
        args.push(source.to_string_lossy().into_owned());

        // Libraries are linker inputs, not C
        args.push("-x".to_string());
        args.push("none".to_string());
        for reference in input.references {
            args.push(reference.path().to_string_lossy().into_owned());
        }

        args.push("-o".to_string());
        args.push(output.to_string_lossy().into_owned());
        args
    }
}

impl Toolchain for CcToolchain {
    fn parse(&self, source: &str, revision: u64) -> Result<SyntaxTree, ToolchainError> {
        let (_dir, path) = self.scratch(source)?;

        let output = self.run(
            Command::new(&self.compiler)
                .args(&self.cflags)
                .args(["-fsyntax-only", "-x", "c"])
                .arg(&path),
        )?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        let mut diagnostics = parse_diagnostics(&stderr, &path.to_string_lossy(), source);
        if !output.status.success() && !diagnostics.iter().any(Diagnostic::is_error) {
            diagnostics.push(unattributed_failure(&stderr));
        }

        Ok(SyntaxTree::new(source, diagnostics, revision))
    }

    fn emit(&self, input: &EmitInput<'_>, out: &mut dyn Write) -> Result<EmitOutput, ToolchainError> {
        let source = input.tree.source();
        let (dir, path) = self.scratch(source)?;
        let artifact = dir
            .path()
            .join(format!("{}{}", input.identity, input.output_kind.extension()));

        let output = self.run(Command::new(&self.compiler).args(self.emit_args(input, &path, &artifact)))?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        let mut diagnostics = parse_diagnostics(&stderr, &path.to_string_lossy(), source);
        let success = output.status.success() && artifact.is_file();
        if !success && !diagnostics.iter().any(Diagnostic::is_error) {
            diagnostics.push(unattributed_failure(&stderr));
        }

        if success {
            let bytes = std::fs::read(&artifact)?;
            out.write_all(&bytes)?;
            out.flush()?;
        }

        Ok(EmitOutput {
            success,
            diagnostics,
        })
    }
}

/// Error for a failed run whose output names no source location (e.g. linker errors)
fn unattributed_failure(stderr: &str) -> Diagnostic {
    let message = stderr.trim();
    if message.is_empty() {
        Diagnostic::error("Compiler failed without output")
    } else {
        Diagnostic::error(message)
    }
}

/// Parse `file:line[:col]: severity: message` lines for the given file
pub fn parse_diagnostics(stderr: &str, file_label: &str, source: &str) -> Vec<Diagnostic> {
    stderr
        .lines()
        .filter_map(|line| parse_diagnostic_line(line, file_label, source))
        .collect()
}

fn parse_diagnostic_line(line: &str, file_label: &str, source: &str) -> Option<Diagnostic> {
    let rest = line.strip_prefix(file_label)?.strip_prefix(':')?;

    let (line_str, rest) = rest.split_once(':')?;
    let line_no: usize = line_str.trim().parse().ok()?;

    // Column is optional
    let (col, rest) = match rest.split_once(':') {
        Some((col_str, after)) => match col_str.trim().parse::<usize>() {
            Ok(col) => (col, after),
            Err(_) => (1, rest),
        },
        None => (1, rest),
    };

    let (label, message) = rest.split_once(':')?;
    let severity = Severity::from_label(label)?;

    Some(Diagnostic {
        severity,
        message: message.trim().to_string(),
        span: Some(Span::from_line_col(source, line_no, col)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const LABEL: &str = "/tmp/scripter-x/script.c";

    #[test]
    fn parse_gcc_diagnostics() {
        let source = "int main(void) {\n  return 0\n}\n";
        let stderr = "\
/tmp/scripter-x/script.c: In function 'main':
/tmp/scripter-x/script.c:2:11: error: expected ';' before '}' token
    2 |   return 0
      |           ^
/tmp/scripter-x/script.c:1:5: warning: unused thing [-Wunused]
";
        let diags = parse_diagnostics(stderr, LABEL, source);
        assert_eq!(diags.len(), 2);

        assert_eq!(diags[0].severity, Severity::Error);
        assert_eq!(diags[0].message, "expected ';' before '}' token");
        let span = diags[0].span.unwrap();
        assert_eq!((span.line, span.col), (2, 11));

        assert_eq!(diags[1].severity, Severity::Warning);
    }

    #[test]
    fn parse_clang_fatal_error() {
        let stderr = "/tmp/scripter-x/script.c:1:10: fatal error: 'nope.h' file not found\n";
        let diags = parse_diagnostics(stderr, LABEL, "#include \"nope.h\"\n");
        assert_eq!(diags.len(), 1);
        assert!(diags[0].is_error());
    }

    #[test]
    fn parse_line_without_column() {
        let stderr = "/tmp/scripter-x/script.c:3: error: something odd\n";
        let diags = parse_diagnostics(stderr, LABEL, "a\nb\nc\n");
        assert_eq!(diags.len(), 1);
        let span = diags[0].span.unwrap();
        assert_eq!((span.line, span.col), (3, 1));
        assert_eq!(diags[0].message, "something odd");
    }

    #[test]
    fn other_files_are_ignored() {
        let stderr = "/usr/include/stdio.h:12:1: note: declared here\n/usr/bin/ld: cannot find -lfoo\n";
        assert!(parse_diagnostics(stderr, LABEL, "").is_empty());
    }

    #[test]
    fn unattributed_failure_keeps_linker_output() {
        let diag = unattributed_failure("/usr/bin/ld: undefined reference to `foo'\n");
        assert!(diag.is_error());
        assert!(diag.message.contains("undefined reference"));
        assert!(diag.span.is_none());
    }

    #[test]
    fn plugin_args_put_libraries_after_reset() {
        let toolchain = CcToolchain::new("cc", vec!["-O2".to_string()]);
        let tree = SyntaxTree::new("int x;", Vec::new(), 0);
        let input = EmitInput {
            tree: &tree,
            references: &[],
            output_kind: OutputKind::Plugin,
            identity: "hello",
        };
        let args = toolchain.emit_args(&input, Path::new("/s/script.c"), Path::new("/s/out.so"));

        assert_eq!(args[0], "-O2");
        assert!(args.contains(&"-shared".to_string()));
        let reset = args.iter().position(|a| a == "none").unwrap();
        let source = args.iter().position(|a| a == "/s/script.c").unwrap();
        assert!(source < reset);
        assert_eq!(&args[args.len() - 2..], &["-o".to_string(), "/s/out.so".to_string()]);
    }

    #[test]
    fn real_compiler_reports_syntax_error() {
        let toolchain = CcToolchain::new("cc", Vec::new());
        if !toolchain.is_available() {
            // No C compiler on this machine
            return;
        }

        let tree = toolchain.parse("int main(void) { return 0 }\n", 7).unwrap();
        assert!(tree.has_errors());
        assert_eq!(tree.revision(), 7);

        let tree = toolchain.parse("int main(void) { return 0; }\n", 8).unwrap();
        assert!(!tree.has_errors());
    }
}
