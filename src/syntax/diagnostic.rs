use std::fmt;

/// Severity reported by the toolchain
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Note,
    Warning,
    Error,
}

impl Severity {
    /// Map a toolchain severity word ("error", "fatal error", "warning", ...)
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim() {
            "error" | "fatal error" => Some(Severity::Error),
            "warning" => Some(Severity::Warning),
            "note" | "remark" => Some(Severity::Note),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Severity::Note => "note",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

/// Location of a diagnostic in the source text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub line: usize, // 1-based
    pub col: usize,  // 1-based
    /// Byte offset into the parsed text
    pub offset: usize,
}

impl Span {
    /// Build a span from a 1-based line/column, computing the byte offset
    pub fn from_line_col(source: &str, line: usize, col: usize) -> Self {
        let mut offset = 0;
        for (i, l) in source.split_inclusive('\n').enumerate() {
            if i + 1 == line {
                let within = col.saturating_sub(1).min(l.len());
                offset += within;
                return Self { line, col, offset };
            }
            offset += l.len();
        }
        Self {
            line,
            col,
            offset: source.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub span: Option<Span>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
            span: None,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.span {
            Some(span) => write!(
                f,
                "[{}, {}] {}: {}",
                span.line,
                span.col,
                self.severity.name(),
                self.message
            ),
            None => write!(f, "{}: {}", self.severity.name(), self.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_labels() {
        assert_eq!(Severity::from_label("fatal error"), Some(Severity::Error));
        assert_eq!(Severity::from_label(" warning"), Some(Severity::Warning));
        assert_eq!(Severity::from_label("note"), Some(Severity::Note));
        assert_eq!(Severity::from_label("In function"), None);
    }

    #[test]
    fn span_offset() {
        let source = "int a;\nint b\n";
        let span = Span::from_line_col(source, 2, 6);
        assert_eq!(span.offset, 12);
        assert_eq!(&source[span.offset..span.offset + 1], "\n");
    }

    #[test]
    fn span_past_end() {
        let span = Span::from_line_col("x", 9, 1);
        assert_eq!(span.offset, 1);
    }

    #[test]
    fn display() {
        let diag = Diagnostic {
            severity: Severity::Error,
            message: "expected ';'".to_string(),
            span: Some(Span::from_line_col("int b\n", 1, 6)),
        };
        assert_eq!(diag.to_string(), "[1, 6] error: expected ';'");
    }
}
