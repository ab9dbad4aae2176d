//! Output sink for build and run logs
//!
//! [`Console`] is a cheap handle to where lines go (the terminal, or memory
//! in tests). A [`Log`] is one operation's view of it and tracks a running
//! timing.

use std::error::Error;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use crossterm::style::Stylize;

use crate::syntax::{Diagnostic, Severity};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Plain,
    Info,
    Success,
    Failure,
    Muted,
}

#[derive(Debug, Clone)]
enum Sink {
    Stdout,
    Memory(Arc<Mutex<Vec<String>>>),
}

#[derive(Debug, Clone)]
pub struct Console {
    sink: Sink,
}

impl Console {
    pub fn stdout() -> Self {
        Self { sink: Sink::Stdout }
    }

    /// Console that keeps lines in memory
    pub fn memory() -> Self {
        Self {
            sink: Sink::Memory(Arc::new(Mutex::new(Vec::new()))),
        }
    }

    /// Lines written so far (memory consoles only)
    pub fn lines(&self) -> Vec<String> {
        match &self.sink {
            Sink::Memory(lines) => lines.lock().map(|l| l.clone()).unwrap_or_default(),
            Sink::Stdout => Vec::new(),
        }
    }

    pub fn start_log(&self) -> Log {
        Log {
            console: self.clone(),
            timing: None,
        }
    }

    pub fn out(&self, message: impl AsRef<str>) {
        self.write(message.as_ref(), Tone::Plain);
    }

    pub fn write(&self, message: &str, tone: Tone) {
        log::debug!("[console] {}", message);
        match &self.sink {
            Sink::Stdout => {
                for line in message.lines() {
                    match tone {
                        Tone::Plain => println!("{}", line),
                        Tone::Info => println!("{}", line.cyan()),
                        Tone::Success => println!("{}", line.green().bold()),
                        Tone::Failure => println!("{}", line.red().bold()),
                        Tone::Muted => println!("{}", line.dark_grey()),
                    }
                }
            }
            Sink::Memory(lines) => {
                if let Ok(mut lines) = lines.lock() {
                    lines.extend(message.lines().map(str::to_string));
                }
            }
        }
    }
}

/// One operation's log with an optional running timing
pub struct Log {
    console: Console,
    timing: Option<(String, Instant)>,
}

impl Log {
    pub fn console(&self) -> &Console {
        &self.console
    }

    /// Start timing a step, closing any step still running
    pub fn start_timing(&mut self, label: impl Into<String>) {
        if self.timing.is_some() {
            self.end_timing("");
        }
        let label = label.into();
        self.console.write(&format!("{}...", label), Tone::Muted);
        self.timing = Some((label, Instant::now()));
    }

    pub fn end_timing(&mut self, summary: &str) {
        let Some((label, started)) = self.timing.take() else {
            return;
        };
        let elapsed = started.elapsed().as_millis();
        let line = if summary.is_empty() {
            format!("{} done in {} ms", label, elapsed)
        } else {
            format!("{} done in {} ms ({})", label, elapsed, summary)
        };
        self.console.write(&line, Tone::Muted);
    }

    pub fn out(&self, message: impl AsRef<str>) {
        self.console.write(message.as_ref(), Tone::Plain);
    }

    pub fn info(&self, message: impl AsRef<str>) {
        self.console.write(message.as_ref(), Tone::Info);
    }

    pub fn heading(&self, message: impl AsRef<str>, tone: Tone) {
        self.console.write(message.as_ref(), tone);
    }

    /// Report an error with its source chain
    pub fn out_exception(&self, error: &dyn Error, context: &str) {
        log::error!("{}: {}", context, error);
        let mut message = format!("{}: {}", context, error);
        let mut source = error.source();
        while let Some(cause) = source {
            message.push_str(&format!("\n  caused by: {}", cause));
            source = cause.source();
        }
        self.console.write(&message, Tone::Failure);
    }

    pub fn diagnostics(&self, diagnostics: &[Diagnostic]) {
        for diagnostic in diagnostics {
            let tone = match diagnostic.severity {
                Severity::Error => Tone::Failure,
                Severity::Warning => Tone::Info,
                Severity::Note => Tone::Muted,
            };
            self.console.write(&diagnostic.to_string(), tone);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("outer")]
    struct Outer(#[source] std::io::Error);

    #[test]
    fn timing_lines() {
        let console = Console::memory();
        let mut log = console.start_log();
        log.start_timing("Compiling");
        log.start_timing("Loading plugin");
        log.end_timing("3 kB");
        log.end_timing("ignored");

        let lines = console.lines();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "Compiling...");
        assert!(lines[1].starts_with("Compiling done in"));
        assert_eq!(lines[2], "Loading plugin...");
        assert!(lines[3].ends_with("(3 kB)"));
    }

    #[test]
    fn out_exception_includes_causes() {
        let console = Console::memory();
        let log = console.start_log();
        let err = Outer(std::io::Error::new(std::io::ErrorKind::Other, "disk gone"));
        log.out_exception(&err, "Loading Metadata");

        assert_eq!(
            console.lines(),
            vec!["Loading Metadata: outer", "  caused by: disk gone"]
        );
    }

    #[test]
    fn multiline_messages_are_split() {
        let console = Console::memory();
        console.out("a\nb");
        assert_eq!(console.lines(), vec!["a", "b"]);
    }
}
