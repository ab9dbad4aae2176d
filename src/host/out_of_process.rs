use std::process::Stdio;

use tokio::process::{Child, Command};

use super::{ExecutionRequest, HostError, HostKind, HostState};
use crate::console::{Log, Tone};
use crate::event::{Event, Notifier};

/// Runs a process artifact as a child and waits for it
pub struct OutOfProcessHost {
    child: Option<Child>,
    exit_code: Option<i32>,
    state: HostState,
    events: Notifier,
}

impl OutOfProcessHost {
    pub fn new(events: Notifier) -> Self {
        Self {
            child: None,
            exit_code: None,
            state: HostState::Unloaded,
            events,
        }
    }

    pub fn state(&self) -> HostState {
        self.state
    }

    /// Exit code of the last child that exited normally
    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    fn set_state(&mut self, to: HostState) {
        if self.state != to {
            let from = self.state;
            self.state = to;
            self.events.send(Event::HostStateChanged {
                host: HostKind::OutOfProcess,
                from,
                to,
            });
        }
    }

    /// Spawn the artifact with the split argument string
    pub fn start(&mut self, request: &ExecutionRequest) -> Result<(), HostError> {
        let child = Command::new(&request.artifact)
            .args(split_arguments(&request.argument))
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| HostError::Spawn {
                path: request.artifact.clone(),
                source,
            })?;
        self.child = Some(child);
        self.set_state(HostState::Running);
        Ok(())
    }

    /// Wait for the child; `None` exit code means it was killed by a signal
    pub async fn wait(&mut self) -> Result<Option<i32>, HostError> {
        let Some(child) = self.child.as_mut() else {
            return Err(HostError::NotLoaded);
        };
        let status = child.wait().await.map_err(HostError::Wait);
        self.child = None;
        self.set_state(HostState::Unloaded);
        self.exit_code = status?.code();
        Ok(self.exit_code)
    }

    /// Kill a child that is still running
    pub async fn unload(&mut self) {
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.kill().await {
                log::warn!("[host] failed to kill child process: {}", e);
            }
        }
        self.set_state(HostState::Unloaded);
    }

    pub async fn run(&mut self, request: ExecutionRequest, log: &mut Log) -> Option<i32> {
        let name = request
            .artifact
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        log.start_timing(format!("Running {}", name));
        if let Err(e) = self.start(&request) {
            log.end_timing("");
            log.out_exception(&e, "Starting process");
            return None;
        }

        let result = self.wait().await;
        log.end_timing("");
        match result {
            Ok(Some(code)) => {
                let tone = if code == 0 { Tone::Plain } else { Tone::Failure };
                log.heading(format!("Exited with code {}", code), tone);
                Some(code)
            }
            Ok(None) => {
                log.heading("Process was terminated", Tone::Failure);
                None
            }
            Err(e) => {
                log.out_exception(&e, "Running process");
                None
            }
        }
    }
}

/// Split on whitespace; double quotes group words and are removed
pub fn split_arguments(argument: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut pending = false;

    for c in argument.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                pending = true;
            }
            c if c.is_whitespace() && !quoted => {
                if pending {
                    args.push(std::mem::take(&mut current));
                    pending = false;
                }
            }
            c => {
                current.push(c);
                pending = true;
            }
        }
    }
    if pending {
        args.push(current);
    }
    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::Console;
    use crate::host::testing::collect_states;
    use std::path::PathBuf;

    #[test]
    fn quotes_group_words_in_arguments() {
        assert_eq!(split_arguments(""), Vec::<String>::new());
        assert_eq!(split_arguments("  a  b "), vec!["a", "b"]);
        assert_eq!(
            split_arguments(r#"--name "two words" x"#),
            vec!["--name", "two words", "x"]
        );
        assert_eq!(split_arguments(r#""""#), vec![""]);
    }

    #[cfg(unix)]
    fn script(dir: &std::path::Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("child.sh");
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn run_reports_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let path = script(dir.path(), "exit 3");
        let (events, mut rx) = Notifier::channel();
        let mut host = OutOfProcessHost::new(events);
        let console = Console::memory();
        let mut log = console.start_log();

        let code = host
            .run(
                ExecutionRequest {
                    artifact: path,
                    argument: String::new(),
                },
                &mut log,
            )
            .await;

        assert_eq!(code, Some(3));
        assert_eq!(host.exit_code(), Some(3));
        assert_eq!(host.state(), HostState::Unloaded);
        assert!(console.lines().contains(&"Exited with code 3".to_string()));
        assert_eq!(
            collect_states(&mut rx),
            vec![
                (HostState::Unloaded, HostState::Running),
                (HostState::Running, HostState::Unloaded),
            ]
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn arguments_reach_the_child() {
        let dir = tempfile::tempdir().unwrap();
        let path = script(dir.path(), r#"[ "$1" = "two words" ] && [ "$2" = "x" ] && exit 7"#);
        let (events, _rx) = Notifier::channel();
        let mut host = OutOfProcessHost::new(events);
        let console = Console::memory();
        let mut log = console.start_log();

        let code = host
            .run(
                ExecutionRequest {
                    artifact: path,
                    argument: r#""two words" x"#.to_string(),
                },
                &mut log,
            )
            .await;
        assert_eq!(code, Some(7));
    }

    #[tokio::test]
    async fn missing_executable() {
        let (events, _rx) = Notifier::channel();
        let mut host = OutOfProcessHost::new(events);
        let console = Console::memory();
        let mut log = console.start_log();

        let code = host
            .run(
                ExecutionRequest {
                    artifact: PathBuf::from("/nonexistent/scripter-child"),
                    argument: String::new(),
                },
                &mut log,
            )
            .await;
        assert_eq!(code, None);
        assert_eq!(host.state(), HostState::Unloaded);
        assert!(console.lines().iter().any(|l| l.starts_with("Starting process:")));
    }
}
