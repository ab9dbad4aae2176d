use super::command::{Command, HELP, parse};
use crate::console::Tone;
use crate::session::{Session, SessionError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Parse and run one input line against the session
pub async fn handle_line(session: &mut Session, line: &str) -> Flow {
    match parse(line) {
        Ok(command) => execute(session, command).await,
        Err(message) => {
            session.console().write(&message, Tone::Failure);
            Flow::Continue
        }
    }
}

fn report(session: &Session, result: Result<(), SessionError>, context: &str) {
    match result {
        // The dispatcher has already logged build failures
        Err(SessionError::Build(_)) => {}
        Err(e) => session.console().start_log().out_exception(&e, context),
        Ok(()) => {}
    }
}

pub async fn execute(session: &mut Session, command: Command) -> Flow {
    match command {
        Command::Write(None) => {
            let result = session.save().await;
            if result.is_ok() {
                session.console().write("Written", Tone::Muted);
            }
            report(session, result, "Saving");
        }
        Command::Write(Some(path)) => {
            let result = session.save_as(path).await;
            if result.is_ok() {
                session.console().write("Written", Tone::Muted);
            }
            report(session, result, "Saving");
        }
        Command::Quit { force } => {
            if session.request_quit(force) {
                return Flow::Quit;
            }
            session
                .console()
                .write("Unsaved changes (add ! to discard them)", Tone::Failure);
        }
        Command::WriteQuit => {
            let result = if session.file().is_some() {
                session.save().await
            } else if session.is_modified() {
                Err(SessionError::NoFile)
            } else {
                Ok(())
            };
            if result.is_ok() {
                return Flow::Quit;
            }
            report(session, result, "Saving");
        }
        Command::Edit(path) => {
            if !session.request_quit(false) {
                session
                    .console()
                    .write("Unsaved changes, save or :reload first", Tone::Failure);
            } else {
                let result = session.open(path).await;
                report(session, result, "Opening");
            }
        }
        Command::New => {
            if session.request_quit(false) {
                session.new_file();
            } else {
                session
                    .console()
                    .write("Unsaved changes, save first", Tone::Failure);
            }
        }
        Command::Reload => {
            let result = session.reload().await;
            report(session, result, "Reloading");
        }

        Command::Build => {
            let result = session.build().await.map(|_| ());
            report(session, result, "Building");
        }
        Command::Run => {
            session.execute().await;
        }
        Command::Unload => {
            session.unload().await;
            session.console().write("Unloaded", Tone::Muted);
        }
        Command::Format => match session.format().await {
            Ok(true) => session.console().write("Formatted", Tone::Muted),
            Ok(false) => session.console().write("Already formatted", Tone::Muted),
            Err(e) => report(session, Err(e), "Formatting"),
        },
        Command::Parse => {
            let result = session.parse_now().await;
            if result.is_ok() {
                let count = session.diagnostics().len();
                session
                    .console()
                    .write(&format!("Parsed, {} diagnostics", count), Tone::Muted);
            }
            report(session, result, "Parsing");
        }
        Command::Diagnostics => {
            let log = session.console().start_log();
            if session.diagnostics().is_empty() {
                log.out("No diagnostics");
            } else {
                log.diagnostics(session.diagnostics());
            }
        }

        Command::Import(location) => {
            if !session.add_import(location.clone()) {
                session
                    .console()
                    .write(&format!("Import {} could not be resolved", location), Tone::Failure);
            }
        }
        Command::Unimport(index) => {
            if session.remove_import(index).is_none() {
                session
                    .console()
                    .write(&format!("No import number {}", index), Tone::Failure);
            }
        }
        Command::Imports => list_imports(session),
        Command::Reset => session.reset_metadata(),
        Command::Kind(kind) => session.set_output_kind(kind),
        Command::AutoLoad(on) => session.set_auto_load(on),
        Command::Argument(argument) => session.set_argument(argument),

        Command::AutoParse(on) => session.set_auto_parse(on),
        Command::Help => session.console().out(HELP),

        Command::Append(line) => {
            let end = session.text().chars().count();
            session.insert(end, &format!("{}\n", line));
        }
    }
    Flow::Continue
}

fn list_imports(session: &Session) {
    let metadata = session.metadata();
    let console = session.console();
    console.write(
        &format!(
            "{} with {} imports, auto-load {}, argument \"{}\"",
            metadata.output_kind,
            metadata.imports.len(),
            if metadata.auto_load { "on" } else { "off" },
            metadata.argument
        ),
        Tone::Info,
    );
    for (index, import) in metadata.imports.iter().enumerate() {
        match import.resolved() {
            Some(resolved) if resolved.path().to_string_lossy() != import.location() => {
                console.out(format!(
                    "{:>3}  {} -> {}",
                    index,
                    import,
                    resolved.path().display()
                ));
            }
            Some(_) => console.out(format!("{:>3}  {}", index, import)),
            None => console.write(&format!("{:>3}  {} (broken)", index, import), Tone::Failure),
        }
    }
}
