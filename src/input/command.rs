use std::path::PathBuf;

use crate::script::OutputKind;

/// One line of input, parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    // Files
    Write(Option<PathBuf>),
    Quit { force: bool },
    WriteQuit,
    Edit(PathBuf),
    New,
    Reload,

    // Pipeline
    Build,
    Run,
    Unload,
    Format,
    Parse,
    Diagnostics,

    // Metadata
    Import(String),
    Unimport(usize),
    Imports,
    Reset,
    Kind(OutputKind),
    AutoLoad(bool),
    Argument(String),

    // Session
    AutoParse(bool),
    Help,

    /// A line of source appended to the buffer
    Append(String),
}

pub const HELP: &str = "\
:w [path]          save (to path)
:q  :q!  :wq       quit, quit discarding changes, save and quit
:e <path>          open a script
:new               start an empty script
:reload            read the file again, discarding changes
:build             save, compile and run
:run               execute the loaded plugin or the last artifact again
:unload            unload the plugin
:fmt               normalize whitespace
:parse             parse now
:diag              list diagnostics
:import <path>     add an import
:unimport <n>      remove import n
:imports           list imports
:reset             reset metadata to defaults
:kind plugin|process
:autoload on|off
:arg <text>        argument passed to the script
:autoparse on|off
Any other line is appended to the script.";

fn on_off(arg: &str) -> Result<bool, String> {
    match arg.to_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Ok(true),
        "off" | "false" | "no" | "0" => Ok(false),
        _ => Err(format!("Expected on or off, got `{}`", arg)),
    }
}

fn required<'a>(name: &str, arg: &'a str) -> Result<&'a str, String> {
    if arg.is_empty() {
        Err(format!(":{} needs an argument", name))
    } else {
        Ok(arg)
    }
}

pub fn parse(line: &str) -> Result<Command, String> {
    let Some(command) = line.trim_end().strip_prefix(':') else {
        return Ok(Command::Append(line.to_string()));
    };
    let (name, arg) = match command.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (command, ""),
    };

    let cmd = match name {
        "w" | "write" if arg.is_empty() => Command::Write(None),
        "w" | "write" => Command::Write(Some(PathBuf::from(arg))),
        "q" | "quit" => Command::Quit { force: false },
        "q!" | "quit!" => Command::Quit { force: true },
        "wq" | "x" => Command::WriteQuit,
        "e" | "edit" => Command::Edit(PathBuf::from(required(name, arg)?)),
        "new" => Command::New,
        "reload" => Command::Reload,

        "b" | "build" => Command::Build,
        "r" | "run" => Command::Run,
        "unload" => Command::Unload,
        "fmt" | "format" => Command::Format,
        "parse" => Command::Parse,
        "diag" | "diagnostics" => Command::Diagnostics,

        "import" => Command::Import(required(name, arg)?.to_string()),
        "unimport" => {
            let index = required(name, arg)?
                .parse::<usize>()
                .map_err(|_| format!("Not an import number: {}", arg))?;
            Command::Unimport(index)
        }
        "imports" => Command::Imports,
        "reset" => Command::Reset,
        "kind" => Command::Kind(required(name, arg)?.parse()?),
        "autoload" => Command::AutoLoad(on_off(required(name, arg)?)?),
        "arg" => Command::Argument(arg.to_string()),

        "autoparse" => Command::AutoParse(on_off(required(name, arg)?)?),
        "h" | "help" => Command::Help,

        "" => return Err("Empty command".to_string()),
        _ => return Err(format!("Unknown command: {}", name)),
    };
    Ok(cmd)
}
