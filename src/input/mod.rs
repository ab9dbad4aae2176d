mod command;
mod handler;

pub use command::{Command, HELP, parse};
pub use handler::{Flow, execute, handle_line};
