//! The open script and everything driven from it
//!
//! A [`Session`] owns the buffer, the latest syntax tree, the script's
//! metadata and the dispatcher. Edits feed the debounced reparser; results
//! come back as [`Event`](crate::event::Event)s the owner passes to
//! [`Session::handle_event`].

mod error;
mod session;

pub use error::SessionError;
pub use session::Session;
