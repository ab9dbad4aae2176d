//! Messages passed back to the session that owns the pipeline

use std::path::PathBuf;

use tokio::sync::mpsc;

use crate::host::{HostKind, HostState};
use crate::syntax::SyntaxTree;

#[derive(Debug, Clone)]
pub enum Event {
    /// The quiet period after the last edit elapsed
    ReparseDue,
    /// A background parse finished
    Parsed(SyntaxTree),
    HostStateChanged {
        host: HostKind,
        from: HostState,
        to: HostState,
    },
    /// The emitter is about to open the target for writing
    EmitStarted { target: PathBuf },
    EmitFinished { success: bool },
}

/// Cloneable sending half; a closed receiver is ignored
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: mpsc::UnboundedSender<Event>,
}

impl Notifier {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Event>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn send(&self, event: Event) {
        let _ = self.tx.send(event);
    }
}
