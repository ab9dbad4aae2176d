//! Quiet-period debounce for background reparsing
//!
//! Every edit re-arms a single timer. The callback fires once no further
//! edit arrives within the delay.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub struct Reparser {
    edits: mpsc::UnboundedSender<()>,
    task: JoinHandle<()>,
}

impl Reparser {
    /// Spawn the debounce loop on the current tokio runtime
    pub fn spawn<F>(delay: Duration, on_quiet: F) -> Self
    where
        F: Fn() + Send + 'static,
    {
        let (edits, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(debounce(rx, delay, on_quiet));
        Self { edits, task }
    }

    /// Record an edit, restarting the quiet period
    pub fn notify_edit(&self) {
        let _ = self.edits.send(());
    }
}

impl Drop for Reparser {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn debounce<F>(mut edits: mpsc::UnboundedReceiver<()>, delay: Duration, on_quiet: F)
where
    F: Fn(),
{
    while edits.recv().await.is_some() {
        loop {
            tokio::select! {
                next = edits.recv() => {
                    if next.is_none() {
                        return;
                    }
                    // Re-arm
                }
                _ = tokio::time::sleep(delay) => {
                    on_quiet();
                    break;
                }
            }
        }
    }
}
