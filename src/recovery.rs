//! Best-effort crash recovery
//!
//! The session keeps the latest buffer text in a [`RecoverySlot`]. If the
//! hosting process panics the panic hook writes that text next to the script
//! as `<file>.recovered`. Panics raised inside [`plugin_call`] are left to the
//! plugin host, which catches and logs them. A native crash in plugin code
//! never reaches the hook.

use std::cell::Cell;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::config::ConfigEngine;

const RECOVERY_SUFFIX: &str = "recovered";
const UNTITLED: &str = "untitled.hc";

#[derive(Debug, Default)]
struct Snapshot {
    file: Option<PathBuf>,
    text: String,
}

#[derive(Debug, Clone, Default)]
pub struct RecoverySlot {
    inner: Arc<Mutex<Snapshot>>,
}

impl RecoverySlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&self, file: Option<&Path>, text: String) {
        if let Ok(mut snapshot) = self.inner.lock() {
            snapshot.file = file.map(Path::to_path_buf);
            snapshot.text = text;
        }
    }

    /// Write the snapshot out. Never blocks: a slot held by the panicking
    /// thread is reported as unavailable.
    pub fn recover(&self) -> Result<PathBuf, String> {
        let snapshot = match self.inner.try_lock() {
            Ok(snapshot) => snapshot,
            Err(std::sync::TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(std::sync::TryLockError::WouldBlock) => {
                return Err("buffer snapshot is in use".to_string());
            }
        };
        if snapshot.text.is_empty() {
            return Err("nothing to recover".to_string());
        }
        let path = recovery_path(snapshot.file.as_deref())
            .ok_or_else(|| "no location to write to".to_string())?;
        std::fs::write(&path, &snapshot.text)
            .map_err(|e| format!("failed to write {}: {}", path.display(), e))?;
        Ok(path)
    }
}

/// `<file>.recovered`, or a file in the config directory for unsaved scripts
pub fn recovery_path(file: Option<&Path>) -> Option<PathBuf> {
    match file {
        Some(file) => {
            let mut name = file.file_name()?.to_os_string();
            name.push(".");
            name.push(RECOVERY_SUFFIX);
            Some(file.with_file_name(name))
        }
        None => {
            let dir = ConfigEngine::config_dir()?;
            std::fs::create_dir_all(&dir).ok()?;
            Some(dir.join(format!("{}.{}", UNTITLED, RECOVERY_SUFFIX)))
        }
    }
}

thread_local! {
    static IN_PLUGIN_CALL: Cell<bool> = const { Cell::new(false) };
}

struct PluginCallGuard {
    outer: bool,
}

impl Drop for PluginCallGuard {
    fn drop(&mut self) {
        IN_PLUGIN_CALL.with(|flag| flag.set(self.outer));
    }
}

/// Run `f` as a plugin call on this thread. The recovery hook ignores
/// panics raised inside it.
pub fn plugin_call<T>(f: impl FnOnce() -> T) -> T {
    let _guard = PluginCallGuard {
        outer: IN_PLUGIN_CALL.with(|flag| flag.replace(true)),
    };
    f()
}

/// Whether the current thread is inside [`plugin_call`]
pub fn in_plugin_call() -> bool {
    IN_PLUGIN_CALL.with(Cell::get)
}

/// Chain a hook that saves the buffer after the default panic report
pub fn install_panic_hook(slot: RecoverySlot) {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        previous(info);
        if in_plugin_call() {
            return;
        }
        match slot.recover() {
            Ok(path) => eprintln!("Unsaved work was written to {}", path.display()),
            Err(e) => eprintln!("Could not recover unsaved work: {}", e),
        }
    }));
}
