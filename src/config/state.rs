//! Persisted session state
//!
//! Remembers the last opened script so the host can reopen it when started
//! without a path.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct State {
    /// Script that was open when the host last saved its state
    pub last_file: Option<PathBuf>,
}

impl State {
    /// Load state from disk, falling back to defaults
    pub fn load() -> Self {
        Self::load_from(&Self::state_path())
    }

    pub fn load_from(path: &Path) -> Self {
        if path.exists() {
            if let Ok(content) = fs::read_to_string(path) {
                if let Ok(state) = serde_json::from_str(&content) {
                    return state;
                }
            }
        }
        Self::default()
    }

    /// Save state to disk
    pub fn save(&self) -> Result<(), String> {
        self.save_to(&Self::state_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create state directory: {}", e))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize state: {}", e))?;

        fs::write(path, content).map_err(|e| format!("Failed to write state: {}", e))
    }

    fn state_path() -> PathBuf {
        dirs::home_dir()
            .map(|h| h.join(".config").join("scripter").join("state.json"))
            .unwrap_or_else(|| PathBuf::from(".scripter-state.json"))
    }
}
