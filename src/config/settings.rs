use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Host settings that can be customized via Rhai config
#[derive(Debug, Clone)]
pub struct Settings {
    // Parsing
    pub parse_delay_ms: u64,
    pub auto_parse: bool,

    // Toolchain
    pub compiler: String,
    pub cflags: Vec<String>,

    // Formatting
    pub tab_width: usize,

    // Extra library identifiers -> paths, merged over the built-in registry
    pub libraries: BTreeMap<String, PathBuf>,

    // How often the script file is checked for outside edits
    pub watch_interval_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            parse_delay_ms: 2000,
            auto_parse: true,

            compiler: "cc".to_string(),
            cflags: Vec::new(),

            tab_width: 4,

            libraries: BTreeMap::new(),

            watch_interval_ms: 500,
        }
    }
}

impl Settings {
    /// Quiet period after the last edit before a background parse runs
    pub fn parse_delay(&self) -> Duration {
        Duration::from_millis(self.parse_delay_ms)
    }

    pub fn watch_interval(&self) -> Duration {
        Duration::from_millis(self.watch_interval_ms)
    }
}
