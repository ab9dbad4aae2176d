use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use rhai::{Engine, Scope};

use super::Settings;

type Shared = Arc<RwLock<Settings>>;

/// Evaluates `init.rhai` and collects the [`Settings`] it sets
pub struct ConfigEngine {
    engine: Engine,
    settings: Shared,
}

fn update(settings: &Shared, apply: impl FnOnce(&mut Settings)) {
    if let Ok(mut settings) = settings.write() {
        apply(&mut settings);
    }
}

impl ConfigEngine {
    pub fn new() -> Self {
        let settings: Shared = Arc::new(RwLock::new(Settings::default()));
        Self {
            engine: Self::build_engine(&settings),
            settings,
        }
    }

    fn build_engine(settings: &Shared) -> Engine {
        let mut engine = Engine::new();
        engine.set_max_expr_depths(64, 64);
        engine.set_max_operations(100_000);

        // Toolchain
        let s = Arc::clone(settings);
        engine.register_fn("set_compiler", move |command: &str| {
            update(&s, |c| c.compiler = command.to_string())
        });
        let s = Arc::clone(settings);
        engine.register_fn("get_compiler", move || -> String {
            s.read().map(|c| c.compiler.clone()).unwrap_or_default()
        });
        let s = Arc::clone(settings);
        engine.register_fn("add_cflag", move |flag: &str| {
            update(&s, |c| c.cflags.push(flag.to_string()))
        });
        let s = Arc::clone(settings);
        engine.register_fn("register_library", move |id: &str, path: &str| {
            update(&s, |c| {
                c.libraries.insert(id.to_string(), PathBuf::from(path));
            })
        });

        // Parsing and editing
        let s = Arc::clone(settings);
        engine.register_fn("set_parse_delay_ms", move |ms: i64| {
            update(&s, |c| c.parse_delay_ms = ms.clamp(50, 60_000) as u64)
        });
        let s = Arc::clone(settings);
        engine.register_fn("set_auto_parse", move |on: bool| {
            update(&s, |c| c.auto_parse = on)
        });
        let s = Arc::clone(settings);
        engine.register_fn("set_tab_width", move |width: i64| {
            update(&s, |c| c.tab_width = width.clamp(1, 16) as usize)
        });
        let s = Arc::clone(settings);
        engine.register_fn("set_watch_interval_ms", move |ms: i64| {
            update(&s, |c| c.watch_interval_ms = ms.clamp(50, 60_000) as u64)
        });

        engine.on_print(|msg| log::info!("[config] {}", msg));

        engine
    }

    pub fn load_file(&mut self, path: &Path) -> Result<(), String> {
        let script = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        self.eval(&script)
    }

    pub fn eval(&mut self, script: &str) -> Result<(), String> {
        let ast = self
            .engine
            .compile(script)
            .map_err(|e| format!("Config parse error: {}", e))?;
        self.engine
            .run_ast_with_scope(&mut Scope::new(), &ast)
            .map_err(|e| format!("Config error: {}", e))
    }

    /// Snapshot of everything set so far
    pub fn settings(&self) -> Settings {
        self.settings.read().map(|s| s.clone()).unwrap_or_default()
    }

    /// `~/.config/scripter`, on every platform
    pub fn config_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".config").join("scripter"))
    }

    pub fn config_file() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join("init.rhai"))
    }

    /// Run `init.rhai` if there is one
    pub fn load_default(&mut self) -> Result<(), String> {
        match Self::config_file() {
            Some(file) if file.exists() => self.load_file(&file),
            _ => Ok(()),
        }
    }
}

impl Default for ConfigEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_compiler_and_read_it_back() {
        let mut engine = ConfigEngine::new();
        engine
            .eval(r#"set_compiler("clang"); add_cflag(get_compiler() + "-flag");"#)
            .unwrap();
        let settings = engine.settings();
        assert_eq!(settings.compiler, "clang");
        assert_eq!(settings.cflags, vec!["clang-flag"]);
    }

    #[test]
    fn parse_delay_is_clamped() {
        let mut engine = ConfigEngine::new();
        engine.eval("set_parse_delay_ms(1);").unwrap();
        assert_eq!(engine.settings().parse_delay_ms, 50);
    }

    #[test]
    fn register_library_adds_override() {
        let mut engine = ConfigEngine::new();
        engine
            .eval(r#"register_library("libfoo", "/opt/foo/libfoo.so");"#)
            .unwrap();
        assert_eq!(
            engine.settings().libraries.get("libfoo"),
            Some(&PathBuf::from("/opt/foo/libfoo.so"))
        );
    }

    #[test]
    fn several_settings_in_one_script() {
        let mut engine = ConfigEngine::new();
        engine
            .eval(
                r#"
                set_compiler("gcc");
                add_cflag("-O2");
                add_cflag("-Wall");
                set_auto_parse(false);
                set_tab_width(2);
                set_watch_interval_ms(250);
            "#,
            )
            .unwrap();

        let settings = engine.settings();
        assert_eq!(settings.compiler, "gcc");
        assert_eq!(settings.cflags, vec!["-O2", "-Wall"]);
        assert!(!settings.auto_parse);
        assert_eq!(settings.tab_width, 2);
        assert_eq!(settings.watch_interval_ms, 250);
    }

    #[test]
    fn syntax_errors_are_reported() {
        let mut engine = ConfigEngine::new();
        let err = engine.eval("set_tab_width(").unwrap_err();
        assert!(err.starts_with("Config parse error"));
    }

    #[test]
    fn load_file_reads_script() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("init.rhai");
        std::fs::write(&path, "set_tab_width(8);").unwrap();

        let mut engine = ConfigEngine::new();
        engine.load_file(&path).unwrap();
        assert_eq!(engine.settings().tab_width, 8);
        assert!(engine.load_file(&dir.path().join("missing.rhai")).is_err());
    }
}
