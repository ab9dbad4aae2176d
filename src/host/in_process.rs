use std::path::PathBuf;
use std::sync::Arc;

use super::loader::{ModuleLoader, PluginModule};
use super::{ExecutionRequest, HostError, HostKind, HostState};
use crate::console::{Log, Tone};
use crate::event::{Event, Notifier};
use crate::recovery::plugin_call;

/// Hot-swappable host that maps the artifact into this process
pub struct InProcessHost {
    loader: Arc<dyn ModuleLoader>,
    module: Option<Arc<dyn PluginModule>>,
    artifact: Option<PathBuf>,
    argument: String,
    state: HostState,
    events: Notifier,
}

impl InProcessHost {
    pub fn new(loader: Arc<dyn ModuleLoader>, events: Notifier) -> Self {
        Self {
            loader,
            module: None,
            artifact: None,
            argument: String::new(),
            state: HostState::Unloaded,
            events,
        }
    }

    pub fn state(&self) -> HostState {
        self.state
    }

    fn set_state(&mut self, to: HostState) {
        if self.state != to {
            let from = self.state;
            self.state = to;
            self.events.send(Event::HostStateChanged {
                host: HostKind::InProcess,
                from,
                to,
            });
        }
    }

    /// Map the artifact and resolve its entry points
    pub async fn load(&mut self, request: ExecutionRequest) -> Result<(), HostError> {
        if self.state != HostState::Unloaded {
            self.unload().await;
        }

        let loader = Arc::clone(&self.loader);
        let path = request.artifact.clone();
        let module =
            tokio::task::spawn_blocking(move || plugin_call(|| loader.open(&path))).await??;

        self.module = Some(Arc::from(module));
        self.artifact = Some(request.artifact);
        self.argument = request.argument;
        self.set_state(HostState::Loaded);
        Ok(())
    }

    /// Run the plugin's one-time setup
    pub async fn setup(&mut self) -> Result<(), HostError> {
        let module = self.module.clone().ok_or(HostError::NotLoaded)?;
        tokio::task::spawn_blocking(move || plugin_call(|| module.setup())).await?
    }

    /// Call the execute entry point with the argument from the load request
    pub async fn execute(&mut self) -> Result<i32, HostError> {
        let module = self.module.clone().ok_or(HostError::NotLoaded)?;
        let argument = self.argument.clone();
        self.set_state(HostState::Running);
        tokio::task::spawn_blocking(move || plugin_call(|| module.execute(&argument))).await?
    }

    /// Unmap the plugin; the artifact file is released when this returns
    pub async fn unload(&mut self) {
        if let Some(module) = self.module.take() {
            // dlclose may run library destructors
            let unloaded = tokio::task::spawn_blocking(move || plugin_call(|| drop(module))).await;
            if let Err(e) = unloaded {
                log::error!("[host] plugin unload panicked: {}", e);
            }
        }
        self.artifact = None;
        self.set_state(HostState::Unloaded);
    }

    /// Load, set up and execute, reporting failures to the log.
    ///
    /// Any failure leaves the host unloaded. Returns the execute result.
    pub async fn run(&mut self, request: ExecutionRequest, log: &mut Log) -> Option<i32> {
        log.start_timing("Loading plugin");
        let loaded = self.load(request).await;
        log.end_timing("");
        if let Err(e) = loaded {
            match e {
                HostError::MissingEntryPoint { .. } => {
                    log.heading("Loaded, but no plugin entry point found", Tone::Failure);
                    log.out_exception(&e, "Loading plugin");
                }
                _ => log.out_exception(&e, "Loading plugin"),
            }
            self.unload().await;
            return None;
        }

        if let Err(e) = self.setup().await {
            log.out_exception(&e, "Plugin setup");
            self.unload().await;
            return None;
        }

        self.execute_logged(log).await
    }

    /// Execute the loaded plugin again, reporting failures to the log
    pub async fn execute_logged(&mut self, log: &mut Log) -> Option<i32> {
        let name = self
            .artifact
            .as_ref()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        log.start_timing(format!("Running {}", name));
        let result = self.execute().await;
        log.end_timing("");
        match result {
            Ok(code) => {
                log.out(format!("Returned {}", code));
                Some(code)
            }
            Err(e) => {
                log.out_exception(&e, "Executing plugin");
                self.unload().await;
                None
            }
        }
    }
}
