use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::console::{Log, Tone};
use crate::emit::{self, CompiledArtifact, EmitError};
use crate::event::{Event, Notifier};
use crate::host::{
    ExecutionRequest, Host, HostKind, HostState, InProcessHost, ModuleLoader, OutOfProcessHost,
};
use crate::script::{Metadata, OutputKind};
use crate::syntax::{Diagnostic, SyntaxTree};
use crate::toolchain::Toolchain;

pub struct BuildRequest {
    pub source_path: PathBuf,
    pub tree: SyntaxTree,
    pub metadata: Metadata,
}

#[derive(Debug, Clone)]
pub struct BuildReport {
    /// Where the artifact was written; `None` when compilation failed
    pub artifact: Option<CompiledArtifact>,
    pub success: bool,
    pub diagnostics: Vec<Diagnostic>,
    /// Result of running the artifact when it was auto-loaded
    pub exit_code: Option<i32>,
    pub fell_back: bool,
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Unresolved imports: {}", .0.join(", "))]
    BrokenImports(Vec<String>),

    #[error(transparent)]
    Emit(#[from] EmitError),

    #[error("Compilation panicked: {0}")]
    Panicked(String),
}

pub struct Dispatcher {
    toolchain: Arc<dyn Toolchain>,
    loader: Arc<dyn ModuleLoader>,
    host: Option<Host>,
    /// Last successfully built artifact, for manual runs
    last: Option<(OutputKind, ExecutionRequest)>,
    events: Notifier,
}

impl Dispatcher {
    pub fn new(
        toolchain: Arc<dyn Toolchain>,
        loader: Arc<dyn ModuleLoader>,
        events: Notifier,
    ) -> Self {
        Self {
            toolchain,
            loader,
            host: None,
            last: None,
            events,
        }
    }

    pub fn host_state(&self) -> HostState {
        self.host.as_ref().map(Host::state).unwrap_or_default()
    }

    pub fn host_kind(&self) -> Option<HostKind> {
        self.host.as_ref().map(Host::kind)
    }

    /// Fail with every unresolved import location
    pub fn validate(metadata: &Metadata) -> Result<(), BuildError> {
        let broken: Vec<String> = metadata
            .broken_imports()
            .into_iter()
            .map(|i| i.location().to_string())
            .collect();
        if broken.is_empty() {
            Ok(())
        } else {
            Err(BuildError::BrokenImports(broken))
        }
    }

    async fn release_in_process(&mut self) {
        if let Some(host @ Host::InProcess(_)) = self.host.as_mut() {
            if host.state() != HostState::Unloaded {
                log::debug!("[dispatch] unloading plugin before build");
                host.unload().await;
            }
        }
    }

    /// Forget the last artifact once a failed compile has removed it
    fn forget_removed_artifact(&mut self) {
        if self
            .last
            .take_if(|(_, request)| !request.artifact.exists())
            .is_some()
        {
            log::debug!("[dispatch] last artifact was removed by a failed compile");
        }
    }

    pub async fn build(
        &mut self,
        request: BuildRequest,
        log: &mut Log,
    ) -> Result<BuildReport, BuildError> {
        if let Err(e) = Self::validate(&request.metadata) {
            log.out_exception(&e, "Compilation failed");
            return Err(e);
        }

        self.release_in_process().await;

        let name = request
            .source_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let metadata = request.metadata;
        let kind = metadata.output_kind;
        let references = metadata.references();

        log.start_timing(format!("Compiling {}", name));
        log.out(format!("{} with {} imports", kind, references.len()));

        let target = emit::canonical_target(&request.source_path, kind);
        self.events.send(Event::EmitStarted {
            target: target.path,
        });

        let toolchain = Arc::clone(&self.toolchain);
        let source_path = request.source_path;
        let tree = request.tree;
        let emitted = tokio::task::spawn_blocking(move || {
            emit::emit(toolchain.as_ref(), &source_path, &tree, &references, kind)
        })
        .await;

        let report = match emitted {
            Ok(Ok(report)) => report,
            Ok(Err(e)) => {
                self.events.send(Event::EmitFinished { success: false });
                self.forget_removed_artifact();
                log.end_timing("");
                log.out_exception(&e, "Compilation failed");
                return Err(e.into());
            }
            Err(e) => {
                self.events.send(Event::EmitFinished { success: false });
                log.end_timing("");
                return Err(BuildError::Panicked(e.to_string()));
            }
        };
        self.events.send(Event::EmitFinished {
            success: report.success,
        });
        log.end_timing("");
        log.diagnostics(&report.diagnostics);

        if report.fell_back {
            log.info(format!(
                "Output was in use, saved as {}",
                report.artifact.path.display()
            ));
        }

        if !report.success {
            self.forget_removed_artifact();
            log.heading("Compilation failed", Tone::Failure);
            return Ok(BuildReport {
                artifact: None,
                success: false,
                diagnostics: report.diagnostics,
                exit_code: None,
                fell_back: report.fell_back,
            });
        }

        log.heading("Compilation successful", Tone::Success);
        log.out(format!(
            "Compilation saved to {}",
            report.artifact.path.display()
        ));

        let execution = ExecutionRequest {
            artifact: report.artifact.path.clone(),
            argument: metadata.argument,
        };
        self.last = Some((kind, execution.clone()));

        let exit_code = if metadata.auto_load {
            self.drive(kind, execution, log).await
        } else {
            None
        };

        Ok(BuildReport {
            artifact: Some(report.artifact),
            success: true,
            diagnostics: report.diagnostics,
            exit_code,
            fell_back: report.fell_back,
        })
    }

    /// Run the artifact on the host for its kind, replacing a host of the other kind
    async fn drive(
        &mut self,
        kind: OutputKind,
        request: ExecutionRequest,
        log: &mut Log,
    ) -> Option<i32> {
        let wanted = match kind {
            OutputKind::Plugin => HostKind::InProcess,
            OutputKind::Process => HostKind::OutOfProcess,
        };
        if self.host_kind() != Some(wanted) {
            if let Some(mut old) = self.host.take() {
                old.unload().await;
            }
            self.host = Some(match wanted {
                HostKind::InProcess => Host::InProcess(InProcessHost::new(
                    Arc::clone(&self.loader),
                    self.events.clone(),
                )),
                HostKind::OutOfProcess => {
                    Host::OutOfProcess(OutOfProcessHost::new(self.events.clone()))
                }
            });
        }

        match self.host.as_mut() {
            Some(Host::InProcess(host)) => host.run(request, log).await,
            Some(Host::OutOfProcess(host)) => host.run(request, log).await,
            None => None,
        }
    }

    /// Execute again: the loaded plugin if there is one, otherwise the last artifact
    pub async fn execute(&mut self, log: &mut Log) -> Option<i32> {
        if let Some(Host::InProcess(host)) = self.host.as_mut() {
            if host.state() != HostState::Unloaded {
                return host.execute_logged(log).await;
            }
        }
        match self.last.clone() {
            Some((kind, request)) => self.drive(kind, request, log).await,
            None => {
                log.out("Nothing to run, build first");
                None
            }
        }
    }

    pub async fn unload(&mut self) {
        if let Some(host) = self.host.as_mut() {
            host.unload().await;
        }
    }
}
