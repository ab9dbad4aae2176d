use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use tokio::sync::mpsc::UnboundedReceiver;

use super::SessionError;
use crate::config::Settings;
use crate::console::{Console, Tone};
use crate::dispatch::{BuildReport, BuildRequest, Dispatcher};
use crate::editor::{Buffer, EditEvent};
use crate::event::{Event, Notifier};
use crate::host::{HostState, ModuleLoader};
use crate::recovery::RecoverySlot;
use crate::resolve::LibraryRegistry;
use crate::script::file::{self as script_file, SCRIPT_EXTENSION, is_pure_source};
use crate::script::{Import, Metadata, MetadataBlock, OutputKind};
use crate::syntax::{Diagnostic, Reparser, SyntaxTree};
use crate::toolchain::Toolchain;

const UNTITLED_STEM: &str = "untitled";

pub struct Session {
    buffer: Buffer,
    tree: SyntaxTree,
    diagnostics: Vec<Diagnostic>,
    metadata: Metadata,
    file: Option<PathBuf>,
    metadata_modified: bool,
    auto_parse: bool,

    settings: Settings,
    registry: LibraryRegistry,
    toolchain: Arc<dyn Toolchain>,
    dispatcher: Dispatcher,
    reparser: Reparser,

    console: Console,
    events: Notifier,
    rx: UnboundedReceiver<Event>,
    recovery: RecoverySlot,
    last_mtime: Option<SystemTime>,
    // Build directory for scripts that were never saved
    scratch: Option<tempfile::TempDir>,
}

impl Session {
    /// Create an empty session. Must be called inside a tokio runtime.
    pub fn new(
        settings: Settings,
        toolchain: Arc<dyn Toolchain>,
        loader: Arc<dyn ModuleLoader>,
        console: Console,
    ) -> Self {
        let (events, rx) = Notifier::channel();
        let notifier = events.clone();
        let reparser = Reparser::spawn(settings.parse_delay(), move || {
            notifier.send(Event::ReparseDue)
        });
        let registry = LibraryRegistry::with_overrides(settings.libraries.clone());
        let metadata = Metadata::with_defaults(&registry);
        let dispatcher = Dispatcher::new(Arc::clone(&toolchain), loader, events.clone());

        Self {
            buffer: Buffer::new(),
            tree: SyntaxTree::empty(),
            diagnostics: Vec::new(),
            metadata,
            file: None,
            metadata_modified: false,
            auto_parse: settings.auto_parse,
            settings,
            registry,
            toolchain,
            dispatcher,
            reparser,
            console,
            events,
            rx,
            recovery: RecoverySlot::new(),
            last_mtime: None,
            scratch: None,
        }
    }

    // Accessors

    pub fn text(&self) -> String {
        self.buffer.text()
    }

    pub fn tree(&self) -> &SyntaxTree {
        &self.tree
    }

    /// Diagnostics of the latest parse or build
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    /// Unsaved text or metadata changes
    pub fn is_modified(&self) -> bool {
        self.buffer.is_dirty() || self.metadata_modified
    }

    /// The tree lags behind the buffer
    pub fn is_stale(&self) -> bool {
        self.tree.revision() != self.buffer.revision()
    }

    pub fn auto_parse(&self) -> bool {
        self.auto_parse
    }

    pub fn host_state(&self) -> HostState {
        self.dispatcher.host_state()
    }

    pub fn console(&self) -> &Console {
        &self.console
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn recovery_slot(&self) -> RecoverySlot {
        self.recovery.clone()
    }

    /// A build needs a known file or some code to compile
    pub fn can_build(&self) -> bool {
        self.file.is_some() || self.buffer.len_chars() > 0
    }

    pub fn can_save(&self) -> bool {
        self.file.is_some() && self.is_modified()
    }

    // Files

    pub fn new_file(&mut self) {
        self.file = None;
        self.metadata = Metadata::with_defaults(&self.registry);
        self.last_mtime = None;
        self.load_source("");
        self.metadata_modified = false;
        log::info!("[session] new script");
    }

    pub async fn open(&mut self, path: impl Into<PathBuf>) -> Result<(), SessionError> {
        let path = path.into();
        let script = script_file::read(&path).await?;

        let log = self.console.start_log();
        self.metadata = match script.metadata {
            MetadataBlock::Present(metadata) => metadata,
            MetadataBlock::Absent => {
                if !is_pure_source(&path) {
                    log.info("No script metadata found, using defaults");
                }
                Metadata::with_defaults(&self.registry)
            }
            MetadataBlock::Unreadable(e) => {
                log.out_exception(&e, "Loading Metadata");
                Metadata::with_defaults(&self.registry)
            }
        };

        self.file = Some(path.clone());
        self.load_source(&script.source);
        self.metadata_modified = false;
        self.last_mtime = modified_time(&path).await;
        log::info!("[session] opened {}", path.display());
        Ok(())
    }

    /// Discard unsaved changes and read the file again
    pub async fn reload(&mut self) -> Result<(), SessionError> {
        let path = self.file.clone().ok_or(SessionError::NoFile)?;
        self.open(path).await
    }

    pub async fn save(&mut self) -> Result<(), SessionError> {
        let path = self.file.clone().ok_or(SessionError::NoFile)?;
        self.write_to(&path).await
    }

    pub async fn save_as(&mut self, path: impl Into<PathBuf>) -> Result<(), SessionError> {
        let path = path.into();
        self.write_to(&path).await?;
        self.file = Some(path);
        self.snapshot();
        Ok(())
    }

    async fn write_to(&mut self, path: &Path) -> Result<(), SessionError> {
        script_file::write(path, &self.buffer.text(), &self.metadata).await?;
        self.buffer.mark_clean();
        self.metadata_modified = false;
        self.last_mtime = modified_time(path).await;
        log::info!("[session] saved {}", path.display());
        Ok(())
    }

    /// Pick up changes another program made to the open file.
    ///
    /// Unsaved local changes win; the user is told and can `reload`.
    pub async fn check_external_edit(&mut self) -> Result<bool, SessionError> {
        let Some(path) = self.file.clone() else {
            return Ok(false);
        };
        let Some(mtime) = modified_time(&path).await else {
            return Ok(false);
        };
        if self.last_mtime == Some(mtime) {
            return Ok(false);
        }
        self.last_mtime = Some(mtime);

        if self.is_modified() {
            self.console.write(
                &format!(
                    "{} changed on disk, keeping unsaved changes (:reload to discard them)",
                    path.display()
                ),
                Tone::Info,
            );
            return Ok(false);
        }

        let script = script_file::read(&path).await?;
        let mut changed = false;
        if let MetadataBlock::Present(metadata) = script.metadata {
            if metadata != self.metadata {
                self.metadata = metadata;
                changed = true;
            }
        }
        if script.source != self.buffer.text() {
            self.load_source(&script.source);
            changed = true;
        }
        if changed {
            log::info!("[session] picked up outside edit of {}", path.display());
        }
        Ok(changed)
    }

    // Editing

    pub fn insert(&mut self, offset: usize, text: &str) -> EditEvent {
        let edit = self.buffer.insert(offset, text);
        self.touched(edit);
        edit
    }

    pub fn remove(&mut self, range: Range<usize>) -> EditEvent {
        let edit = self.buffer.remove(range);
        self.touched(edit);
        edit
    }

    pub fn replace_all(&mut self, text: &str) -> EditEvent {
        let edit = self.buffer.replace_all(text);
        self.touched(edit);
        edit
    }

    /// Replace the text with content that matches the file on disk
    fn load_source(&mut self, source: &str) {
        let edit = self.buffer.replace_all(source);
        self.buffer.mark_clean();
        self.touched(edit);
    }

    fn touched(&mut self, edit: EditEvent) {
        log::trace!("[session] edit at {} (revision {})", edit.offset, edit.revision);
        self.reparser.notify_edit();
        self.snapshot();
    }

    fn snapshot(&self) {
        self.recovery.update(self.file.as_deref(), self.buffer.text());
    }

    // Parsing

    pub async fn next_event(&mut self) -> Option<Event> {
        self.rx.recv().await
    }

    pub fn handle_event(&mut self, event: Event) {
        match event {
            Event::ReparseDue => {
                if self.auto_parse && self.is_stale() {
                    self.spawn_parse();
                }
            }
            Event::Parsed(tree) => self.accept_tree(tree),
            Event::HostStateChanged { host, from, to } => {
                log::debug!("[session] {:?} host {} -> {}", host, from, to);
            }
            Event::EmitStarted { target } => {
                log::debug!("[session] emitting {}", target.display());
            }
            Event::EmitFinished { success } => {
                log::debug!("[session] emit finished, success: {}", success);
            }
        }
    }

    /// Parse the current text on the blocking pool; the result arrives as an event
    fn spawn_parse(&self) {
        let toolchain = Arc::clone(&self.toolchain);
        let events = self.events.clone();
        let source = self.buffer.text();
        let revision = self.buffer.revision();
        tokio::task::spawn_blocking(move || match toolchain.parse(&source, revision) {
            Ok(tree) => events.send(Event::Parsed(tree)),
            Err(e) => log::warn!("[session] background parse failed: {}", e),
        });
    }

    fn accept_tree(&mut self, tree: SyntaxTree) {
        if tree.revision() < self.tree.revision() {
            log::debug!(
                "[session] dropping parse of revision {} (have {})",
                tree.revision(),
                self.tree.revision()
            );
            return;
        }
        self.diagnostics = tree.diagnostics().to_vec();
        self.tree = tree;
    }

    /// Parse right away and wait for the result
    pub async fn parse_now(&mut self) -> Result<(), SessionError> {
        let toolchain = Arc::clone(&self.toolchain);
        let source = self.buffer.text();
        let revision = self.buffer.revision();
        let tree = tokio::task::spawn_blocking(move || toolchain.parse(&source, revision))
            .await
            .map_err(|e| SessionError::Panicked(e.to_string()))??;
        self.accept_tree(tree);
        Ok(())
    }

    /// Rewrite the buffer with normalized whitespace. Returns whether it changed.
    pub async fn format(&mut self) -> Result<bool, SessionError> {
        if self.is_stale() {
            self.parse_now().await?;
        }
        let formatted = self.tree.normalize_whitespace(self.settings.tab_width);
        if formatted == self.buffer.text() {
            return Ok(false);
        }
        self.replace_all(&formatted);
        Ok(true)
    }

    pub fn set_auto_parse(&mut self, on: bool) {
        self.auto_parse = on;
        if on && self.is_stale() {
            self.reparser.notify_edit();
        }
    }

    // Building and running

    fn build_path(&mut self) -> Result<PathBuf, SessionError> {
        if let Some(file) = &self.file {
            return Ok(file.clone());
        }
        if self.scratch.is_none() {
            let dir = tempfile::Builder::new()
                .prefix("scripter-build-")
                .tempdir()
                .map_err(SessionError::Scratch)?;
            self.scratch = Some(dir);
        }
        let dir = self
            .scratch
            .as_ref()
            .map(|d| d.path().to_path_buf())
            .unwrap_or_default();
        Ok(dir.join(format!("{}.{}", UNTITLED_STEM, SCRIPT_EXTENSION)))
    }

    /// Save, check imports, parse if needed, then compile and run per the metadata
    pub async fn build(&mut self) -> Result<BuildReport, SessionError> {
        if !self.can_build() {
            return Err(SessionError::NothingToBuild);
        }
        if self.file.is_some() && self.is_modified() {
            self.save().await?;
        }
        self.metadata.imports.iter_mut().for_each(Import::refresh);
        let mut log = self.console.start_log();
        if let Err(e) = Dispatcher::validate(&self.metadata) {
            log.out_exception(&e, "Compilation failed");
            return Err(e.into());
        }
        if self.is_stale() {
            self.parse_now().await?;
        }

        let source_path = self.build_path()?;
        let report = self
            .dispatcher
            .build(
                BuildRequest {
                    source_path,
                    tree: self.tree.clone(),
                    metadata: self.metadata.clone(),
                },
                &mut log,
            )
            .await?;
        if !report.diagnostics.is_empty() || !report.success {
            self.diagnostics = report.diagnostics.clone();
        }
        Ok(report)
    }

    pub async fn execute(&mut self) -> Option<i32> {
        let mut log = self.console.start_log();
        self.dispatcher.execute(&mut log).await
    }

    pub async fn unload(&mut self) {
        self.dispatcher.unload().await;
    }

    pub async fn shutdown(&mut self) {
        self.dispatcher.unload().await;
    }

    /// Whether quitting may go ahead
    pub fn request_quit(&self, force: bool) -> bool {
        force || !self.is_modified()
    }

    // Metadata

    /// Add an import; returns whether it resolved
    pub fn add_import(&mut self, location: impl Into<String>) -> bool {
        self.metadata_modified = true;
        let import = self.metadata.add_import(location);
        !import.is_broken()
    }

    pub fn remove_import(&mut self, index: usize) -> Option<Import> {
        let removed = self.metadata.remove_import(index);
        if removed.is_some() {
            self.metadata_modified = true;
        }
        removed
    }

    pub fn reset_metadata(&mut self) {
        self.metadata = Metadata::with_defaults(&self.registry);
        self.metadata_modified = true;
    }

    pub fn set_output_kind(&mut self, kind: OutputKind) {
        if self.metadata.output_kind != kind {
            self.metadata.output_kind = kind;
            self.metadata_modified = true;
        }
    }

    pub fn set_auto_load(&mut self, on: bool) {
        if self.metadata.auto_load != on {
            self.metadata.auto_load = on;
            self.metadata_modified = true;
        }
    }

    pub fn set_argument(&mut self, argument: impl Into<String>) {
        let argument = argument.into();
        if self.metadata.argument != argument {
            self.metadata.argument = argument;
            self.metadata_modified = true;
        }
    }
}

async fn modified_time(path: &Path) -> Option<SystemTime> {
    tokio::fs::metadata(path).await.ok()?.modified().ok()
}
