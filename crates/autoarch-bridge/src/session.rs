//! Editor session: the single owner of the canvas, plus the bookkeeping that
//! keeps remote calls from racing each other.
//!
//! The [`Editor`] lives behind `Arc<Mutex<_>>` and is only ever locked for
//! synchronous work. Remote calls run through a [`SessionHandle`], which holds
//! a weak reference so a closed or dropped session simply discards late
//! results.
//!
//! Bulk loads (template, AI generation, bootstrap) share one gate. Reserving a
//! [`BulkLoad`] takes the gate immediately; a second reservation while one is
//! outstanding fails with [`BridgeError::Busy`]. A completion whose ticket is
//! no longer the outstanding one is dropped without touching the graph.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use autoarch_core::canvas::Canvas;
use autoarch_core::inspector::{Inspector, InspectorView};
use autoarch_core::settings::EditorSettings;
use autoarch_core::{Diagram, ProjectType};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{BridgeError, Result};
use crate::service::{AiPrompt, ArchService, CodegenRequest, CodegenResponse};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// A dismissible user notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub id: u64,
    pub level: NoticeLevel,
    pub text: String,
}

/// How the editor should be populated on entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "setupMode", rename_all = "lowercase")]
pub enum StartMode {
    Scratch,
    Template {
        #[serde(rename = "selectedTemplate")]
        template_id: String,
    },
    Ai {
        #[serde(rename = "aiDescription")]
        description: String,
    },
}

/// Hand-off from the project setup flow.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectConfig {
    #[serde(default)]
    pub project_name: String,
    #[serde(default)]
    pub project_type: ProjectType,
    #[serde(flatten)]
    pub mode: StartMode,
}

impl ProjectConfig {
    pub fn scratch(project_name: impl Into<String>, project_type: ProjectType) -> Self {
        Self {
            project_name: project_name.into(),
            project_type,
            mode: StartMode::Scratch,
        }
    }

    /// Blank template ids and blank descriptions mean "start from scratch".
    pub fn effective_mode(&self) -> StartMode {
        match &self.mode {
            StartMode::Template { template_id } if !template_id.trim().is_empty() => {
                StartMode::Template {
                    template_id: template_id.trim().to_string(),
                }
            }
            StartMode::Ai { description } if !description.trim().is_empty() => StartMode::Ai {
                description: description.trim().to_string(),
            },
            _ => StartMode::Scratch,
        }
    }

    pub fn project_name_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        match self.project_name.trim() {
            "" => fallback,
            name => name,
        }
    }
}

/// An outstanding bulk load and the canvas load generation it started from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingLoad {
    ticket: u64,
    generation: u64,
}

#[derive(Debug)]
pub struct Editor {
    canvas: Canvas,
    inspector: Inspector,
    project_name: String,
    project_type: ProjectType,
    next_ticket: u64,
    pending_load: Option<PendingLoad>,
    exporting: bool,
    closed: bool,
    notices: Vec<Notice>,
    next_notice: u64,
}

impl Editor {
    pub fn new(project_name: impl Into<String>, project_type: ProjectType) -> Self {
        Self {
            canvas: Canvas::new(),
            inspector: Inspector::new(),
            project_name: project_name.into(),
            project_type,
            next_ticket: 0,
            pending_load: None,
            exporting: false,
            closed: false,
            notices: Vec::new(),
            next_notice: 0,
        }
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    /// Loading a diagram straight into the canvas also supersedes any
    /// outstanding bulk load.
    pub fn canvas_mut(&mut self) -> &mut Canvas {
        &mut self.canvas
    }

    /// Canvas and inspector together, with the inspector re-bound to the
    /// current selection.
    pub fn inspect(&mut self) -> (&mut Canvas, &mut Inspector) {
        self.inspector.sync(&self.canvas);
        (&mut self.canvas, &mut self.inspector)
    }

    pub fn inspector_view(&self) -> InspectorView {
        self.inspector.view(&self.canvas)
    }

    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    pub fn set_project_name(&mut self, name: impl Into<String>) {
        self.project_name = name.into();
    }

    pub fn project_type(&self) -> ProjectType {
        self.project_type
    }

    /// True while a bulk load is outstanding.
    pub fn is_busy(&self) -> bool {
        self.pending_load.is_some()
    }

    pub fn is_exporting(&self) -> bool {
        self.exporting
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Tears the editor down. Anything still in flight is discarded on arrival.
    pub fn close(&mut self) {
        self.closed = true;
        self.pending_load = None;
        self.canvas.clear_selection();
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn dismiss(&mut self, id: u64) -> bool {
        let before = self.notices.len();
        self.notices.retain(|n| n.id != id);
        self.notices.len() != before
    }

    fn notify(&mut self, level: NoticeLevel, text: impl Into<String>) -> u64 {
        let id = self.next_notice;
        self.next_notice += 1;
        self.notices.push(Notice {
            id,
            level,
            text: text.into(),
        });
        id
    }

    /// Installs a diagram directly. Any outstanding bulk load is superseded
    /// and its result will be discarded.
    pub fn replace_diagram(&mut self, diagram: Diagram) {
        if let Some(pending) = self.pending_load.take() {
            debug!(ticket = pending.ticket, "direct load supersedes outstanding bulk load");
        }
        self.install(diagram);
    }

    fn install(&mut self, diagram: Diagram) {
        self.canvas.load_diagram(diagram);
        self.inspector.sync(&self.canvas);
        info!(
            nodes = self.canvas.graph().nodes().len(),
            edges = self.canvas.graph().edges().len(),
            "diagram loaded"
        );
    }

    fn begin_load(&mut self) -> Result<u64> {
        if self.closed {
            return Err(BridgeError::Discarded);
        }
        if let Some(pending) = self.pending_load {
            debug!(ticket = pending.ticket, "bulk load refused while another is outstanding");
            return Err(BridgeError::Busy);
        }
        let ticket = self.next_ticket;
        self.next_ticket += 1;
        self.pending_load = Some(PendingLoad {
            ticket,
            generation: self.canvas.load_generation(),
        });
        Ok(ticket)
    }

    fn finish_load(&mut self, ticket: u64, kind: LoadKind, outcome: Result<Diagram>) -> Result<()> {
        let Some(pending) = self.pending_load.filter(|p| p.ticket == ticket && !self.closed) else {
            debug!(ticket, "discarding stale bulk load result");
            return Err(BridgeError::Discarded);
        };
        self.pending_load = None;
        if pending.generation != self.canvas.load_generation() {
            debug!(ticket, "canvas was reloaded directly, discarding bulk load result");
            return Err(BridgeError::Discarded);
        }
        match outcome {
            Ok(diagram) => {
                self.install(diagram);
                Ok(())
            }
            Err(error) => {
                warn!(ticket, %error, "bulk load failed, graph untouched");
                self.notify(NoticeLevel::Error, kind.failure(&error));
                Err(error)
            }
        }
    }

    fn abandon_load(&mut self, ticket: u64) {
        if self.pending_load.is_some_and(|p| p.ticket == ticket) {
            debug!(ticket, "bulk load abandoned");
            self.pending_load = None;
        }
    }

    fn begin_export(&mut self) -> Result<CodegenRequest> {
        if self.closed {
            return Err(BridgeError::Discarded);
        }
        if self.exporting {
            return Err(BridgeError::ExportInFlight);
        }
        self.exporting = true;
        Ok(CodegenRequest {
            diagram: self.canvas.to_diagram(),
            project_name: self.project_name.clone(),
        })
    }

    fn finish_export(&mut self, outcome: Result<CodegenResponse>) -> Result<CodegenResponse> {
        self.exporting = false;
        if self.closed {
            return Err(BridgeError::Discarded);
        }
        match outcome {
            Ok(response) => {
                info!(path = %response.path, "code generated");
                self.notify(
                    NoticeLevel::Info,
                    format!("Project generated at: {}", response.path),
                );
                Ok(response)
            }
            Err(error) => {
                warn!(%error, "code generation failed");
                self.notify(
                    NoticeLevel::Error,
                    format!("Code generation failed: {}", error.user_message()),
                );
                Err(error)
            }
        }
    }
}

fn lock(editor: &Mutex<Editor>) -> MutexGuard<'_, Editor> {
    editor.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoadKind {
    Template,
    Ai,
}

impl LoadKind {
    fn failure(self, error: &BridgeError) -> String {
        match self {
            LoadKind::Template => format!("Failed to load template: {}", error.user_message()),
            LoadKind::Ai => format!("Failed to generate architecture: {}", error.user_message()),
        }
    }
}

#[derive(Debug, Clone)]
enum LoadRequest {
    Template(String),
    Ai(AiPrompt),
}

/// Owns the editor. Dropping the session discards every in-flight result.
pub struct Session {
    editor: Arc<Mutex<Editor>>,
    service: Arc<dyn ArchService>,
}

impl Session {
    pub fn new(editor: Editor, service: Arc<dyn ArchService>) -> Self {
        Self {
            editor: Arc::new(Mutex::new(editor)),
            service,
        }
    }

    /// Opens an editor for a project from the setup flow. The initial load,
    /// if any, still has to be started with [`SessionHandle::bootstrap`].
    pub fn open(config: &ProjectConfig, settings: &EditorSettings, service: Arc<dyn ArchService>) -> Self {
        let name = config.project_name_or(&settings.default_project_name);
        Self::new(Editor::new(name, config.project_type), service)
    }

    /// Runs `f` with the editor locked. Do not await inside.
    pub fn with_editor<R>(&self, f: impl FnOnce(&mut Editor) -> R) -> R {
        f(&mut lock(&self.editor))
    }

    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            editor: Arc::downgrade(&self.editor),
            service: Arc::clone(&self.service),
        }
    }
}

/// A weak, cloneable reference used by async tasks.
#[derive(Clone)]
pub struct SessionHandle {
    editor: Weak<Mutex<Editor>>,
    service: Arc<dyn ArchService>,
}

impl SessionHandle {
    fn with_editor<R>(&self, f: impl FnOnce(&mut Editor) -> R) -> Result<R> {
        let editor = self.editor.upgrade().ok_or(BridgeError::Discarded)?;
        let result = f(&mut lock(&editor));
        Ok(result)
    }

    pub fn is_alive(&self) -> bool {
        self.editor.strong_count() > 0
    }

    /// Reserves the bulk-load gate for a template import.
    pub fn load_template(&self, template_id: impl Into<String>) -> Result<BulkLoad> {
        self.reserve(LoadRequest::Template(template_id.into()))
    }

    /// Reserves the bulk-load gate for an AI import.
    pub fn import_ai(&self, description: impl Into<String>, project_type: ProjectType) -> Result<BulkLoad> {
        self.reserve(LoadRequest::Ai(AiPrompt {
            description: description.into(),
            project_type,
        }))
    }

    fn reserve(&self, request: LoadRequest) -> Result<BulkLoad> {
        let ticket = self.with_editor(Editor::begin_load)??;
        Ok(BulkLoad {
            handle: self.clone(),
            ticket,
            request,
            settled: false,
        })
    }

    /// Applies the setup hand-off and reserves its initial load, if it has one.
    pub fn bootstrap(&self, config: &ProjectConfig) -> Result<Option<BulkLoad>> {
        match config.effective_mode() {
            StartMode::Scratch => {
                info!("starting from an empty canvas");
                Ok(None)
            }
            StartMode::Template { template_id } => self.load_template(template_id).map(Some),
            StartMode::Ai { description } => self.import_ai(description, config.project_type).map(Some),
        }
    }

    /// Snapshots the graph and submits it for code generation. The graph is
    /// never modified by this call.
    pub async fn export(&self) -> Result<CodegenResponse> {
        let request = self.with_editor(Editor::begin_export)??;
        let mut guard = ExportGuard {
            editor: self.editor.clone(),
            armed: true,
        };
        let outcome = self.service.generate_code(&request).await;
        guard.armed = false;
        self.with_editor(|editor| editor.finish_export(outcome))?
    }
}

/// Clears the export flag if an export future is dropped mid-flight.
struct ExportGuard {
    editor: Weak<Mutex<Editor>>,
    armed: bool,
}

impl Drop for ExportGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Some(editor) = self.editor.upgrade() {
            lock(&editor).exporting = false;
        }
    }
}

/// A reserved bulk load. [`BulkLoad::run`] performs the remote call and
/// applies the result; dropping it unrun releases the gate.
#[must_use = "a reserved load holds the gate until it is run or dropped"]
pub struct BulkLoad {
    handle: SessionHandle,
    ticket: u64,
    request: LoadRequest,
    settled: bool,
}

impl BulkLoad {
    pub fn ticket(&self) -> u64 {
        self.ticket
    }

    pub async fn run(mut self) -> Result<()> {
        let service = Arc::clone(&self.handle.service);
        let (kind, outcome) = match &self.request {
            LoadRequest::Template(id) => {
                info!(ticket = self.ticket, template = %id, "loading template");
                (LoadKind::Template, service.fetch_template(id).await)
            }
            LoadRequest::Ai(prompt) => {
                info!(
                    ticket = self.ticket,
                    project_type = prompt.project_type.as_str(),
                    "requesting generated architecture"
                );
                (LoadKind::Ai, service.generate_diagram(prompt).await)
            }
        };
        self.settled = true;
        let ticket = self.ticket;
        self.handle
            .with_editor(|editor| editor.finish_load(ticket, kind, outcome))?
    }
}

impl Drop for BulkLoad {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let ticket = self.ticket;
        let _ = self.handle.with_editor(|editor| editor.abandon_load(ticket));
    }
}
