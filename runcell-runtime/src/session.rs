//! Sessions: one editor + output (+ canvas) binding on a page

use crate::context::{DrawHook, ExecutionContext};
use crate::surfaces::{CanvasSurface, Editor, OutputSurface};
use runcell_types::{DrawPayload, SessionId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// What a run form is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionRole {
    /// Ordinary code cell
    #[default]
    Cell,
    /// Lists modules to import while the interpreter initializes
    SysImports,
    /// Lists packages to install before anything runs
    Preinstall,
}

/// Runtime binding of one editor to its output and canvas surfaces.
///
/// Output and canvas are optional: a page may omit either element, and the
/// harness treats a missing surface as a rendering no-op.
#[derive(Clone)]
pub struct Session {
    id: SessionId,
    role: SessionRole,
    editor: Arc<dyn Editor>,
    output: Option<Arc<dyn OutputSurface>>,
    canvas: Option<Arc<dyn CanvasSurface>>,
}

impl Session {
    pub fn new(id: SessionId, editor: Arc<dyn Editor>) -> Self {
        Self {
            id,
            role: SessionRole::Cell,
            editor,
            output: None,
            canvas: None,
        }
    }

    pub fn with_role(mut self, role: SessionRole) -> Self {
        self.role = role;
        self
    }

    pub fn with_output(mut self, output: Arc<dyn OutputSurface>) -> Self {
        self.output = Some(output);
        self
    }

    pub fn with_canvas(mut self, canvas: Arc<dyn CanvasSurface>) -> Self {
        self.canvas = Some(canvas);
        self
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn role(&self) -> SessionRole {
        self.role
    }

    pub fn editor(&self) -> &Arc<dyn Editor> {
        &self.editor
    }

    pub fn output(&self) -> Option<&Arc<dyn OutputSurface>> {
        self.output.as_ref()
    }

    pub fn canvas(&self) -> Option<&Arc<dyn CanvasSurface>> {
        self.canvas.as_ref()
    }

    /// Only code cells take part in run-all
    pub fn is_runnable(&self) -> bool {
        self.role == SessionRole::Cell
    }

    /// Drawing callback that replaces this session's canvas contents
    pub fn draw_hook(&self) -> Option<DrawHook> {
        self.canvas.as_ref().map(|canvas| {
            let canvas = Arc::clone(canvas);
            Arc::new(move |payload: &DrawPayload| canvas.replace_with_image(payload)) as DrawHook
        })
    }

    /// Fresh context for one invocation of this session
    pub fn context(&self) -> ExecutionContext {
        let ctx = ExecutionContext::new(self.id);
        match self.draw_hook() {
            Some(hook) => ctx.with_draw_hook(hook),
            None => ctx,
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("role", &self.role)
            .field("has_output", &self.output.is_some())
            .field("has_canvas", &self.canvas.is_some())
            .finish()
    }
}
