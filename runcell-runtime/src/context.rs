//! Per-invocation execution context
//!
//! Every run gets its own [`ExecutionContext`]: the interpreter writes the
//! invocation's standard output into it and reaches the session's canvas
//! through it. Nothing here is shared between invocations, so two sessions
//! running against one interpreter cannot see each other's output.

use runcell_types::{DrawPayload, SessionId};
use std::fmt;
use std::sync::Arc;

/// Drawing callback bound to a session's canvas
pub type DrawHook = Arc<dyn Fn(&DrawPayload) + Send + Sync>;

pub struct ExecutionContext {
    session: SessionId,
    stdout: String,
    draw: Option<DrawHook>,
    draw_count: usize,
}

impl ExecutionContext {
    pub fn new(session: SessionId) -> Self {
        Self {
            session,
            stdout: String::new(),
            draw: None,
            draw_count: 0,
        }
    }

    pub fn with_draw_hook(mut self, hook: DrawHook) -> Self {
        self.draw = Some(hook);
        self
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Append captured standard output
    pub fn write_stdout(&mut self, text: &str) {
        self.stdout.push_str(text);
    }

    pub fn stdout(&self) -> &str {
        &self.stdout
    }

    pub fn take_stdout(&mut self) -> String {
        std::mem::take(&mut self.stdout)
    }

    /// Forward a payload to the session's canvas.
    ///
    /// Returns false when the session has no canvas; the call is then a no-op.
    pub fn draw(&mut self, payload: &DrawPayload) -> bool {
        match &self.draw {
            Some(hook) => {
                hook(payload);
                self.draw_count += 1;
                true
            }
            None => {
                tracing::warn!(session = %self.session, "Draw call without a canvas surface");
                false
            }
        }
    }

    pub fn draw_count(&self) -> usize {
        self.draw_count
    }

    /// Debug output from executed code; goes to the log, never to the page
    pub fn debug(&self, text: &str) {
        tracing::debug!(session = %self.session, "{}", text);
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("session", &self.session)
            .field("stdout", &self.stdout)
            .field("has_canvas", &self.draw.is_some())
            .field("draw_count", &self.draw_count)
            .finish()
    }
}
