//! Run-form pages: scanning forms out of HTML and writing results back.
//!
//! A run form looks like
//!
//! ```html
//! <form name='python_run_form'>
//! <textarea name='python_edit'>print("hi")</textarea>
//! <pre class='Output' name='python_output'></pre>
//! <div name='python_canvas'></div>
//! </form>
//! ```
//!
//! The textarea is the editor, the `pre` the output surface and the `div`
//! the canvas. A textarea with id `python_sys_imports` lists modules to
//! import at startup; one with id `python_pre_edit` lists packages to
//! install. Forms holding a `python_run_all` button have no editor.

use regex::Regex;
use runcell_runtime::{
    unescape_html, Editor, HtmlCanvas, HtmlOutput, Preload, Session, SessionRole, TextEditor,
};
use runcell_types::{SessionId, Status};
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use thiserror::Error;

/// Editor id marking the sys-imports form
pub const SYS_IMPORTS_ID: &str = "python_sys_imports";

/// Editor id marking the pre-install form
pub const PREINSTALL_ID: &str = "python_pre_edit";

/// Border shown on run-all buttons once the interpreter is ready
pub const READY_BORDER: &str = "1px solid red";

#[derive(Error, Debug)]
pub enum PageError {
    #[error("Failed to read page {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unclosed <{element}> starting at byte {offset}")]
    Unclosed {
        element: &'static str,
        offset: usize,
    },
}

fn form_open_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)<form\b[^>]*\bname\s*=\s*["']python_run_form["'][^>]*>"#)
            .expect("valid regex")
    })
}

fn element_regex(tag: &str, name: &str) -> Regex {
    Regex::new(&format!(
        r#"(?is)(<{tag}\b[^>]*\bname\s*=\s*["']{name}["'][^>]*)>(.*?)</{tag}\s*>"#
    ))
    .expect("valid regex")
}

fn editor_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| element_regex("textarea", "python_edit"))
}

fn output_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| element_regex("pre", "python_output"))
}

fn canvas_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| element_regex("div", "python_canvas"))
}

fn run_all_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)<button\b[^>]*\bname\s*=\s*["']python_run_all["'][^>]*"#)
            .expect("valid regex")
    })
}

fn id_attr_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(?i)\bid\s*=\s*["']([^"']*)["']"#).expect("valid regex"))
}

fn style_attr_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)\s+style\s*=\s*(?:"[^"]*"|'[^']*')"#).expect("valid regex")
    })
}

/// One run form bound to in-memory surfaces
#[derive(Debug)]
pub struct RunForm {
    id: SessionId,
    role: SessionRole,
    editor: Arc<TextEditor>,
    output: Option<Arc<HtmlOutput>>,
    canvas: Option<Arc<HtmlCanvas>>,
    /// Opening `<textarea ...` tag, without the closing `>`
    editor_tag: Range<usize>,
    output_body: Option<Range<usize>>,
    canvas_body: Option<Range<usize>>,
}

impl RunForm {
    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn role(&self) -> SessionRole {
        self.role
    }

    pub fn editor(&self) -> &Arc<TextEditor> {
        &self.editor
    }

    pub fn output(&self) -> Option<&Arc<HtmlOutput>> {
        self.output.as_ref()
    }

    pub fn canvas(&self) -> Option<&Arc<HtmlCanvas>> {
        self.canvas.as_ref()
    }

    pub fn session(&self) -> Session {
        let mut session = Session::new(self.id, self.editor.clone()).with_role(self.role);
        if let Some(output) = &self.output {
            session = session.with_output(output.clone());
        }
        if let Some(canvas) = &self.canvas {
            session = session.with_canvas(canvas.clone());
        }
        session
    }
}

/// A parsed page: its source plus the forms found in it
#[derive(Debug)]
pub struct Page {
    source: String,
    forms: Vec<RunForm>,
    run_all_buttons: Vec<Range<usize>>,
    ready: bool,
}

impl Page {
    pub fn from_file(path: &Path) -> Result<Self, PageError> {
        let source = std::fs::read_to_string(path).map_err(|source| PageError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(source)
    }

    pub fn parse(source: impl Into<String>) -> Result<Self, PageError> {
        let source = source.into();
        let mut forms = Vec::new();
        let mut run_all_buttons = Vec::new();

        for open in form_open_regex().find_iter(&source) {
            let body_start = open.end();
            let body_len = find_ignore_case(&source[body_start..], "</form")
                .ok_or(PageError::Unclosed {
                    element: "form",
                    offset: open.start(),
                })?;
            let body = &source[body_start..body_start + body_len];

            for button in run_all_regex().find_iter(body) {
                run_all_buttons.push(body_start + button.start()..body_start + button.end());
            }

            let Some(editor) = editor_regex().captures(body) else {
                let pos = find_ignore_case(body, "<textarea")
                    .filter(|_| body.contains("python_edit"));
                if let Some(pos) = pos {
                    return Err(PageError::Unclosed {
                        element: "textarea",
                        offset: body_start + pos,
                    });
                }
                continue;
            };

            let (Some(tag), Some(text)) = (editor.get(1), editor.get(2)) else {
                continue;
            };

            let role = match id_attr_regex()
                .captures(tag.as_str())
                .and_then(|c| c.get(1))
                .map(|m| m.as_str())
            {
                Some(SYS_IMPORTS_ID) => SessionRole::SysImports,
                Some(PREINSTALL_ID) => SessionRole::Preinstall,
                _ => SessionRole::Cell,
            };

            let output = output_regex()
                .captures(body)
                .and_then(|c| c.get(2))
                .map(|m| body_start + m.start()..body_start + m.end());
            let canvas = canvas_regex()
                .captures(body)
                .and_then(|c| c.get(2))
                .map(|m| body_start + m.start()..body_start + m.end());

            let id = SessionId(forms.len() as u64);
            tracing::debug!(session = %id, ?role, "Found run form");

            forms.push(RunForm {
                id,
                role,
                editor: Arc::new(TextEditor::new(editor_text(text.as_str()))),
                output: output
                    .clone()
                    .map(|r| Arc::new(HtmlOutput::with_html(&source[r]))),
                canvas: canvas
                    .clone()
                    .map(|r| Arc::new(HtmlCanvas::with_html(&source[r]))),
                editor_tag: body_start + tag.start()..body_start + tag.end(),
                output_body: output,
                canvas_body: canvas,
            });
        }

        Ok(Self {
            source,
            forms,
            run_all_buttons,
            ready: false,
        })
    }

    pub fn forms(&self) -> &[RunForm] {
        &self.forms
    }

    pub fn form(&self, id: SessionId) -> Option<&RunForm> {
        self.forms.iter().find(|f| f.id == id)
    }

    /// Sessions for every form, in page order
    pub fn sessions(&self) -> Vec<Session> {
        self.forms.iter().map(RunForm::session).collect()
    }

    pub fn has_run_all(&self) -> bool {
        !self.run_all_buttons.is_empty()
    }

    /// Extend `base` with the page's sys-imports and pre-install lists
    pub fn preload(&self, base: Preload) -> Preload {
        let mut preload = base;
        for form in &self.forms {
            let entries = Preload::parse_list(&form.editor.text());
            match form.role {
                SessionRole::SysImports => preload = preload.with_imports(entries),
                SessionRole::Preinstall => preload = preload.with_installs(entries),
                SessionRole::Cell => {}
            }
        }
        preload
    }

    /// Mark the interpreter as ready; run-all buttons get the ready border
    pub fn set_ready(&mut self, ready: bool) {
        self.ready = ready;
    }

    /// Write surfaces and editor borders back into the page source
    pub fn render(&self) -> String {
        let mut edits: Vec<(Range<usize>, String)> = Vec::new();

        for form in &self.forms {
            if let Some(status) = form.editor.status() {
                edits.push((
                    form.editor_tag.clone(),
                    with_border(&self.source[form.editor_tag.clone()], status.border()),
                ));
            }
            if let (Some(range), Some(output)) = (&form.output_body, &form.output) {
                edits.push((range.clone(), output.html()));
            }
            if let (Some(range), Some(canvas)) = (&form.canvas_body, &form.canvas) {
                edits.push((range.clone(), canvas.html()));
            }
        }

        if self.ready {
            for button in &self.run_all_buttons {
                edits.push((
                    button.clone(),
                    with_border(&self.source[button.clone()], READY_BORDER),
                ));
            }
        }

        edits.sort_by_key(|(range, _)| range.start);

        let mut out = String::with_capacity(self.source.len());
        let mut cursor = 0;
        for (range, replacement) in edits {
            out.push_str(&self.source[cursor..range.start]);
            out.push_str(&replacement);
            cursor = range.end;
        }
        out.push_str(&self.source[cursor..]);
        out
    }
}

/// `(ok, failed)` counts over the forms that have run
pub fn status_counts(page: &Page) -> (usize, usize) {
    page.forms
        .iter()
        .filter_map(|f| f.editor.status())
        .fold((0, 0), |(ok, failed), status| match status {
            Status::Ok => (ok + 1, failed),
            Status::Failed => (ok, failed + 1),
        })
}

/// Textarea contents as the editor sees them: entities decoded and the
/// newline directly after the opening tag dropped
fn editor_text(raw: &str) -> String {
    let raw = raw
        .strip_prefix("\r\n")
        .or_else(|| raw.strip_prefix('\n'))
        .unwrap_or(raw);
    unescape_html(raw)
}

/// Replace any `style` attribute on an open tag with a border style
fn with_border(open_tag: &str, border: &str) -> String {
    let stripped = style_attr_regex().replace_all(open_tag, "");
    format!("{} style=\"border: {}\"", stripped, border)
}

fn find_ignore_case(haystack: &str, needle: &str) -> Option<usize> {
    haystack
        .as_bytes()
        .windows(needle.len())
        .position(|w| w.eq_ignore_ascii_case(needle.as_bytes()))
}
