//! Editor, output and canvas surfaces
//!
//! The harness only talks to the page through these capability traits. The
//! in-memory implementations below keep their state as HTML fragments, which
//! is what the page writer splices back into a document.

use parking_lot::{Mutex, RwLock};
use runcell_types::{DrawPayload, Status};

/// Source of the code to run; also carries the status border
pub trait Editor: Send + Sync {
    /// Current text, read fresh on every call
    fn text(&self) -> String;

    fn set_status(&self, status: Status);
}

/// Where results and errors are written
pub trait OutputSurface: Send + Sync {
    /// Remove all content. Safe to call on an empty surface.
    fn clear(&self);

    /// Append text, HTML-escaped
    fn append_escaped(&self, text: &str);

    /// Append text, HTML-escaped and rendered in the error color
    fn append_error(&self, text: &str);
}

/// Graphical output surface reachable from executed code
pub trait CanvasSurface: Send + Sync {
    /// Replace the whole canvas with a single image bound to `payload`
    fn replace_with_image(&self, payload: &DrawPayload);
}

/// HTML escape function to prevent injection
pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

/// Inverse of [`escape_html`], plus the numeric forms browsers accept
pub fn unescape_html(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }

    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];

        let decoded = rest.find(';').and_then(|end| {
            let entity = &rest[1..end];
            let ch = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                _ => entity
                    .strip_prefix("#x")
                    .or_else(|| entity.strip_prefix("#X"))
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                    .and_then(char::from_u32),
            };
            ch.map(|c| (c, end))
        });

        match decoded {
            Some((c, end)) => {
                out.push(c);
                rest = &rest[end + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Plain text editor handle
#[derive(Debug, Default)]
pub struct TextEditor {
    text: RwLock<String>,
    status: RwLock<Option<Status>>,
}

impl TextEditor {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: RwLock::new(text.into()),
            status: RwLock::new(None),
        }
    }

    pub fn set_text(&self, text: impl Into<String>) {
        *self.text.write() = text.into();
    }

    /// Last status set by a run, if any run has finished
    pub fn status(&self) -> Option<Status> {
        *self.status.read()
    }

    /// Border style to render, if a run has finished
    pub fn border(&self) -> Option<&'static str> {
        self.status().map(|s| s.border())
    }
}

impl Editor for TextEditor {
    fn text(&self) -> String {
        self.text.read().clone()
    }

    fn set_status(&self, status: Status) {
        *self.status.write() = Some(status);
    }
}

/// Output surface backed by an HTML fragment (the inside of a `<pre>`)
#[derive(Debug, Default)]
pub struct HtmlOutput {
    html: Mutex<String>,
}

impl HtmlOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from markup already on the page
    pub fn with_html(html: impl Into<String>) -> Self {
        Self {
            html: Mutex::new(html.into()),
        }
    }

    pub fn html(&self) -> String {
        self.html.lock().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.html.lock().is_empty()
    }
}

impl OutputSurface for HtmlOutput {
    fn clear(&self) {
        self.html.lock().clear();
    }

    fn append_escaped(&self, text: &str) {
        self.html.lock().push_str(&escape_html(text));
    }

    fn append_error(&self, text: &str) {
        let mut html = self.html.lock();
        html.push_str("<span style=\"color:red\">");
        html.push_str(&escape_html(text));
        html.push_str("</span>");
    }
}

/// Canvas surface backed by a list of child elements (the inside of a `<div>`)
#[derive(Debug, Default)]
pub struct HtmlCanvas {
    children: Mutex<Vec<String>>,
}

impl HtmlCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from markup already on the page, kept as one child
    pub fn with_html(html: impl Into<String>) -> Self {
        let html = html.into();
        let children = if html.trim().is_empty() {
            Vec::new()
        } else {
            vec![html]
        };
        Self {
            children: Mutex::new(children),
        }
    }

    pub fn html(&self) -> String {
        self.children.lock().concat()
    }

    pub fn child_count(&self) -> usize {
        self.children.lock().len()
    }
}

impl CanvasSurface for HtmlCanvas {
    fn replace_with_image(&self, payload: &DrawPayload) {
        let mut children = self.children.lock();
        children.clear();
        children.push(format!("<img src=\"{}\">", escape_html(payload.as_str())));
    }
}
