//! Askama template definitions.

use crate::notebook::Chunk;
use crate::page::{PREINSTALL_ID, SYS_IMPORTS_ID};
use askama::Template;
use runcell_runtime::escape_html;

/// A single code run form
#[derive(Template)]
#[template(path = "run_form.html")]
pub struct RunFormTemplate {
    /// HTML-escaped source
    pub code: String,
    /// Emit a static Run button (pages without a script that adds one)
    pub run_button: bool,
}

impl RunFormTemplate {
    pub fn new(source: &str, run_button: bool) -> Self {
        Self {
            code: escape_html(source.trim_matches(|c| c == '\n' || c == '\r')),
            run_button,
        }
    }
}

/// A collapsible form holding a package list
#[derive(Template)]
#[template(path = "list_form.html")]
pub struct ListFormTemplate {
    pub summary: &'static str,
    pub blurb: &'static str,
    pub element_id: &'static str,
    /// HTML-escaped entries, one per line
    pub entries: String,
}

impl ListFormTemplate {
    pub fn sys_imports(entries: &[String]) -> Self {
        Self {
            summary: "System Imports",
            blurb: "These modules are imported when the interpreter starts. Make sure they \
                    are installed if you run the program directly on your machine.",
            element_id: SYS_IMPORTS_ID,
            entries: escape_lines(entries),
        }
    }

    pub fn installs(entries: &[String]) -> Self {
        Self {
            summary: "Available Packages",
            blurb: "These packages are installed before any cell runs. Install them too \
                    if you run the program directly on your machine.",
            element_id: PREINSTALL_ID,
            entries: escape_lines(entries),
        }
    }
}

fn escape_lines(entries: &[String]) -> String {
    entries
        .iter()
        .map(|e| escape_html(e))
        .collect::<Vec<_>>()
        .join("\n")
}

/// The form holding the Run all button
#[derive(Template)]
#[template(path = "run_all.html")]
pub struct RunAllTemplate {}

/// A rendered notebook chunk
#[derive(Debug, Clone)]
pub struct PostBlock {
    pub html: String,
    /// The first prose block is followed by the contents and Run all header
    pub intro: bool,
    /// Raw code kept in an HTML comment ahead of its run form
    pub source: Option<String>,
}

/// Post page generated from a notebook
#[derive(Template)]
#[template(path = "post.html")]
pub struct PostTemplate {
    pub blocks: Vec<PostBlock>,
    pub run_all: String,
}

impl PostTemplate {
    pub fn from_chunks(chunks: &[Chunk]) -> askama::Result<Self> {
        let mut blocks = Vec::with_capacity(chunks.len());
        let mut seen_prose = false;

        for chunk in chunks {
            let mut source = None;
            let (html, intro) = match chunk {
                Chunk::Prose(text) => {
                    let intro = !seen_prose;
                    seen_prose = true;
                    (text.clone(), intro)
                }
                Chunk::SysImports(entries) => {
                    (ListFormTemplate::sys_imports(entries).render()?, false)
                }
                Chunk::Installs(entries) => (ListFormTemplate::installs(entries).render()?, false),
                Chunk::Code(code) => {
                    source = Some(code.clone());
                    (RunFormTemplate::new(code, false).render()?, false)
                }
            };
            blocks.push(PostBlock {
                html,
                intro,
                source,
            });
        }

        Ok(Self {
            blocks,
            run_all: RunAllTemplate {}.render()?,
        })
    }
}

/// Render one run form around `source`
pub fn render_form(source: &str, run_button: bool) -> askama::Result<String> {
    RunFormTemplate::new(source, run_button).render()
}

/// Render a whole post from notebook chunks
pub fn render_post(chunks: &[Chunk]) -> askama::Result<String> {
    PostTemplate::from_chunks(chunks)?.render()
}
