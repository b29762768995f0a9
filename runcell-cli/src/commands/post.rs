//! Convert a commented Python notebook into a post.

use super::{read_input, write_output};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Where a post lands when no output is given: `_posts/<stem>.markdown`
pub fn default_post_path(notebook: &Path) -> PathBuf {
    let stem = notebook
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    Path::new("_posts").join(format!("{}.markdown", stem))
}

pub fn write_post(notebook: &Path, output: Option<&Path>) -> Result<()> {
    let source = read_input(Some(notebook))?;
    let chunks = runcell_render::split(&source)
        .with_context(|| format!("Failed to split {}", notebook.display()))?;

    let code_cells = chunks
        .iter()
        .filter(|c| matches!(c, runcell_render::Chunk::Code(_)))
        .count();
    tracing::info!(
        notebook = %notebook.display(),
        chunks = chunks.len(),
        code_cells,
        "Rendering post"
    );

    let mut html = runcell_render::render_post(&chunks).context("Failed to render post")?;
    if !html.ends_with('\n') {
        html.push('\n');
    }
    let target = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_post_path(notebook));
    write_output(Some(&target), &html)
}
