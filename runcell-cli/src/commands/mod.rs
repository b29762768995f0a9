//! CLI command implementations.

pub mod exec;
pub mod form;
pub mod post;
pub mod run;

pub use exec::exec_snippet;
pub use form::print_form;
pub use post::write_post;
pub use run::{run_page, RunOptions};

use anyhow::{Context, Result};
use std::io::Read;
use std::path::Path;

/// Read a file, or standard input when no path is given
pub(crate) fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display())),
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read standard input")?;
            Ok(text)
        }
    }
}

/// Write to a file, or standard output when no path is given
pub(crate) fn write_output(path: Option<&Path>, text: &str) -> Result<()> {
    match path {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            std::fs::write(path, text)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!(path = %path.display(), "Wrote output");
            Ok(())
        }
        None => {
            print!("{}", text);
            Ok(())
        }
    }
}
