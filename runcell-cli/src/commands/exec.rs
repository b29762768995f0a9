//! Run a single snippet and print what it produced.

use super::read_input;
use crate::config::Config;
use anyhow::{anyhow, Context, Result};
use runcell_runtime::{Harness, HtmlCanvas, PythonKernel, Session, TextEditor};
use runcell_types::{ExecutionResult, SessionId};
use std::path::Path;
use std::sync::Arc;

pub fn exec_snippet(config_path: &Path, file: Option<&Path>) -> Result<()> {
    let config = Config::load_or_default(config_path).context("Failed to load configuration")?;
    let code = read_input(file)?;

    let kernel =
        PythonKernel::spawn(&config.kernel_config()).context("Failed to start Python kernel")?;
    let harness = Harness::new(kernel).with_capture(config.capture.clone());
    harness
        .initialize_blocking(&config.preload)
        .context("Failed to initialize interpreter")?;

    let canvas = Arc::new(HtmlCanvas::new());
    let session =
        Session::new(SessionId(0), Arc::new(TextEditor::new(code))).with_canvas(canvas.clone());

    let outcome = harness.run_blocking(&session)?;
    if canvas.child_count() > 0 {
        tracing::info!(canvas = %canvas.html(), "Canvas updated");
    }

    match outcome.result {
        ExecutionResult::Value(text) => {
            print!("{}", text);
            Ok(())
        }
        ExecutionResult::Empty => Ok(()),
        ExecutionResult::Failure(message) => Err(anyhow!(message)),
    }
}
