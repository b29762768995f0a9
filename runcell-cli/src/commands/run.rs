//! Run every run form on a page and write the results back.

use super::write_output;
use crate::config::Config;
use anyhow::{bail, Context, Result};
use runcell_render::{status_counts, Page};
use runcell_runtime::{Harness, HarnessResult, Offloaded, PythonKernel, RunOutcome};
use runcell_types::Status;
use serde::Serialize;
use std::path::{Path, PathBuf};

pub struct RunOptions {
    pub output: Option<PathBuf>,
    pub json: bool,
    pub concurrent: bool,
    pub strict: bool,
}

#[derive(Serialize)]
struct RunReport<'a> {
    page: &'a Path,
    python: &'a str,
    ok: usize,
    failed: usize,
    outcomes: &'a [RunOutcome],
}

pub async fn run_page(config_path: &Path, page_path: &Path, opts: RunOptions) -> Result<()> {
    let config = Config::load_or_default(config_path).context("Failed to load configuration")?;
    let mut page = Page::from_file(page_path)?;
    tracing::info!(
        page = %page_path.display(),
        forms = page.forms().len(),
        "Loaded page"
    );

    let kernel_config = config.kernel_config();
    let kernel = tokio::task::spawn_blocking(move || PythonKernel::spawn(&kernel_config))
        .await
        .context("Kernel start task failed")?
        .context("Failed to start Python kernel")?;
    let python = kernel.version().to_string();

    let harness = Harness::new(Offloaded::new(kernel)).with_capture(config.capture.clone());
    let preload = page.preload(config.preload.clone());
    harness
        .initialize(&preload)
        .await
        .context("Failed to initialize interpreter")?;
    page.set_ready(true);

    let sessions = page.sessions();
    // Cells share one namespace, so page order is the default
    let results: Vec<HarnessResult<RunOutcome>> = if opts.concurrent {
        harness.run_all(&sessions).await
    } else {
        let mut results = Vec::new();
        for session in sessions.iter().filter(|s| s.is_runnable()) {
            results.push(harness.run(session).await);
        }
        results
    };

    let mut outcomes = results.into_iter().collect::<HarnessResult<Vec<_>>>()?;
    outcomes.sort_by_key(|o| o.session);

    let (ok, failed) = status_counts(&page);
    tracing::info!(ok, failed, "Run complete");

    let html = page.render();
    if opts.json {
        let report = RunReport {
            page: page_path,
            python: &python,
            ok,
            failed,
            outcomes: &outcomes,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        if let Some(path) = opts.output.as_deref() {
            write_output(Some(path), &html)?;
        }
    } else {
        write_output(opts.output.as_deref(), &html)?;
    }

    if opts.strict && outcomes.iter().any(|o| o.status == Status::Failed) {
        bail!("{} of {} cells failed", failed, outcomes.len());
    }

    Ok(())
}
