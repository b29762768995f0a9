//! Wrap code read from standard input in a run form.

use super::read_input;
use anyhow::{Context, Result};

pub fn print_form(run_button: bool) -> Result<()> {
    let code = read_input(None)?;
    let html = runcell_render::render_form(&code, run_button).context("Failed to render form")?;
    println!("{}", html);
    Ok(())
}
