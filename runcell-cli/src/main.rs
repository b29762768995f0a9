//! # runcell CLI
//!
//! Command-line interface for running run-form pages against a Python kernel.

mod commands;
mod config;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "runcell")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(long, default_value = "runcell.yml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every form on a page and write the page back with results
    Run {
        /// HTML or Markdown page containing run forms
        page: PathBuf,

        /// Write the rewritten page here instead of standard output
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Print a JSON report of every run
        #[arg(long)]
        json: bool,

        /// Launch every cell at once instead of one at a time in page order.
        /// Only safe when cells do not depend on each other.
        #[arg(long)]
        concurrent: bool,

        /// Exit with an error if any cell failed
        #[arg(long)]
        strict: bool,
    },

    /// Run one snippet (file or standard input) and print its output
    Exec {
        /// Source file; reads standard input when omitted
        file: Option<PathBuf>,
    },

    /// Wrap code from standard input in an escaped run form
    Form {
        /// Leave out the static Run button
        #[arg(long)]
        no_button: bool,
    },

    /// Convert a commented Python notebook into a post
    Post {
        /// Notebook source (.py)
        notebook: PathBuf,

        /// Write the post here instead of `_posts/<stem>.markdown`
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries command output
    let subscriber = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(if cli.verbose {
                tracing::Level::DEBUG.into()
            } else {
                tracing::Level::INFO.into()
            }),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Run {
            page,
            output,
            json,
            concurrent,
            strict,
        } => {
            let opts = commands::RunOptions {
                output,
                json,
                concurrent,
                strict,
            };
            commands::run_page(&cli.config, &page, opts).await
        }
        Commands::Exec { file } => {
            let config = cli.config.clone();
            tokio::task::spawn_blocking(move || commands::exec_snippet(&config, file.as_deref()))
                .await?
        }
        Commands::Form { no_button } => commands::print_form(!no_button),
        Commands::Post { notebook, output } => {
            commands::write_post(&notebook, output.as_deref())
        }
    }
}
