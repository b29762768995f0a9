//! Runcell Runtime - run-form execution harness
//!
//! This crate connects code editors on a page to one shared interpreter:
//!
//! - **Surfaces**: editor, output and canvas traits plus in-memory HTML
//!   implementations
//! - **Sessions**: one editor with its optional output and canvas
//! - **Readiness gate**: runs are refused until the interpreter has loaded
//! - **Harness**: clear, read, wrap, execute, render, set status
//! - **Kernel**: a persistent Python process shared by every session
//!
//! ## Example
//!
//! ```rust,no_run
//! use runcell_runtime::{
//!     Harness, HtmlOutput, KernelConfig, Preload, PythonKernel, Session, TextEditor,
//! };
//! use runcell_types::SessionId;
//! use std::sync::Arc;
//!
//! let kernel = PythonKernel::spawn(&KernelConfig::default()).unwrap();
//! let harness = Harness::new(kernel);
//! harness.initialize_blocking(&Preload::new()).unwrap();
//!
//! let output = Arc::new(HtmlOutput::new());
//! let session = Session::new(SessionId(0), Arc::new(TextEditor::new("print('hi')")))
//!     .with_output(output.clone());
//!
//! harness.run_blocking(&session).unwrap();
//! assert_eq!(output.html(), "hi\n");
//! ```
//!
//! ## Output capture
//!
//! By default code is wrapped so that everything it prints is returned as the
//! value of its final expression. The harness escapes that text before it is
//! inserted into the output surface; a failed run shows its error message in
//! red and gives the editor a red border.

pub mod abi;
pub mod context;
pub mod harness;
pub mod interpreter;
pub mod kernel;
pub mod lifecycle;
pub mod session;
pub mod surfaces;
pub mod wrap;

#[cfg(test)]
mod tests;

pub use abi::{ExecutionFailure, HarnessError, HarnessResult, KernelError};

pub use context::{DrawHook, ExecutionContext};

pub use harness::{CaptureOptions, Harness, RunOutcome};

pub use interpreter::{Interpreter, Offloaded, Preload, SuspendingInterpreter, DEFAULT_BOOTSTRAP};

pub use kernel::{KernelConfig, PythonKernel};

pub use lifecycle::{Lifecycle, ReadinessGate};

pub use session::{Session, SessionRole};

pub use surfaces::{
    escape_html, unescape_html, CanvasSurface, Editor, HtmlCanvas, HtmlOutput, OutputSurface,
    TextEditor,
};

pub use wrap::CaptureWrapper;
