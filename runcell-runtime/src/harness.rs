//! The execution harness
//!
//! [`Harness`] runs one session's code against the shared interpreter and
//! reflects the outcome on the page:
//!
//! 1. clear the output surface,
//! 2. read the editor text,
//! 3. optionally wrap it so printed output becomes the returned value,
//! 4. execute it with a fresh [`ExecutionContext`],
//! 5. render the value or the error, and
//! 6. set the editor's status border.
//!
//! Blocking interpreters are driven with [`Harness::run_blocking`]; suspending
//! ones with [`Harness::run`] and [`Harness::run_all`]. Every entry point is
//! gated on the interpreter having finished [`Harness::initialize`].

use crate::abi::{ExecutionFailure, HarnessError, HarnessResult};
use crate::context::ExecutionContext;
use crate::interpreter::{Interpreter, Preload, SuspendingInterpreter};
use crate::lifecycle::ReadinessGate;
use crate::session::Session;
use crate::wrap::CaptureWrapper;
use futures::stream::{FuturesUnordered, StreamExt};
use runcell_types::{ExecutionRequest, ExecutionResult, SessionId, Status};
use serde::{Deserialize, Serialize};

/// How printed output is collected and shown
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureOptions {
    /// Wrap code so captured stdout is returned as the final expression value
    #[serde(default = "default_true")]
    pub wrap_stdout: bool,

    /// Drop one trailing newline from successful output before rendering
    #[serde(default)]
    pub trim_trailing_newline: bool,
}

fn default_true() -> bool {
    true
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            wrap_stdout: true,
            trim_trailing_newline: false,
        }
    }
}

/// What one run produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunOutcome {
    pub session: SessionId,
    pub result: ExecutionResult,
    pub status: Status,
}

/// Code prepared for submission, with the context that will receive output
struct Prepared {
    request: ExecutionRequest,
    code: String,
    ctx: ExecutionContext,
}

pub struct Harness<I> {
    interpreter: I,
    gate: ReadinessGate,
    wrapper: Option<CaptureWrapper>,
    options: CaptureOptions,
}

impl<I> Harness<I> {
    pub fn new(interpreter: I) -> Self {
        Self {
            interpreter,
            gate: ReadinessGate::new(),
            wrapper: Some(CaptureWrapper::default()),
            options: CaptureOptions::default(),
        }
    }

    pub fn with_capture(mut self, options: CaptureOptions) -> Self {
        self.wrapper = options.wrap_stdout.then(CaptureWrapper::default);
        self.options = options;
        self
    }

    pub fn with_wrapper(mut self, wrapper: CaptureWrapper) -> Self {
        self.wrapper = Some(wrapper);
        self.options.wrap_stdout = true;
        self
    }

    pub fn interpreter(&self) -> &I {
        &self.interpreter
    }

    pub fn gate(&self) -> &ReadinessGate {
        &self.gate
    }

    pub fn options(&self) -> &CaptureOptions {
        &self.options
    }

    /// Steps 1-3: gate check, clear, read, wrap
    fn prepare(&self, session: &Session) -> HarnessResult<Prepared> {
        self.gate.ensure_ready()?;

        match session.output() {
            Some(output) => output.clear(),
            None => tracing::warn!(session = %session.id(), "Session has no output surface"),
        }

        let request = ExecutionRequest::new(session.id(), session.editor().text());
        let code = match &self.wrapper {
            Some(wrapper) => wrapper.wrap(request.source()),
            None => request.source().to_string(),
        };

        tracing::debug!(
            session = %session.id(),
            bytes = request.source().len(),
            wrapped = self.wrapper.is_some(),
            "Submitting code"
        );

        Ok(Prepared {
            request,
            code,
            ctx: session.context(),
        })
    }

    /// Steps 5-6: route the outcome to the surfaces and set the status
    fn finish(
        &self,
        session: &Session,
        request: ExecutionRequest,
        mut ctx: ExecutionContext,
        raw: Result<String, ExecutionFailure>,
    ) -> RunOutcome {
        let mut printed = ctx.take_stdout();

        let result = match raw {
            Ok(value) => {
                printed.push_str(&value);
                if self.options.trim_trailing_newline && printed.ends_with('\n') {
                    printed.pop();
                }
                ExecutionResult::from_text(printed.clone())
            }
            Err(failure) => ExecutionResult::Failure(failure.message),
        };

        if let Some(output) = session.output() {
            match &result {
                ExecutionResult::Value(text) => output.append_escaped(text),
                ExecutionResult::Empty => {}
                ExecutionResult::Failure(message) => {
                    // Output printed before the error stays visible
                    if !printed.is_empty() {
                        output.append_escaped(&printed);
                    }
                    output.append_error(message);
                }
            }
        }

        let status = result.status();
        session.editor().set_status(status);

        match &result {
            ExecutionResult::Failure(message) => tracing::info!(
                session = %request.session(),
                error = %message,
                "Run failed"
            ),
            _ => tracing::debug!(session = %request.session(), "Run succeeded"),
        }

        RunOutcome {
            session: request.session(),
            result,
            status,
        }
    }
}

impl<I: Interpreter> Harness<I> {
    /// Resolve the readiness gate with a blocking interpreter
    pub fn initialize_blocking(&self, preload: &Preload) -> HarnessResult<()> {
        self.gate.begin_loading()?;
        match self.interpreter.load(preload) {
            Ok(()) => {
                self.gate.mark_ready();
                Ok(())
            }
            Err(e) => {
                self.gate.mark_failed(e.to_string());
                Err(HarnessError::InitializationFailed(e.to_string()))
            }
        }
    }

    /// Run one session; returns once the result is rendered
    pub fn run_blocking(&self, session: &Session) -> HarnessResult<RunOutcome> {
        let Prepared {
            request,
            code,
            mut ctx,
        } = self.prepare(session)?;
        let raw = self.interpreter.execute(&code, &mut ctx);
        Ok(self.finish(session, request, ctx, raw))
    }

    /// Run every runnable session one after another, in page order
    pub fn run_all_blocking(&self, sessions: &[Session]) -> Vec<HarnessResult<RunOutcome>> {
        sessions
            .iter()
            .filter(|s| s.is_runnable())
            .map(|s| self.run_blocking(s))
            .collect()
    }
}

impl<I: SuspendingInterpreter> Harness<I> {
    /// Resolve the readiness gate with a suspending interpreter
    pub async fn initialize(&self, preload: &Preload) -> HarnessResult<()> {
        self.gate.begin_loading()?;
        match self.interpreter.load(preload).await {
            Ok(()) => {
                self.gate.mark_ready();
                Ok(())
            }
            Err(e) => {
                self.gate.mark_failed(e.to_string());
                Err(HarnessError::InitializationFailed(e.to_string()))
            }
        }
    }

    /// Run one session; the interpreter call is the only suspension point
    pub async fn run(&self, session: &Session) -> HarnessResult<RunOutcome> {
        let Prepared {
            request,
            code,
            mut ctx,
        } = self.prepare(session)?;
        let raw = self.interpreter.execute(&code, &mut ctx).await;
        Ok(self.finish(session, request, ctx, raw))
    }

    /// Like [`Harness::run`], but waits for the readiness gate instead of
    /// rejecting while the interpreter is still loading
    pub async fn run_when_ready(&self, session: &Session) -> HarnessResult<RunOutcome> {
        self.gate.wait_ready().await?;
        self.run(session).await
    }

    /// Launch every runnable session at once and render each result as it
    /// resolves.
    ///
    /// The returned outcomes are in completion order. There is no ordering
    /// guarantee between sessions; each writes only to its own surfaces.
    pub async fn run_all(&self, sessions: &[Session]) -> Vec<HarnessResult<RunOutcome>> {
        let mut pending: FuturesUnordered<_> = sessions
            .iter()
            .filter(|s| s.is_runnable())
            .map(|s| self.run(s))
            .collect();

        tracing::debug!(count = pending.len(), "Running all sessions");

        let mut outcomes = Vec::with_capacity(pending.len());
        while let Some(outcome) = pending.next().await {
            outcomes.push(outcome);
        }
        outcomes
    }
}
