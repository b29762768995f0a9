//! Interpreter execution contracts
//!
//! Two contracts are supported:
//!
//! - [`Interpreter`]: blocking. `execute` returns the outcome before it
//!   returns control.
//! - [`SuspendingInterpreter`]: `execute` is a future; the only suspension
//!   point of a run is this call.
//!
//! [`Offloaded`] turns any blocking interpreter into a suspending one by
//! running each call on tokio's blocking pool.

use crate::abi::{ExecutionFailure, KernelError};
use crate::context::ExecutionContext;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Bootstrap run in the shared namespace once imports are done
pub const DEFAULT_BOOTSTRAP: &str = "import io, sys\n";

/// Work done once while the interpreter initializes
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Preload {
    /// Modules to import into the shared namespace
    #[serde(default)]
    pub imports: Vec<String>,

    /// Packages to install before importing
    #[serde(default)]
    pub installs: Vec<String>,

    /// Code to run in the shared namespace after imports
    #[serde(default = "default_bootstrap")]
    pub bootstrap: String,
}

fn default_bootstrap() -> String {
    DEFAULT_BOOTSTRAP.to_string()
}

impl Preload {
    pub fn new() -> Self {
        Self {
            bootstrap: default_bootstrap(),
            ..Self::default()
        }
    }

    pub fn with_imports<I, S>(mut self, imports: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.imports.extend(imports.into_iter().map(Into::into));
        self
    }

    pub fn with_installs<I, S>(mut self, installs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.installs.extend(installs.into_iter().map(Into::into));
        self
    }

    pub fn with_bootstrap(mut self, bootstrap: impl Into<String>) -> Self {
        self.bootstrap = bootstrap.into();
        self
    }

    /// Parse a list typed into a form: entries separated by newlines or commas
    pub fn parse_list(text: &str) -> Vec<String> {
        text.split(['\n', '\r', ','])
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(|entry| entry.trim_matches(|c| c == '"' || c == '\'').to_string())
            .filter(|entry| !entry.is_empty())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.imports.is_empty() && self.installs.is_empty() && self.bootstrap.trim().is_empty()
    }
}

/// Blocking execution contract
pub trait Interpreter: Send + Sync {
    /// One-time initialization (package installs, imports, bootstrap code)
    fn load(&self, _preload: &Preload) -> Result<(), KernelError> {
        Ok(())
    }

    /// Run `code`; on success return the value of its final expression as text
    fn execute(&self, code: &str, ctx: &mut ExecutionContext) -> Result<String, ExecutionFailure>;
}

/// Suspending execution contract
#[async_trait]
pub trait SuspendingInterpreter: Send + Sync {
    async fn load(&self, _preload: &Preload) -> Result<(), KernelError> {
        Ok(())
    }

    async fn execute(
        &self,
        code: &str,
        ctx: &mut ExecutionContext,
    ) -> Result<String, ExecutionFailure>;
}

impl<T: Interpreter + ?Sized> Interpreter for Arc<T> {
    fn load(&self, preload: &Preload) -> Result<(), KernelError> {
        (**self).load(preload)
    }

    fn execute(&self, code: &str, ctx: &mut ExecutionContext) -> Result<String, ExecutionFailure> {
        (**self).execute(code, ctx)
    }
}

/// Adapter running a blocking interpreter on tokio's blocking pool
pub struct Offloaded<I> {
    inner: Arc<I>,
}

impl<I> Offloaded<I> {
    pub fn new(inner: I) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }

    pub fn from_arc(inner: Arc<I>) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &Arc<I> {
        &self.inner
    }
}

#[async_trait]
impl<I: Interpreter + 'static> SuspendingInterpreter for Offloaded<I> {
    async fn load(&self, preload: &Preload) -> Result<(), KernelError> {
        let inner = Arc::clone(&self.inner);
        let preload = preload.clone();
        tokio::task::spawn_blocking(move || inner.load(&preload))
            .await
            .map_err(|e| KernelError::Aborted(e.to_string()))?
    }

    async fn execute(
        &self,
        code: &str,
        ctx: &mut ExecutionContext,
    ) -> Result<String, ExecutionFailure> {
        let inner = Arc::clone(&self.inner);
        let code = code.to_string();
        // The context moves onto the blocking thread and comes back with the
        // captured output.
        let session = ctx.session();
        let mut owned = std::mem::replace(ctx, ExecutionContext::new(session));

        let joined = tokio::task::spawn_blocking(move || {
            let result = inner.execute(&code, &mut owned);
            (owned, result)
        })
        .await;

        match joined {
            Ok((owned, result)) => {
                *ctx = owned;
                result
            }
            Err(e) => Err(ExecutionFailure::new(format!(
                "Interpreter task aborted: {}",
                e
            ))),
        }
    }
}
