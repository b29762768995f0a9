//! Interpreter readiness gate
//!
//! The embedded interpreter is shared by every session on a page and must
//! finish its asynchronous initialization before anything may run. The gate
//! tracks that as an explicit state machine:
//!
//! ```text
//! Uninitialized -> Loading -> Ready
//!                          -> Failed(reason) -> Loading (retry)
//! ```
//!
//! Run entry points consult [`ReadinessGate::ensure_ready`] and reject with a
//! typed [`HarnessError::NotReady`] instead of failing inside the interpreter.
//! Callers that prefer to queue can await [`ReadinessGate::wait_ready`].

use crate::abi::{HarnessError, HarnessResult};
use serde::Serialize;
use std::fmt;
use tokio::sync::watch;

/// Interpreter lifecycle state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "lowercase")]
pub enum Lifecycle {
    Uninitialized,
    Loading,
    Ready,
    Failed(String),
}

impl Lifecycle {
    pub fn is_ready(&self) -> bool {
        matches!(self, Lifecycle::Ready)
    }

    /// Ready or Failed: no further transition without a new initialize call
    pub fn is_settled(&self) -> bool {
        matches!(self, Lifecycle::Ready | Lifecycle::Failed(_))
    }
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lifecycle::Uninitialized => write!(f, "uninitialized"),
            Lifecycle::Loading => write!(f, "loading"),
            Lifecycle::Ready => write!(f, "ready"),
            Lifecycle::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// One-time initialization barrier shared by all sessions
#[derive(Debug)]
pub struct ReadinessGate {
    tx: watch::Sender<Lifecycle>,
}

impl Default for ReadinessGate {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadinessGate {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Lifecycle::Uninitialized);
        Self { tx }
    }

    /// Snapshot of the current state
    pub fn state(&self) -> Lifecycle {
        self.tx.borrow().clone()
    }

    /// Reject unless the gate has resolved to Ready
    pub fn ensure_ready(&self) -> HarnessResult<()> {
        let state = self.tx.borrow();
        if state.is_ready() {
            Ok(())
        } else {
            Err(HarnessError::NotReady(state.clone()))
        }
    }

    /// Enter Loading. Only Uninitialized and Failed may start loading.
    pub(crate) fn begin_loading(&self) -> HarnessResult<()> {
        let mut outcome = Ok(());
        self.tx.send_if_modified(|state| match state {
            Lifecycle::Uninitialized | Lifecycle::Failed(_) => {
                *state = Lifecycle::Loading;
                true
            }
            other => {
                outcome = Err(HarnessError::AlreadyInitialized(other.clone()));
                false
            }
        });
        outcome
    }

    pub(crate) fn mark_ready(&self) {
        self.tx.send_replace(Lifecycle::Ready);
        tracing::info!("Interpreter ready");
    }

    pub(crate) fn mark_failed(&self, reason: impl Into<String>) {
        let reason = reason.into();
        tracing::error!(reason = %reason, "Interpreter initialization failed");
        self.tx.send_replace(Lifecycle::Failed(reason));
    }

    /// Wait until the gate settles; resolves immediately if it already has.
    pub async fn wait_ready(&self) -> HarnessResult<()> {
        let mut rx = self.tx.subscribe();
        let settled = rx
            .wait_for(Lifecycle::is_settled)
            .await
            .map(|state| (*state).clone())
            .unwrap_or_else(|_| self.state());

        match settled {
            Lifecycle::Ready => Ok(()),
            Lifecycle::Failed(reason) => Err(HarnessError::InitializationFailed(reason)),
            other => Err(HarnessError::NotReady(other)),
        }
    }
}
