//! Error and result types shared by the harness, the interpreter contracts
//! and the Python kernel.

use crate::lifecycle::Lifecycle;

/// A raised or rejected execution, carried as its textual description.
///
/// This is the only form in which interpreter errors reach the page: the
/// harness renders the message in the error color and marks the editor red.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ExecutionFailure {
    pub message: String,
}

impl ExecutionFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Errors from the interpreter process plumbing
#[derive(Debug, thiserror::Error)]
pub enum KernelError {
    #[error("Failed to start interpreter `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Interpreter I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Interpreter protocol error: {0}")]
    Protocol(String),

    #[error("Interpreter process exited")]
    Exited,

    #[error("Preload failed: {0}")]
    Load(String),

    #[error("Interpreter task aborted: {0}")]
    Aborted(String),
}

/// Errors surfaced by harness entry points
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error("Interpreter not ready ({0})")]
    NotReady(Lifecycle),

    #[error("Interpreter already initialized ({0})")]
    AlreadyInitialized(Lifecycle),

    #[error("Interpreter initialization failed: {0}")]
    InitializationFailed(String),

    #[error(transparent)]
    Kernel(#[from] KernelError),
}

pub type HarnessResult<T> = Result<T, HarnessError>;
