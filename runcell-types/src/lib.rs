//! Shared types for runcell
//!
//! This crate provides the common vocabulary used across the runcell crates:
//! session identifiers, execution requests and their results, and the
//! status a finished run leaves on its editor.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Session identifier (one per run form on a page)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(pub u64);

impl SessionId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl From<u64> for SessionId {
    fn from(id: u64) -> Self {
        SessionId(id)
    }
}

impl From<SessionId> for u64 {
    fn from(id: SessionId) -> Self {
        id.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// Source text captured from an editor at the moment a run was triggered.
///
/// Requests are never mutated after capture; the harness drops them once
/// the matching result has been rendered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRequest {
    session: SessionId,
    source: String,
}

impl ExecutionRequest {
    pub fn new(session: SessionId, source: impl Into<String>) -> Self {
        Self {
            session,
            source: source.into(),
        }
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

/// Outcome of one execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "text", rename_all = "lowercase")]
pub enum ExecutionResult {
    /// Displayable text: captured output and/or the final expression value
    Value(String),
    /// The run succeeded without producing anything to show
    Empty,
    /// The interpreter raised; carries the error description
    Failure(String),
}

impl ExecutionResult {
    /// Build a success result, folding empty text into [`ExecutionResult::Empty`]
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        if text.is_empty() {
            ExecutionResult::Empty
        } else {
            ExecutionResult::Value(text)
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, ExecutionResult::Failure(_))
    }

    pub fn status(&self) -> Status {
        if self.is_failure() {
            Status::Failed
        } else {
            Status::Ok
        }
    }
}

/// Visual liveness status of a session's editor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Ok,
    Failed,
}

impl Status {
    /// CSS border declaration the editor widget carries for this status
    pub fn border(&self) -> &'static str {
        match self {
            Status::Ok => "1px solid black",
            Status::Failed => "1px solid red",
        }
    }
}

/// Image-like payload handed to a session's canvas by executed code
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DrawPayload(pub String);

impl DrawPayload {
    pub fn new(src: impl Into<String>) -> Self {
        Self(src.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
