//! Execution results surfaced through the executed-events.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0

use std::sync::Arc;

use crate::core::error::{ErrorKind, InteractionError};

/// Outcome of one interaction's trip through the execution pipeline.
///
/// Every runtime failure surfaces exactly once as an `ExecuteResult` on the
/// matching executed-event. Cloning is cheap; the underlying handler error is
/// shared behind an `Arc`.
#[derive(Debug, Clone)]
pub struct ExecuteResult {
    is_success: bool,
    error: Option<ErrorKind>,
    error_reason: Option<String>,
    source: Option<Arc<anyhow::Error>>,
}

impl ExecuteResult {
    /// A successful execution.
    pub fn success() -> Self {
        ExecuteResult {
            is_success: true,
            error: None,
            error_reason: None,
            source: None,
        }
    }

    /// A failure described by a framework error.
    pub fn from_error(err: &InteractionError) -> Self {
        ExecuteResult {
            is_success: false,
            error: Some(err.kind()),
            error_reason: Some(err.to_string()),
            source: None,
        }
    }

    /// A failure caused by a handler error, keeping the root cause attached.
    pub fn from_exception(err: anyhow::Error) -> Self {
        ExecuteResult {
            is_success: false,
            error: Some(ErrorKind::Exception),
            error_reason: Some(format!("{}", err.root_cause())),
            source: Some(Arc::new(err)),
        }
    }

    pub fn is_success(&self) -> bool {
        self.is_success
    }

    pub fn error(&self) -> Option<ErrorKind> {
        self.error
    }

    pub fn error_reason(&self) -> Option<&str> {
        self.error_reason.as_deref()
    }

    /// The captured handler error, when the failure kind is `Exception`.
    pub fn source(&self) -> Option<&Arc<anyhow::Error>> {
        self.source.as_ref()
    }
}
