//! Error types for the interaction framework.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 1.0.0: Initial error surface covering build-time and runtime failures

use thiserror::Error;

/// Errors raised while building the command tree or executing an interaction.
///
/// Build-time violations (`ParseFailed`, `DuplicateCommand`,
/// `ComplexParameterCycle`, `NoConverter`) are returned synchronously from the
/// registration call. Runtime failures are wrapped into an
/// [`ExecuteResult`](crate::core::ExecuteResult) and surfaced through the
/// matching executed-event.
#[derive(Debug, Error)]
pub enum InteractionError {
    /// No command is registered under the given path or custom id.
    #[error("unknown command: {path}")]
    UnknownCommand { path: String },

    /// A type converter rejected the supplied option value.
    #[error("failed to convert option '{name}': {reason}")]
    ConvertFailed { name: String, reason: String },

    /// The supplied options do not line up with the declared parameters.
    #[error("bad arguments: {reason}")]
    BadArgs { reason: String },

    /// A handler returned an error or panicked.
    #[error("command raised an exception: {reason}")]
    Exception { reason: String },

    /// A handler completed but reported an unsuccessful outcome.
    #[error("command was unsuccessful: {reason}")]
    Unsuccessful { reason: String },

    /// A module- or command-level precondition rejected the interaction.
    #[error("precondition not met: {reason}")]
    UnmetPrecondition { reason: String },

    /// A command definition violated a platform invariant (name format,
    /// description length, option count, group depth).
    #[error("failed to parse command definition: {reason}")]
    ParseFailed { reason: String },

    /// A command with the same path or normalized wildcard pattern already
    /// exists.
    #[error("duplicate command: {path}")]
    DuplicateCommand { path: String },

    /// A complex parameter recursed into a type already on the flattening
    /// stack.
    #[error("complex parameter cycle through type '{type_name}'")]
    ComplexParameterCycle { type_name: String },

    /// No converter is registered for the declared parameter type.
    #[error("no type converter registered for '{type_name}'")]
    NoConverter { type_name: String },
}

/// Discriminant-only view of [`InteractionError`], carried inside execution
/// results so subscribers can match on the failure kind without the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    UnknownCommand,
    ConvertFailed,
    BadArgs,
    Exception,
    Unsuccessful,
    UnmetPrecondition,
    ParseFailed,
    DuplicateCommand,
    ComplexParameterCycle,
    NoConverter,
}

impl InteractionError {
    /// The kind discriminant for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            InteractionError::UnknownCommand { .. } => ErrorKind::UnknownCommand,
            InteractionError::ConvertFailed { .. } => ErrorKind::ConvertFailed,
            InteractionError::BadArgs { .. } => ErrorKind::BadArgs,
            InteractionError::Exception { .. } => ErrorKind::Exception,
            InteractionError::Unsuccessful { .. } => ErrorKind::Unsuccessful,
            InteractionError::UnmetPrecondition { .. } => ErrorKind::UnmetPrecondition,
            InteractionError::ParseFailed { .. } => ErrorKind::ParseFailed,
            InteractionError::DuplicateCommand { .. } => ErrorKind::DuplicateCommand,
            InteractionError::ComplexParameterCycle { .. } => ErrorKind::ComplexParameterCycle,
            InteractionError::NoConverter { .. } => ErrorKind::NoConverter,
        }
    }

    /// Shorthand for a `ParseFailed` with a formatted reason.
    pub fn parse_failed(reason: impl Into<String>) -> Self {
        InteractionError::ParseFailed {
            reason: reason.into(),
        }
    }

    /// Shorthand for a `BadArgs` with a formatted reason.
    pub fn bad_args(reason: impl Into<String>) -> Self {
        InteractionError::BadArgs {
            reason: reason.into(),
        }
    }
}
