//! Errors raised by the agent invocation pipeline (§4.5).

use counsel_core::error::{CoreError, ErrorKind};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AgentError>;

/// Closed error set for the pipeline. Individual stage failures that the
/// spec treats as degrade-not-fail (knowledge worker errors, verification
/// unavailability, cache writes) are absorbed by the stage itself and never
/// surface here; only failures that must abort the invocation do.
#[derive(Debug, Error)]
pub enum AgentError {
    /// A model-constrained JSON response didn't parse against the expected
    /// shape. Recorded rather than guessed at (§9 "parse defensively").
    #[error("model returned an unparseable {stage} response: {message}")]
    Validation { stage: &'static str, message: String },

    /// The chat model provider failed in a way the stage cannot route
    /// around (router classification, streaming generation).
    #[error("model provider failure in {stage}: {source}")]
    Model { stage: &'static str, #[source] source: CoreError },

    /// The persistence port failed.
    #[error("pipeline store failure: {0}")]
    Store(#[source] CoreError),

    /// The invocation was cancelled mid-flight.
    #[error("invocation cancelled")]
    Cancelled,
}

impl From<&AgentError> for ErrorKind {
    fn from(err: &AgentError) -> Self {
        match err {
            AgentError::Validation { .. } => ErrorKind::Validation,
            AgentError::Model { source, .. } => source.kind(),
            AgentError::Store(source) => source.kind(),
            AgentError::Cancelled => ErrorKind::Internal,
        }
    }
}

impl From<AgentError> for CoreError {
    fn from(err: AgentError) -> Self {
        match err {
            AgentError::Validation { stage, message } => {
                CoreError::new(ErrorKind::Validation, format!("{stage}: {message}"))
            }
            AgentError::Model { source, .. } => source,
            AgentError::Store(source) => source,
            AgentError::Cancelled => CoreError::new(ErrorKind::Internal, "invocation cancelled"),
        }
    }
}
