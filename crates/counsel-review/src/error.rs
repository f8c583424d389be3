//! Errors raised by the policy review engine (§4.6).

use counsel_core::error::{CoreError, ErrorKind};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ReviewError>;

/// Closed error set for the review engine. Unlike the agent pipeline, the
/// engine never lets an error escape uncaught: every variant here maps to
/// one of the three recorded error codes and is persisted on the review
/// row rather than rolled back (§7 "the review engine catches *all*
/// exceptions at the top level").
#[derive(Debug, Error)]
pub enum ReviewError {
    /// Policy-type identification returned confidence below the 0.6
    /// acceptance threshold, or no active definitions exist for the
    /// tenant, or a model-constrained response didn't parse.
    #[error("validation failed in {stage}: {message}")]
    Validation { stage: &'static str, message: String },

    /// The chat model provider failed in a way the stage cannot route
    /// around.
    #[error("model provider failure in {stage}: {source}")]
    Model { stage: &'static str, #[source] source: CoreError },

    /// The persistence port failed.
    #[error("review store failure: {0}")]
    Store(#[source] CoreError),

    /// The review exceeded its logical processing deadline.
    #[error("policy review exceeded its processing deadline")]
    Timeout,

    /// The review was cancelled mid-flight.
    #[error("review cancelled")]
    Cancelled,
}

impl ReviewError {
    /// The error code recorded on the review row (§4.6 "Error transitions").
    pub fn code(&self) -> &'static str {
        match self {
            ReviewError::Validation { .. } => "VALIDATION_ERROR",
            ReviewError::Timeout => "POLICY_REVIEW_TIMEOUT",
            ReviewError::Model { .. } | ReviewError::Store(_) | ReviewError::Cancelled => "INTERNAL_ERROR",
        }
    }
}

impl From<&ReviewError> for ErrorKind {
    fn from(err: &ReviewError) -> Self {
        match err {
            ReviewError::Validation { .. } => ErrorKind::Validation,
            ReviewError::Model { source, .. } => source.kind(),
            ReviewError::Store(source) => source.kind(),
            ReviewError::Timeout | ReviewError::Cancelled => ErrorKind::Internal,
        }
    }
}

impl From<ReviewError> for CoreError {
    fn from(err: ReviewError) -> Self {
        match err {
            ReviewError::Validation { stage, message } => {
                CoreError::new(ErrorKind::Validation, format!("{stage}: {message}"))
            }
            ReviewError::Model { source, .. } => source,
            ReviewError::Store(source) => source,
            ReviewError::Timeout => CoreError::new(ErrorKind::Internal, "policy review timed out"),
            ReviewError::Cancelled => CoreError::new(ErrorKind::Internal, "review cancelled"),
        }
    }
}
