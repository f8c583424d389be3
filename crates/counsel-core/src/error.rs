//! The seven-way error taxonomy shared across every core component.
//!
//! Each subsystem defines its own local error enum (see
//! `counsel-legislation::error::GatewayError`, for example) and converts into
//! [`CoreError`] at the point it crosses a component boundary, so that
//! orchestration code in `counsel-agent`/`counsel-review` can match on
//! [`ErrorKind`] without knowing which subsystem actually failed.

use thiserror::Error;

/// The seven error kinds described in the error handling design.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Requested entity is absent for this tenant.
    NotFound,
    /// Malformed or inconsistent input, including bad state transitions.
    Validation,
    /// Unique-constraint violation (duplicate email, URI, ...).
    Conflict,
    /// Caller lacks the required capability.
    PermissionDenied,
    /// Connection or timeout failure talking to an upstream service.
    UpstreamTransient,
    /// Non-2xx response from an upstream service.
    UpstreamService,
    /// Anything else, including model-provider failures.
    Internal,
}

impl ErrorKind {
    /// Whether a caller may treat this kind as safe to retry without
    /// changing its input. Transient upstream failures are; everything
    /// else is not.
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::UpstreamTransient)
    }

    /// Whether a citation/retrieval lookup that failed with this kind
    /// should degrade to "unverified" rather than fail the whole pass.
    pub fn degrades_to_unverified(self) -> bool {
        matches!(self, ErrorKind::UpstreamTransient | ErrorKind::UpstreamService)
    }
}

/// A unified error carrying both the taxonomy kind and a human-readable
/// message, used at component boundaries.
#[derive(Debug, Error)]
#[error("{kind:?}: {message}")]
pub struct CoreError {
    kind: ErrorKind,
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl CoreError {
    /// Builds a new core error of the given kind with a message.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into(), source: None }
    }

    /// Attaches an underlying cause to this error.
    pub fn with_source(
        mut self,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Returns the error's taxonomy kind.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Convenience constructor for [`ErrorKind::NotFound`].
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Convenience constructor for [`ErrorKind::Validation`].
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Convenience constructor for [`ErrorKind::Conflict`].
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    /// Convenience constructor for [`ErrorKind::PermissionDenied`].
    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::PermissionDenied, message)
    }

    /// Convenience constructor for [`ErrorKind::UpstreamTransient`].
    pub fn upstream_transient(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UpstreamTransient, message)
    }

    /// Convenience constructor for [`ErrorKind::UpstreamService`].
    pub fn upstream_service(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UpstreamService, message)
    }

    /// Convenience constructor for [`ErrorKind::Internal`].
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }
}

/// Result alias used throughout the core crates.
pub type Result<T> = std::result::Result<T, CoreError>;
