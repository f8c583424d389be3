use counsel_core::{CoreError, ErrorKind};
use thiserror::Error;

/// The failure taxonomy for calls to the legislation service (§4.3).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// The connection could not be established.
    #[error("connection error: {0}")]
    Connection(String),

    /// The call exceeded its deadline.
    #[error("timeout error: {0}")]
    Timeout(String),

    /// The server returned 404.
    #[error("not found: {0}")]
    NotFound(String),

    /// The server returned a non-2xx, non-404 response.
    #[error("service error ({status}): {body}")]
    Service { status: u16, body: String },
}

impl GatewayError {
    /// Whether C4's verification path should degrade a citation to
    /// "unverified" rather than fail outright (§4.3, §7).
    pub fn degrades_to_unverified(&self) -> bool {
        matches!(self, GatewayError::Connection(_) | GatewayError::Timeout(_) | GatewayError::Service { .. })
    }
}

impl From<GatewayError> for CoreError {
    fn from(err: GatewayError) -> Self {
        match &err {
            GatewayError::Connection(_) | GatewayError::Timeout(_) => {
                CoreError::upstream_transient(err.to_string())
            }
            GatewayError::NotFound(_) => CoreError::new(ErrorKind::NotFound, err.to_string()),
            GatewayError::Service { .. } => CoreError::upstream_service(err.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;
