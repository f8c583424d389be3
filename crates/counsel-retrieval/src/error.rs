use counsel_core::{CoreError, ErrorKind};
use thiserror::Error;

/// Errors raised by the retrieval core.
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// The query string was empty, or the requested limit was outside 1..=200.
    #[error("invalid search request: {0}")]
    InvalidRequest(String),

    /// The configured embedding provider failed.
    #[error("embedding provider failed: {0}")]
    Embedding(String),

    /// The vector store failed to answer a k-NN query or an upsert/delete.
    #[error("vector store failed: {0}")]
    VectorStore(String),

    /// The keyword index failed to answer a search.
    #[error("keyword index failed: {0}")]
    KeywordIndex(String),
}

impl From<RetrievalError> for CoreError {
    fn from(err: RetrievalError) -> Self {
        match &err {
            RetrievalError::InvalidRequest(_) => CoreError::new(ErrorKind::Validation, err.to_string()),
            RetrievalError::Embedding(_)
            | RetrievalError::VectorStore(_)
            | RetrievalError::KeywordIndex(_) => CoreError::upstream_transient(err.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, RetrievalError>;
