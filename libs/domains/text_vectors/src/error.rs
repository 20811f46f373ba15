use std::time::Duration;

use core_config::ConfigError;
use thiserror::Error;

/// Failure raised by one of the external collaborators.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("qdrant: {0}")]
    Qdrant(#[from] qdrant_client::QdrantError),

    #[error("http: {0}")]
    Http(#[from] reqwest::Error),

    #[error("malformed response: {0}")]
    Malformed(String),
}

/// One rejected item of a batch write.
#[derive(Debug)]
pub struct BatchItemError {
    pub index: usize,
    pub id: Option<String>,
    pub error: VectorError,
}

#[derive(Debug, Error)]
pub enum VectorError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Service not initialized")]
    NotInitialized,

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("{context}: {source}")]
    Upstream {
        context: String,
        #[source]
        source: UpstreamError,
    },

    #[error("Batch rejected: {} of the records are invalid", failures.len())]
    BatchRejected { failures: Vec<BatchItemError> },

    #[error("Operation cancelled: {0}")]
    Cancelled(&'static str),

    #[error("Operation timed out after {after:?}: {operation}")]
    TimedOut {
        operation: &'static str,
        after: Duration,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type VectorResult<T> = Result<T, VectorError>;

/// Coarse error classification for callers that branch on failure kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    DimensionMismatch,
    NotInitialized,
    NotFound,
    Upstream,
    Cancelled,
    Config,
    Internal,
}

impl VectorError {
    pub fn upstream(context: impl Into<String>, source: impl Into<UpstreamError>) -> Self {
        VectorError::Upstream {
            context: context.into(),
            source: source.into(),
        }
    }

    pub fn malformed(context: impl Into<String>, details: impl Into<String>) -> Self {
        VectorError::Upstream {
            context: context.into(),
            source: UpstreamError::Malformed(details.into()),
        }
    }

    pub fn dimension(expected: usize, actual: usize) -> Self {
        VectorError::DimensionMismatch { expected, actual }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            VectorError::Validation(_) | VectorError::BatchRejected { .. } => ErrorKind::Validation,
            VectorError::DimensionMismatch { .. } => ErrorKind::DimensionMismatch,
            VectorError::NotInitialized => ErrorKind::NotInitialized,
            VectorError::NotFound(_) => ErrorKind::NotFound,
            VectorError::Upstream { .. } => ErrorKind::Upstream,
            VectorError::Cancelled(_) | VectorError::TimedOut { .. } => ErrorKind::Cancelled,
            VectorError::Config(_) => ErrorKind::Config,
            VectorError::Internal(_) => ErrorKind::Internal,
        }
    }
}

impl From<ConfigError> for VectorError {
    fn from(err: ConfigError) -> Self {
        VectorError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for VectorError {
    fn from(err: serde_json::Error) -> Self {
        VectorError::Internal(format!("JSON error: {}", err))
    }
}

/// Shortens caller text for error context and log fields.
pub(crate) fn text_prefix(text: &str) -> String {
    const MAX_CHARS: usize = 32;
    let mut prefix: String = text.chars().take(MAX_CHARS).collect();
    if text.chars().count() > MAX_CHARS {
        prefix.push_str("...");
    }
    prefix
}
