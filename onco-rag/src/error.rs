//! Error types for the `onco-rag` crate.

use thiserror::Error;

/// Errors that can occur in retrieval and ingestion operations.
#[derive(Debug, Error)]
pub enum RagError {
    /// A caller supplied an out-of-range or malformed parameter.
    #[error("Invalid parameter '{field}': {message}")]
    InvalidParameter {
        /// The offending parameter name.
        field: String,
        /// A description of the constraint that was violated.
        message: String,
    },

    /// A required piece of configuration is missing at startup.
    #[error("Not configured: {0}")]
    NotConfigured(String),

    /// The chunk store could not be reached. Retryable by the caller;
    /// upsert keys make retries safe.
    #[error("Chunk store unavailable ({backend}): {message}")]
    StoreUnavailable {
        /// The store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// The chunk store rejected an operation.
    #[error("Chunk store error ({backend}): {message}")]
    Store {
        /// The store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// Plain text could not be extracted from a source document.
    /// The document is skipped and the batch continues.
    #[error("Extraction failed for '{document}': {message}")]
    Extraction {
        /// The document the failure relates to.
        document: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred during embedding generation.
    #[error("Embedding error ({strategy}): {message}")]
    Embedding {
        /// The embedding strategy that produced the error.
        strategy: String,
        /// A description of the failure.
        message: String,
    },

    /// A store-touching operation exceeded its deadline.
    #[error("Timed out during {operation}")]
    Timeout {
        /// The operation that exceeded the deadline.
        operation: String,
    },

    /// A configuration or builder validation error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl RagError {
    /// Shorthand for an [`RagError::InvalidParameter`].
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParameter { field: field.into(), message: message.into() }
    }
}

/// A convenience result type for retrieval operations.
pub type Result<T> = std::result::Result<T, RagError>;
