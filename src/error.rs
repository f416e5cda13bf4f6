//! Error types for the hybridopt library.
//!
//! All fallible operations return [`Result`], whose error is the
//! [`HybridOptError`] enum. Degraded paths (cache misses, failed shards,
//! unfitted quantizers) do not produce errors at all; they are logged and
//! handled locally, so an error reaching the caller always means the query
//! could not be answered.
//!
//! # Examples
//!
//! ```
//! use hybridopt::error::{HybridOptError, Result};
//!
//! fn example_operation() -> Result<()> {
//!     Err(HybridOptError::invalid_argument("limit must be positive"))
//! }
//!
//! match example_operation() {
//!     Ok(_) => println!("Success"),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use std::io;

use thiserror::Error;

/// The main error type for hybridopt operations.
#[derive(Error, Debug)]
pub enum HybridOptError {
    /// I/O errors (reading vector files, writing fitted state).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Binary state encoding errors.
    #[error("Bincode error: {0}")]
    Bincode(#[from] bincode::Error),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid argument passed to an operation.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The embedding service could not produce a query vector.
    #[error("Embedding unavailable: {0}")]
    EmbeddingUnavailable(String),

    /// The vector store failed outside of a single shard search
    /// (e.g. listing shards).
    #[error("Vector store error: {0}")]
    VectorStore(String),

    /// A single shard search failed.
    #[error("Shard search error: {0}")]
    ShardSearch(String),

    /// Operation timed out.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Operation cancelled.
    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    /// The fallback search failed after the primary search did not answer.
    #[error("Fallback search failed: {0}")]
    Fallback(String),

    /// Generic error for other cases.
    #[error("Error: {0}")]
    Other(String),

    /// Generic anyhow error, usually from a collaborator implementation.
    #[error("Anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Result type alias for operations that may fail with HybridOptError.
pub type Result<T> = std::result::Result<T, HybridOptError>;

impl HybridOptError {
    /// Create a new configuration error.
    pub fn config<S: Into<String>>(msg: S) -> Self {
        HybridOptError::Config(msg.into())
    }

    /// Create a new invalid argument error.
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        HybridOptError::InvalidArgument(msg.into())
    }

    /// Create a new embedding-unavailable error.
    pub fn embedding_unavailable<S: Into<String>>(msg: S) -> Self {
        HybridOptError::EmbeddingUnavailable(msg.into())
    }

    /// Create a new vector store error.
    pub fn vector_store<S: Into<String>>(msg: S) -> Self {
        HybridOptError::VectorStore(msg.into())
    }

    /// Create a new shard search error.
    pub fn shard_search<S: Into<String>>(msg: S) -> Self {
        HybridOptError::ShardSearch(msg.into())
    }

    /// Create a new timeout error.
    pub fn timeout<S: Into<String>>(msg: S) -> Self {
        HybridOptError::Timeout(msg.into())
    }

    /// Create a new cancelled error.
    pub fn cancelled<S: Into<String>>(msg: S) -> Self {
        HybridOptError::Cancelled(msg.into())
    }

    /// Create a new fallback error.
    pub fn fallback<S: Into<String>>(msg: S) -> Self {
        HybridOptError::Fallback(msg.into())
    }

    /// Create a new generic error.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        HybridOptError::Other(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_construction() {
        let error = HybridOptError::config("max_size must be positive");
        assert_eq!(
            error.to_string(),
            "Configuration error: max_size must be positive"
        );

        let error = HybridOptError::embedding_unavailable("service down");
        assert_eq!(error.to_string(), "Embedding unavailable: service down");

        let error = HybridOptError::fallback("keyword index offline");
        assert_eq!(
            error.to_string(),
            "Fallback search failed: keyword index offline"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "File not found");
        let error = HybridOptError::from(io_error);

        match error {
            HybridOptError::Io(_) => {} // Expected
            _ => panic!("Expected IO error variant"),
        }
    }

    #[test]
    fn test_anyhow_conversion() {
        let error: HybridOptError = anyhow::anyhow!("collaborator exploded").into();
        assert!(matches!(error, HybridOptError::Anyhow(_)));
    }
}
