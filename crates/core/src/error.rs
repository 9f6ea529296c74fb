//! Error types for Snapseek.
//!
//! `AppError` is the application-wide error returned by entry points.
//! The retrieval engine reports through narrower enums (`BuildError`,
//! `SearchError`, `EmbeddingError`, `PreprocessError`) so callers can tell
//! an empty corpus from a universally failing model, or a rejected query
//! from a broken provider. Every domain error converts into `AppError`.

use std::path::PathBuf;
use thiserror::Error;

/// Unified error type for Snapseek.
///
/// We never panic on recoverable conditions; errors are represented and
/// propagated.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Index build failures (fatal at startup)
    #[error("Build error: {0}")]
    Build(#[from] BuildError),

    /// Rejected or failed queries
    #[error("Search error: {0}")]
    Search(#[from] SearchError),

    /// Embedding provider errors outside of a query
    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

/// Errors that prevent an index from being built.
#[derive(Error, Debug)]
pub enum BuildError {
    /// The corpus directory does not exist or is not a directory.
    #[error("Corpus directory not found: {0:?}")]
    DirectoryNotFound(PathBuf),

    /// The directory holds no decodable image files.
    #[error("No valid images found in {0:?}")]
    EmptyCorpus(PathBuf),

    /// Images were found but every one of them failed preprocessing or embedding.
    #[error("No valid embeddings: all {attempted} corpus items failed to embed")]
    NoValidEmbeddings { attempted: usize },

    /// An embedding had zero or non-finite norm and cannot be normalized.
    #[error("Embedding for {identifier} has zero or non-finite norm")]
    DegenerateEmbedding { identifier: String },

    /// The engine already holds an index; indexes are built once.
    #[error("Index already built")]
    AlreadyBuilt,

    /// Another build is running on the same engine.
    #[error("Index build already in progress")]
    BuildInProgress,

    /// A blocking worker task panicked or was cancelled.
    #[error("Build worker failed: {0}")]
    Worker(String),
}

/// A single corpus item could not be decoded or transformed.
///
/// Recovered by the builder as a per-item skip.
#[derive(Error, Debug, Clone)]
#[error("Failed to preprocess {path:?}: {message}")]
pub struct PreprocessError {
    pub path: PathBuf,
    pub message: String,
}

impl PreprocessError {
    pub fn new(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Errors raised by, or about the output of, an embedding provider.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EmbeddingError {
    /// The provider itself failed (model inference, transport, ...).
    #[error("Provider failure: {0}")]
    Provider(String),

    /// The provider returned a vector of the wrong length.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// The vector has zero or non-finite norm.
    #[error("Embedding has zero or non-finite norm")]
    Degenerate,

    /// The configured provider is not known.
    #[error("Unsupported embedding provider: {0}")]
    Unsupported(String),
}

/// Errors returned to a search caller. None of them affect other queries.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SearchError {
    #[error("Index not built; the engine is not ready")]
    IndexNotBuilt,

    #[error("Query text cannot be empty")]
    EmptyQuery,

    #[error("k must be positive, got {0}")]
    InvalidK(usize),

    #[error("top_k {requested} exceeds the maximum of {max}")]
    TopKTooLarge { requested: usize, max: usize },

    #[error("Search failed: {0}")]
    SearchFailed(#[source] EmbeddingError),
}
