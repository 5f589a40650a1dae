//! Error types for the indexing and search engine
//!
//! This module provides structured error types using thiserror for better
//! error handling and actionable error messages.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for indexing operations
#[derive(Error, Debug)]
pub enum IndexError {
    /// File system errors
    #[error("Failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to walk directory '{path}': {reason}")]
    WalkFailed { path: PathBuf, reason: String },

    /// Storage errors surfaced during save/load orchestration
    #[error("Failed to persist index: {0}")]
    Store(#[from] StoreError),

    /// Configuration errors
    #[error("Invalid configuration: {reason}")]
    ConfigError { reason: String },

    /// Extractor registry failed to build (a rule pattern did not compile)
    #[error("Failed to initialize extractors: {0}")]
    ExtractorInit(#[from] ParseError),

    /// General errors for cases where we need to preserve context as text
    #[error("{0}")]
    General(String),
}

/// Errors specific to per-file extraction
///
/// The scanner maps every variant to an empty extraction for that file;
/// no extraction failure ever aborts a scan.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Failed to compile extraction rule for {language}: {reason}")]
    RuleInit { language: String, reason: String },

    #[error("File does not look like text (binary content detected)")]
    BinaryContent,

    #[error("Extraction failed: {reason}")]
    Internal { reason: String },
}

/// Errors specific to the persisted index artifact
#[derive(Error, Debug)]
pub enum StoreError {
    #[error(
        "I/O error on index artifact '{path}': {source}\nSuggestion: Check disk space and permissions in the index directory"
    )]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(
        "Failed to acquire lock on '{path}': {source}\nSuggestion: Another process may be stuck holding the lock; remove the .lock file if no other instance is running"
    )]
    Lock {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to encode index: {0}")]
    Encode(String),
}

/// Errors specific to embedding generation
#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("Embedding provider unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Failed to generate embedding: {reason}")]
    Failed { reason: String },
}

/// Errors specific to file watching operations
#[derive(Error, Debug)]
pub enum WatchError {
    #[error(
        "Failed to initialize file watcher: {reason}\nSuggestion: Check file system permissions and inotify limits"
    )]
    InitFailed { reason: String },

    #[error(
        "Cannot watch path {path:?}: {reason}\nSuggestion: Verify the path exists and you have read permissions"
    )]
    PathWatchFailed { path: PathBuf, reason: String },
}

/// Reportable conditions at the query boundary
///
/// Queries never panic on an unready index; they return one of these so the
/// caller can relay the condition to the user.
#[derive(Error, Debug)]
pub enum QueryError {
    #[error("Index not initialized. Run a full scan before querying.")]
    NotInitialized,

    #[error("Indexing in progress ({processed}/{total} files). Retry when the scan completes.")]
    IndexingInProgress { processed: usize, total: usize },

    #[error(
        "Semantic search unavailable: {reason}\nSuggestion: Retry after the cooldown expires or use exact/fuzzy mode"
    )]
    SemanticUnavailable { reason: String },

    #[error("File '{path}' is not in the index")]
    FileNotIndexed { path: PathBuf },
}

/// Result type alias for index operations
pub type IndexResult<T> = Result<T, IndexError>;

/// Result type alias for extraction operations
pub type ParseOutcome<T> = Result<T, ParseError>;

/// Result type alias for storage operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type alias for query-boundary operations
pub type QueryResult<T> = Result<T, QueryError>;
