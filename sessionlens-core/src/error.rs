//! Error types for sessionlens-core

use thiserror::Error;

/// Main error type for the sessionlens-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Table definition or creation rejected by SQLite
    #[error("schema error: {0}")]
    Schema(#[source] rusqlite::Error),

    /// Source file unreadable, malformed, or table not initialized
    #[error("load error: {0}")]
    Load(String),

    /// Malformed or rejected query expression
    #[error("query error: {0}")]
    Query(String),

    /// Database error while running a pipeline
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// The summary facade could not compute its bundle
    #[error("summary unavailable: {0}")]
    SummaryUnavailable(String),
}

/// Result type alias for sessionlens-core
pub type Result<T> = std::result::Result<T, Error>;
