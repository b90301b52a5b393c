//! Error types for the audio analysis engine

use thiserror::Error;

/// Errors that can occur during audio analysis
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Invalid input parameters
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Audio decoding error
    #[error("Decoding error: {0}")]
    DecodingError(String),

    /// Processing error during analysis
    #[error("Processing error: {0}")]
    ProcessingError(String),

    /// Numerical error (overflow, underflow, etc.)
    #[error("Numerical error: {0}")]
    NumericalError(String),

    /// Filesystem error while reading audio
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while maintaining the player's library database
#[derive(Debug, Error)]
pub enum LibraryError {
    /// SQLite failure
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No track row with the given file path
    #[error("Track not found: {0}")]
    NotFound(String),

    /// Column is not part of the table
    #[error("Unknown column: {0}")]
    InvalidColumn(String),

    /// Analysis of a library track failed
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
}
