//! Error types for tactician-core

use thiserror::Error;

/// Main error type for the tactician-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Malformed game record
    #[error("PGN error: {0}")]
    Pgn(String),

    /// Invalid position or line that the rules engine refused
    #[error("position error: {0}")]
    Position(String),

    /// Backend move service error
    #[error("move service error: {0}")]
    Service(String),

    /// Puzzle not found in the catalog
    #[error("puzzle not found: {0}")]
    PuzzleNotFound(String),

    /// Key-value store error
    #[error("store error: {0}")]
    Store(String),
}

/// Result type alias for tactician-core
pub type Result<T> = std::result::Result<T, Error>;
