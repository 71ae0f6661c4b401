//! Error types for reelmatch.

use thiserror::Error;

/// Library-level error type for reelmatch operations.
#[derive(Error, Debug)]
pub enum ReelError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Visual index error: {0}")]
    Index(String),

    #[error("Search failed: {0}")]
    Search(String),

    #[error("Document source error: {0}")]
    Document(String),

    #[error("Feedback store error: {0}")]
    Feedback(String),

    #[error("Invalid visual unit: {0}")]
    InvalidUnit(String),

    #[error("Search engine is not ready: {0}")]
    NotReady(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type alias for reelmatch operations.
pub type Result<T> = std::result::Result<T, ReelError>;
