//! Error types for the scanvault-store crate.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    /// A stored row is structurally unusable (e.g. a port with no
    /// protocol) or a caller supplied unusable input. The store fails
    /// closed rather than guessing a value.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Opaque failure from SQLite; propagated, never retried here.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;
