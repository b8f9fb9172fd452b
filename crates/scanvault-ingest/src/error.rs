//! Error types for the scanvault-ingest crate.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    /// The input is not well-formed XML. No partial document is produced.
    #[error("Malformed scan XML: {0}")]
    MalformedInput(String),
}

pub type Result<T> = std::result::Result<T, IngestError>;
