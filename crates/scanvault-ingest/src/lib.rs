//! scanvault-ingest: Nmap-style XML parsing and scan scope inference.
//!
//! Turns raw scan XML into a typed [`ScanDocument`](scanvault_core::ScanDocument)
//! and infers what the scan targeted from its argument string. Both
//! operations are pure functions over their inputs; nothing here touches
//! the network, the filesystem, or the database.

pub mod error;
pub mod parser;
pub mod scope;

pub use error::{IngestError, Result};
pub use parser::parse;
