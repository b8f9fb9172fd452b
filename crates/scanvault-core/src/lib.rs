//! scanvault-core: Shared domain types for the scanvault scan archive.
//!
//! This crate defines the in-memory representation of a parsed network
//! scan (the scan document) plus the persistence-level metadata records
//! shared between the storage and HTTP layers. It is pure data: no I/O,
//! no parsing, no SQL.

pub mod document;
pub mod record;

pub use document::{
    Address, Distance, Host, Hostname, Os, Port, PortState, ScanDocument, ScanInfo, Scope, Script,
    Service, Status, Uptime,
};
pub use record::{Folder, FolderId, FolderListing, ScanId, ScanRecord, ScanUpdate, StoredScan};
