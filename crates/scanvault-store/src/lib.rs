//! scanvault-store: SQLite persistence for scan documents.
//!
//! A parsed [`ScanDocument`](scanvault_core::ScanDocument) is flattened
//! into normalized relational rows (`scans` -> `hosts` -> `addresses` /
//! `hostnames` / `ports` -> `scripts`) inside a single transaction, and
//! reconstructed losslessly on read. Folder organization and scan
//! metadata CRUD live here too.

pub mod error;
pub mod folders;
pub mod mapper;
pub mod schema;
pub mod store;

pub use error::{Result, StoreError};
pub use folders::FolderUpdate;
pub use store::ScanStore;
