//! scanvault-server: HTTP API for the scanvault scan archive.
//!
//! Thin plumbing over scanvault-ingest and scanvault-store: upload scan
//! XML, browse and reorganize stored scans, manage folders. All domain
//! logic lives in the other crates.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

pub use config::ServerConfig;
pub use routes::router;
pub use state::AppState;
