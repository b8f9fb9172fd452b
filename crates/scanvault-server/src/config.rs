//! Server configuration.
//!
//! Loaded from `scanvault.toml` (`[server]` section) with
//! `SCANVAULT__`-prefixed environment variable overrides, e.g.
//! `SCANVAULT__SERVER__LISTEN=0.0.0.0:8080`.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Socket address to bind.
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Directory holding the SQLite database.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Whether to allow cross-origin requests (the UI is served
    /// separately during development).
    #[serde(default = "default_true")]
    pub cors: bool,
}

fn default_listen() -> String {
    "127.0.0.1:3001".to_string()
}

fn default_data_dir() -> String {
    "./data".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            data_dir: default_data_dir(),
            cors: default_true(),
        }
    }
}

/// Load configuration from `<file_prefix>.toml` and the environment.
pub fn load(file_prefix: &str) -> anyhow::Result<ServerConfig> {
    let cfg = config::Config::builder()
        .add_source(config::File::with_name(file_prefix).required(false))
        .add_source(
            config::Environment::with_prefix("SCANVAULT")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    match cfg.get::<ServerConfig>("server") {
        Ok(c) => Ok(c),
        Err(_) => Ok(ServerConfig::default()),
    }
}
