//! CLI entry point for the scanvault HTTP server.

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use scanvault_server::{config, routes, AppState};
use scanvault_store::ScanStore;

#[derive(Parser)]
#[command(name = "scanvault-server")]
#[command(about = "HTTP API for the scanvault scan archive")]
struct Cli {
    /// Socket address to bind (overrides the config file).
    #[arg(short, long)]
    listen: Option<String>,

    /// Directory holding the SQLite database (overrides the config file).
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Config file prefix (default: scanvault).
    #[arg(short, long, default_value = "scanvault")]
    config: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let mut cfg = config::load(&cli.config)?;
    if let Some(listen) = cli.listen {
        cfg.listen = listen;
    }
    let data_dir = cli
        .data_dir
        .unwrap_or_else(|| PathBuf::from(&cfg.data_dir));

    let store = ScanStore::open(&data_dir.join("scans.db"))?;
    let app = routes::router(AppState::new(store), cfg.cors);

    let listener = tokio::net::TcpListener::bind(&cfg.listen).await?;
    tracing::info!(listen = %cfg.listen, data_dir = %data_dir.display(), "scanvault-server listening");
    axum::serve(listener, app).await?;

    Ok(())
}
