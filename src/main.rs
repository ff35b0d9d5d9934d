use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use logkeeper::clock::SystemClock;
use logkeeper::config::{self, Config};
use logkeeper::ingest::IngestService;
use logkeeper::logging;
use logkeeper::server::{self, AppState};

/// Collect log lines from remote clients into per-host, per-client, per-day files
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Config file (defaults to ~/.logkeeper/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured listen port
    #[arg(short, long)]
    port: Option<u16>,

    /// Override the configured bind address
    #[arg(short, long)]
    bind: Option<IpAddr>,

    /// Override the configured data directory
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(bind) = args.bind {
        config.bind_address = bind;
    }
    if let Some(data_dir) = args.data_dir {
        config.data_dir = data_dir;
    }

    // Initialize logging BEFORE any tracing calls
    let _guard = logging::init_logging(&config.log_filter, config.log_file.as_deref())?;

    config::ensure_directories(&config)?;
    tracing::info!("Storing logs under {}", config.logs_root().display());

    let service = IngestService::on_disk(config.data_dir.clone(), Arc::new(SystemClock));
    let state = AppState::new(service, config.trusted_proxies.clone());
    let handle = server::start(config.listen_addr(), state).await?;

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    tracing::info!("Shutdown requested");

    handle.shutdown().await
}
