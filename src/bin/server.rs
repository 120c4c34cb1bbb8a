//! FolioDB Server Binary
//!
//! Opens the store and starts the TCP server.

use std::sync::Arc;

use clap::Parser;
use foliodb::network::Server;
use foliodb::{Config, Driver, Gateway};
use tracing_subscriber::{fmt, EnvFilter};

/// FolioDB Server
#[derive(Parser, Debug)]
#[command(name = "foliodb-server")]
#[command(about = "File-backed document store")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./data")]
    data_dir: String,

    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:8001")]
    listen: String,

    /// Maximum queued connections waiting for a worker
    #[arg(short, long, default_value = "1024")]
    max_connections: usize,

    /// Number of connection worker threads
    #[arg(short, long, default_value = "8")]
    workers: usize,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,foliodb=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("FolioDB Server v{}", foliodb::VERSION);
    tracing::info!("Data directory: {}", args.data_dir);
    tracing::info!("Listen address: {}", args.listen);

    let config = Config::builder()
        .data_dir(&args.data_dir)
        .listen_addr(&args.listen)
        .max_connections(args.max_connections)
        .worker_threads(args.workers)
        .build();

    let driver = match Driver::open(&config.data_dir) {
        Ok(d) => Arc::new(d),
        Err(e) => {
            tracing::error!("Failed to open store: {}", e);
            std::process::exit(1);
        }
    };
    let gateway = Arc::new(Gateway::new(driver));

    tracing::info!("Store initialized successfully");

    let server = match Server::bind(config, gateway) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to start server: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}
