use std::net::TcpListener;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use filmorate_server::config::Config;
use filmorate_server::storage::Storage;
use filmorate_server::{serve, setup_tracing, State};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();
    setup_tracing();
    info!(storage = ?config.storage, database = %config.database.display(), "Starting filmorate");
    let storage = Storage::open(&config).context("Error opening storage")?;
    let addr = config.addr();
    let listener = TcpListener::bind(addr).with_context(|| format!("Error binding {addr}"))?;
    serve(listener, State::new(storage)).await
}
