use anyhow::Result;
use clap::Parser;
use tracing::info;

mod cli;
mod config;
mod handlers;
mod router;
mod schemas;
mod session;

#[cfg(test)]
mod test_utils;

use cli::Cli;

/// Main entry point for the Warbler application.
#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    model::init_tracing("warbler=debug,social=debug,tower_http=debug,axum::rejection=trace");

    info!("Warbler {} starting", env!("CARGO_PKG_VERSION"));

    Cli::parse().run().await
}
