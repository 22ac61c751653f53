use anyhow::{Context, Result};
use clap::Parser;
use common::telemetry::init_tracing;
use tracing::info;

use portal::{ApiClient, Console, cli::Args};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = args.load_config().context("Failed to load configuration")?;

    init_tracing(&config.log_level)?;

    let client = ApiClient::new(&config).context("Failed to build API client")?;
    info!("Starting bandroom console against {}", client.base_url());

    let mut console = Console::new(client, &config);
    console.mount().await;
    console.run().await
}
