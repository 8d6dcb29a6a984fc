//! Mediashelf CLI - Command-line interface
//!
//! Provides command-line access to catalog search and item lookup.

mod commands;

use clap::Parser;
use mediashelf_catalog::tracing_setup::{CliLogLevel, init_tracing};
use mediashelf_catalog::{CatalogAggregator, CatalogConfig};
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "mediashelf")]
#[command(about = "Search film, TV, game and book catalogs")]
struct Cli {
    /// Console log level; the full trace always goes to logs/mediashelf-last-run.log
    #[arg(long, global = true, value_enum, default_value_t = CliLogLevel::Warn)]
    log_level: CliLogLevel,

    #[command(subcommand)]
    command: commands::Commands,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.log_level.as_tracing_level(), None)
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let config = CatalogConfig::from_env();
    let aggregator = CatalogAggregator::from_config(&config)?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, cancelling catalog request");
            on_interrupt.cancel();
        }
    });

    commands::handle_command(cli.command, &aggregator, &cancel).await
}
