//! token-feed - New ERC-20 Deployment Alerts
//!
//! Watches a chain's canonical head over WebSocket, classifies freshly
//! deployed contracts as token-like, and pushes one Telegram alert per
//! confirmed token.
//!
//! Run with: cargo run

use clap::Parser;
use console::style;
use eyre::Result;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod chain;
mod classifier;
mod config;
mod coordinator;
mod create;
mod error;
mod telegram;
mod token;

use config::Config;
use coordinator::Coordinator;

#[derive(Parser, Debug)]
#[command(version, about = "New ERC-20 deployment alerts over Telegram")]
struct Cli {
    /// TOML config file; falls back to environment variables (.env supported)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn print_banner() {
    println!();
    println!(
        "{}",
        style("═══════════════════════════════════════════════").cyan()
    );
    println!(
        "{}",
        style(" TOKEN FEED - New ERC-20 Deployment Alerts").cyan().bold()
    );
    println!(
        "{}",
        style("═══════════════════════════════════════════════").cyan()
    );
    println!();
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("token_feed=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };
    config.validate()?;

    print_banner();

    let coordinator = Coordinator::new(&config).await?;
    info!(chain_id = coordinator.chain_id(), "token feed starting");

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("shutdown signal received");
                cancel.cancel();
            }
        }
    });

    coordinator.run(cancel).await
}
