//! Inventory Agent
//!
//! Long-running collector for locally cached Docker images. Collection runs
//! on a fixed schedule and on SIGUSR1 for manual triggering; each run lists
//! local images and forwards the list to the scan pipeline.

mod collector;
mod config;

use anyhow::{Context, Result};
use config::Config;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "inventory_agent=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Configuration
    let config = Config::from_env().context("Failed to load configuration")?;

    info!("Starting Inventory Agent");
    info!("Pipeline URL: {}", config.pipeline_url);
    info!(
        "Collection interval: {}s",
        config.collect_interval.as_secs()
    );

    let client = reqwest::Client::new();

    let mut manual_trigger =
        signal(SignalKind::user_defined1()).context("Failed to install SIGUSR1 handler")?;
    let mut ticker = tokio::time::interval(config.collect_interval);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                info!("Scheduled image collection starting.");
            }
            _ = manual_trigger.recv() => {
                info!("Manual image collection triggered.");
            }
        }

        if let Err(e) = collector::collect_and_forward(&config, &client).await {
            error!("Image collection failed: {:#}", e);
        }
    }
}
