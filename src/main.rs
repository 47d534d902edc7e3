use anyhow::Result;
use std::collections::BTreeSet;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod catalog;
mod config;
mod driver;
mod error;
mod pacing;
mod swarm;

const DEFAULT_LOG_FILTER: &str = "pricestorm=info";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    info!("Starting pricestorm");

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());
    info!("Loading config from {}", config_path);

    let config = config::Config::from_file(&config_path)?;
    info!(
        "Targeting {} with {} users for {}s",
        config.host, config.users, config.duration_seconds
    );

    let versions: BTreeSet<_> = config.tasks.iter().map(|task| task.version).collect();
    let source = config.catalog_source();
    for unused in source.versions().filter(|v| !versions.contains(v)) {
        info!("Catalog for {} is configured but no task uses it", unused);
    }

    let client = driver::HyperPriceClient::new(&config.host, config.request_timeout());
    let price_driver = driver::PriceDriver::load(client, &source, versions)?;

    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Interrupted, stopping users");
                let _ = stop_tx.send(true);
            }
            Err(e) => warn!("Could not listen for Ctrl-C: {}", e),
        }
    });

    let swarm = swarm::Swarm::new(price_driver, &config);
    let summary = swarm.run(stop_rx).await;

    for (version, tally) in &summary {
        info!(
            "{}: {} requests, {} ok, {} failed, {} errors",
            version,
            tally.total(),
            tally.successes,
            tally.failures,
            tally.errors
        );
    }

    info!("Run complete.");
    Ok(())
}
