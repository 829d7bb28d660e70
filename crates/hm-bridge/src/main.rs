//! HiveMind bridge
//!
//! Loads the configured entries, sets up every platform for each of them and
//! keeps their states recorded until interrupted. Entries are wired to the
//! in-process loopback client, which lets a configuration be checked and its
//! entities inspected without a HiveMind node.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use hm_bus::{BusClient, LoopbackClient};
use hm_components::{setup_from_file, EntityStateStore};
use hm_config::USER_AGENT;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Entry file looked up in the config directory
const CONFIG_FILE: &str = "hivemind.yaml";

/// How often entities are asked to refresh from the device and re-read
const SCAN_INTERVAL: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));

    info!(user_agent = USER_AGENT, config_dir = ?config_dir, "Starting HiveMind bridge");

    let integrations = setup_from_file(&config_dir, CONFIG_FILE, |entry| -> Arc<dyn BusClient> {
        Arc::new(LoopbackClient::new(entry.host.clone()))
    })
    .await
    .with_context(|| format!("failed to set up entries from {:?}", config_dir.join(CONFIG_FILE)))?;

    let store = Arc::new(EntityStateStore::new());
    let mut recorders = Vec::with_capacity(integrations.len());
    for integration in &integrations {
        integration.register_all(&store);
        recorders.push(store.spawn(integration.notifier()));
    }

    info!(
        entries = integrations.len(),
        entities = store.entity_count(),
        "HiveMind bridge is running"
    );

    let mut scan = tokio::time::interval(SCAN_INTERVAL);
    loop {
        tokio::select! {
            _ = scan.tick() => store.poll(),
            signal = tokio::signal::ctrl_c() => {
                signal?;
                break;
            }
        }
    }

    info!("Shutting down...");
    for integration in &integrations {
        integration.unload().await;
    }
    for recorder in recorders {
        recorder.abort();
    }

    Ok(())
}
