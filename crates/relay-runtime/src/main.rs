//! # Domain Relay Runtime
//!
//! Boots a simulated browser, opens the hub page and runs the
//! demonstration flows across the five domains.

use anyhow::{Context, Result};
use relay_runtime::{run_demo, RuntimeConfig, SimulatedBrowser};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Open the hub page and run the flows to completion.
async fn run(config: &RuntimeConfig) -> Result<()> {
    let storage = config
        .open_storage()
        .context("Failed to open storage")?;
    let browser = SimulatedBrowser::new(storage, config.relay_config());

    let hub_url = config.hub_url();
    let hub = browser
        .open_page_with_frames(&hub_url, &config.frame_domains())
        .await
        .with_context(|| format!("Failed to open hub page at {hub_url}"))?;

    info!("===========================================");
    info!("  Domain Relay Runtime v{}", env!("CARGO_PKG_VERSION"));
    info!("  Hub: {} ({})", hub_url, hub.current_domain());
    info!("  Session: {}", hub.session_id());
    info!("===========================================");

    let report = run_demo(&hub).await.context("Demonstration flow failed")?;
    info!(
        total = %report.fee_quote["total"],
        first = %report.notifications.0["notificationId"],
        second = %report.notifications.1["notificationId"],
        status = ?report.session.status,
        "Demonstration complete"
    );

    browser.close_all().await;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = RuntimeConfig::from_env();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .with_thread_ids(true)
        .init();

    tokio::select! {
        result = run(&config) => {
            if let Err(e) = &result {
                error!(error = %e, "Runtime failed");
            }
            result
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for Ctrl+C")?;
            info!("Shutdown signal received");
            Ok(())
        }
    }
}
