//! Pool Party - storage pool monitor for Glances agents
//!
//! Polls the filesystem listing of one or more Glances agents and treats an
//! operator-chosen set of drives as a single pool:
//! - Interactive setup (hosts, port, refresh interval, drive selection)
//! - Drives re-matched by host and device name on every refresh
//! - Pool totals printed each cycle and appended to a CSV history

mod agent;
mod config;
mod history;
mod monitor;
mod pool;
mod selection;
mod units;
mod wizard;

use anyhow::{Context, Result};
use std::io;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::agent::AgentClient;
use crate::config::MonitorConfig;
use crate::history::HistoryLog;
use crate::monitor::Monitor;
use crate::wizard::SetupWizard;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("pool_party=info")),
        )
        .with_target(false)
        .init();

    info!("Pool Party v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = MonitorConfig::load()
        .await
        .context("Failed to load configuration")?;

    let client = AgentClient::new(config.agent.timeout())?
        .with_concurrency(config.agent.concurrent_fetch);

    // Selection runs once, against a first fetch of every host
    let plan = {
        let stdin = io::stdin();
        let mut wizard = SetupWizard::new(stdin.lock(), io::stdout());
        wizard.run(&config, &client).await.context("Setup failed")?
    };

    let monitor = Monitor::new(
        client,
        plan,
        HistoryLog::new(&config.history.path),
        config.pool_name.clone(),
    );

    monitor.run().await.context("Monitoring stopped")?;

    Ok(())
}
