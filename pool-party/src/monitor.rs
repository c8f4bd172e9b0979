//! Poll loop
//!
//! One cycle = fetch every host → aggregate the pool → print → append to the
//! history log. Cycles repeat forever, spaced by at least the interval; only
//! a failed history write stops the loop.

use anyhow::{Context, Result};
use chrono::Local;
use std::time::Duration;
use tracing::{debug, info};

use crate::agent::{AgentClient, Host};
use crate::history::HistoryLog;
use crate::pool::{aggregate, PoolReport};
use crate::selection::SelectedPool;
use crate::wizard::MonitorPlan;

pub struct Monitor {
    client: AgentClient,
    hosts: Vec<Host>,
    pool: SelectedPool,
    interval: Duration,
    history: HistoryLog,
    pool_name: String,
}

impl Monitor {
    pub fn new(
        client: AgentClient,
        plan: MonitorPlan,
        history: HistoryLog,
        pool_name: impl Into<String>,
    ) -> Self {
        Self {
            client,
            hosts: plan.hosts,
            pool: plan.pool,
            interval: plan.interval,
            history,
            pool_name: pool_name.into(),
        }
    }

    /// Run one cycle and return what was printed and logged
    pub async fn run_cycle(&self) -> Result<PoolReport> {
        let inventories = self.client.fetch_all(&self.hosts).await;
        let report = aggregate(&self.pool, &inventories, Local::now());

        print!("{}", report.render(&self.pool_name));

        self.history.append(&report.snapshot).await?;

        let snapshot = &report.snapshot;
        debug!(
            "Cycle done: {} drives reported, {} missing, {} bytes total",
            snapshot.matched,
            snapshot.missing,
            snapshot.total_size
        );
        Ok(report)
    }

    /// Cycle until a history write fails
    pub async fn run(&self) -> Result<()> {
        info!(
            "Monitoring {} drive(s) on {} host(s) every {}s, logging to {}",
            self.pool.len(),
            self.hosts.len(),
            self.interval.as_secs(),
            self.history.path().display()
        );

        let mut cycle: u64 = 0;
        loop {
            cycle += 1;
            self.run_cycle()
                .await
                .with_context(|| format!("Cycle {} aborted", cycle))?;

            tokio::time::sleep(self.interval).await;
        }
    }
}
