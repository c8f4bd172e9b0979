//! Interactive CLI setup
//!
//! Collects everything the monitor needs before the first cycle: the Glances
//! hosts, their port, the refresh interval, and the drives that make up the
//! pool. Malformed answers are explained and asked again; only closing the
//! input aborts the setup.

use anyhow::{bail, Context, Result};
use std::io::{BufRead, Write};
use std::net::IpAddr;
use std::num::{NonZeroU16, NonZeroU64};
use std::time::Duration;
use tracing::info;

use crate::agent::{AgentClient, Host};
use crate::config::MonitorConfig;
use crate::selection::SelectedPool;

/// Answers gathered by the wizard
#[derive(Debug)]
pub struct MonitorPlan {
    pub hosts: Vec<Host>,
    pub interval: Duration,
    pub pool: SelectedPool,
}

pub struct SetupWizard<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> SetupWizard<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Run the interactive setup
    pub async fn run(
        &mut self,
        config: &MonitorConfig,
        client: &AgentClient,
    ) -> Result<MonitorPlan> {
        writeln!(self.output)?;
        writeln!(self.output, "💾 ======================================")?;
        writeln!(self.output, "   {} STORAGE POOL SETUP", config.pool_name.to_uppercase())?;
        writeln!(self.output, "💾 ======================================")?;
        writeln!(self.output)?;

        // Step 1: Hosts
        let names = self.prompt_hosts(&config.prompt.host_sentinel)?;
        if names.is_empty() {
            bail!("No hosts entered, nothing to monitor");
        }

        // Step 2: Port and interval
        let port: NonZeroU16 = self.prompt_with_default_parse(
            "Port of the remote Glances servers",
            &config.agent.default_port.to_string(),
        )?;
        let interval_secs: NonZeroU64 = self.prompt_with_default_parse(
            "Refresh interval in seconds",
            &config.poll.default_interval_secs.to_string(),
        )?;

        let hosts: Vec<Host> = names
            .into_iter()
            .map(|name| Host::new(name, port.get()))
            .collect();

        // Step 3: Drives
        let pool = self.select_drives(&hosts, client).await?;
        if pool.is_empty() {
            bail!("No drives selected, nothing to monitor");
        }

        writeln!(self.output)?;
        writeln!(self.output, "📋 {} drive(s) in {}:", pool.len(), config.pool_name)?;
        for identity in pool.iter() {
            writeln!(self.output, "   {}", identity)?;
        }
        writeln!(self.output, "🔄 Refreshing every {}s", interval_secs)?;
        self.output.flush()?;

        Ok(MonitorPlan {
            hosts,
            interval: Duration::from_secs(interval_secs.get()),
            pool,
        })
    }

    /// Read host names until the sentinel word
    fn prompt_hosts(&mut self, sentinel: &str) -> Result<Vec<String>> {
        let mut hosts: Vec<String> = Vec::new();

        loop {
            write!(
                self.output,
                "❓ IP address or hostname of a remote Glances server ('{}' to finish): ",
                sentinel
            )?;
            self.output.flush()?;

            let host = self.read_answer()?;
            if host.eq_ignore_ascii_case(sentinel) {
                return Ok(hosts);
            }
            if !is_valid_host(&host) {
                writeln!(
                    self.output,
                    "❌ Invalid IP address or hostname. Please enter a valid IP address or hostname."
                )?;
                continue;
            }
            if hosts.contains(&host) {
                writeln!(self.output, "ℹ️  {} is already in the list.", host)?;
                continue;
            }
            hosts.push(host);
        }
    }

    /// Fetch each host once and let the operator pick drives from its listing
    async fn select_drives(
        &mut self,
        hosts: &[Host],
        client: &AgentClient,
    ) -> Result<SelectedPool> {
        let mut pool = SelectedPool::new();

        for host in hosts {
            let drives = match client.fetch_or_report(host).await {
                Some(drives) => drives,
                None => {
                    writeln!(
                        self.output,
                        "⚠️  Skipping {}: no answer from its Glances agent.",
                        host
                    )?;
                    continue;
                }
            };
            if drives.is_empty() {
                writeln!(self.output, "⚠️  Skipping {}: no drives reported.", host)?;
                continue;
            }

            writeln!(self.output)?;
            writeln!(self.output, "Available drives for {}:", host)?;
            for (i, drive) in drives.iter().enumerate() {
                writeln!(self.output, "{}. {} - {}", i + 1, drive.device_name, drive.mnt_point)?;
            }

            loop {
                write!(
                    self.output,
                    "❓ Indices of the drives to include in the pool for {} (comma-separated): ",
                    host
                )?;
                self.output.flush()?;

                let raw = self.read_answer()?;
                match pool.select(host, &drives, &raw) {
                    Ok(added) => {
                        info!("Selected {} drive(s) on {}", added, host);
                        break;
                    }
                    Err(e) => writeln!(self.output, "❌ Invalid input: {}", e)?,
                }
            }
        }

        Ok(pool)
    }

    // Helper functions for user input
    fn prompt_with_default(&mut self, prompt: &str, default: &str) -> Result<String> {
        write!(self.output, "❓ {} [{}]: ", prompt, default)?;
        self.output.flush()?;

        let input = self.read_answer()?;
        if input.is_empty() {
            Ok(default.to_string())
        } else {
            Ok(input)
        }
    }

    fn prompt_with_default_parse<T: std::str::FromStr>(
        &mut self,
        prompt: &str,
        default: &str,
    ) -> Result<T>
    where
        T::Err: std::fmt::Display,
    {
        loop {
            let input = self.prompt_with_default(prompt, default)?;
            match input.parse::<T>() {
                Ok(value) => return Ok(value),
                Err(e) => {
                    writeln!(
                        self.output,
                        "❌ Invalid input '{}': {}. Please try again.",
                        input, e
                    )?;
                    continue;
                }
            }
        }
    }

    fn read_answer(&mut self) -> Result<String> {
        let mut input = String::new();
        let read = self
            .input
            .read_line(&mut input)
            .context("Failed to read from standard input")?;
        if read == 0 {
            bail!("Input closed before setup was complete");
        }
        Ok(input.trim().to_string())
    }
}

/// Accept IP literals and RFC 1123 host names
pub fn is_valid_host(host: &str) -> bool {
    if host.parse::<IpAddr>().is_ok() {
        return true;
    }
    if host.is_empty() || host.len() > 253 {
        return false;
    }

    host.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    })
}
