//! Glances agent client
//!
//! Fetches the filesystem inventory of remote hosts:
//! - `GET http://{host}:{port}/api/3/fs` bounded by a request timeout
//! - Timeout, connection and fetch failures scoped to the offending host
//! - Sequential or concurrent polling of the whole host list

use anyhow::{Context, Result};
use futures::future::join_all;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::net::Ipv6Addr;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Glances REST path listing mounted filesystems
pub const FS_ENDPOINT: &str = "/api/3/fs";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// One monitoring agent endpoint
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Host {
    pub name: String,
    pub port: u16,
}

impl Host {
    pub fn new(name: impl Into<String>, port: u16) -> Self {
        Self { name: name.into(), port }
    }

    pub fn fs_url(&self) -> String {
        format!("http://{}{}", self, FS_ENDPOINT)
    }
}

impl fmt::Display for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name.parse::<Ipv6Addr>().is_ok() {
            write!(f, "[{}]:{}", self.name, self.port)
        } else {
            write!(f, "{}:{}", self.name, self.port)
        }
    }
}

/// Filesystem entry as reported by the agent (unknown fields are ignored)
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DriveRecord {
    pub device_name: String,
    pub mnt_point: String,
    pub size: u64,
    pub used: u64,
    pub free: u64,
    /// Agent-side rounding, may disagree with used/size
    pub percent: f64,
    #[serde(default)]
    pub fs_type: Option<String>,
}

/// Drive lists of the hosts that answered during one cycle
pub type Inventories = HashMap<Host, Vec<DriveRecord>>;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Timeout error: unable to reach {host} within {timeout:?}")]
    Timeout { host: Host, timeout: Duration },
    #[error("Connection error: {host} is unreachable ({source})")]
    Connection {
        host: Host,
        #[source]
        source: reqwest::Error,
    },
    #[error("Error accessing Glances API on {host}: {reason}")]
    Fetch { host: Host, reason: String },
}

impl AgentError {
    pub fn host(&self) -> &Host {
        match self {
            AgentError::Timeout { host, .. }
            | AgentError::Connection { host, .. }
            | AgentError::Fetch { host, .. } => host,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AgentClient {
    http: reqwest::Client,
    timeout: Duration,
    concurrent: bool,
}

impl AgentClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .no_proxy()
            .user_agent(concat!("pool-party/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            timeout,
            concurrent: false,
        })
    }

    /// Poll hosts concurrently in `fetch_all` instead of one after another
    pub fn with_concurrency(mut self, concurrent: bool) -> Self {
        self.concurrent = concurrent;
        self
    }

    /// Fetch the current drive list of one agent
    pub async fn fetch_inventory(&self, host: &Host) -> Result<Vec<DriveRecord>, AgentError> {
        let url = host.fs_url();
        debug!("GET {}", url);

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| self.classify(host, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AgentError::Fetch {
                host: host.clone(),
                reason: format!("HTTP status {}", status),
            });
        }

        let body = response.text().await.map_err(|e| self.classify(host, e))?;

        serde_json::from_str(&body).map_err(|e| AgentError::Fetch {
            host: host.clone(),
            reason: format!("malformed drive list: {}", e),
        })
    }

    /// Like `fetch_inventory`, but logs the failure and yields `None`
    pub async fn fetch_or_report(&self, host: &Host) -> Option<Vec<DriveRecord>> {
        match self.fetch_inventory(host).await {
            Ok(drives) => {
                debug!("{} reported {} drives", host, drives.len());
                Some(drives)
            }
            Err(e) => {
                warn!(host = %e.host(), "{}", e);
                None
            }
        }
    }

    /// Fetch every host; hosts that failed are left out of the result
    pub async fn fetch_all(&self, hosts: &[Host]) -> Inventories {
        let results: Vec<(Host, Option<Vec<DriveRecord>>)> = if self.concurrent {
            join_all(hosts.iter().map(|host| async move {
                (host.clone(), self.fetch_or_report(host).await)
            }))
            .await
        } else {
            let mut results = Vec::with_capacity(hosts.len());
            for host in hosts {
                results.push((host.clone(), self.fetch_or_report(host).await));
            }
            results
        };

        results
            .into_iter()
            .filter_map(|(host, drives)| drives.map(|drives| (host, drives)))
            .collect()
    }

    fn classify(&self, host: &Host, err: reqwest::Error) -> AgentError {
        if err.is_timeout() {
            AgentError::Timeout {
                host: host.clone(),
                timeout: self.timeout,
            }
        } else if err.is_connect() {
            AgentError::Connection {
                host: host.clone(),
                source: err,
            }
        } else {
            AgentError::Fetch {
                host: host.clone(),
                reason: err.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pool_party_devkit::{drive, drive_list, unused_port, AgentReply, MockAgent};

    fn client() -> AgentClient {
        AgentClient::new(Duration::from_millis(300)).unwrap()
    }

    fn host_of(agent: &MockAgent) -> Host {
        Host::new(agent.host(), agent.port())
    }

    #[test]
    fn test_fs_url() {
        assert_eq!(
            Host::new("192.168.1.10", 61208).fs_url(),
            "http://192.168.1.10:61208/api/3/fs"
        );
        assert_eq!(Host::new("nas", 8080).fs_url(), "http://nas:8080/api/3/fs");
        assert_eq!(Host::new("::1", 61208).fs_url(), "http://[::1]:61208/api/3/fs");
    }

    #[test]
    fn test_drive_record_ignores_unknown_fields() {
        let json = r#"{"device_name": "sda1", "mnt_point": "/", "size": 100, "used": 40,
                       "free": 60, "percent": 40.0, "key": "mnt_point", "alias": null}"#;
        let drive: DriveRecord = serde_json::from_str(json).unwrap();
        assert_eq!(drive.device_name, "sda1");
        assert_eq!(drive.free, 60);
        assert_eq!(drive.fs_type, None);
    }

    #[tokio::test]
    async fn test_fetch_inventory() {
        let agent = MockAgent::serving(drive_list([
            drive("sda", "/", 100, 40, 60),
            drive("sdb", "/data", 200, 50, 150),
        ]))
        .await
        .unwrap();

        let drives = client().fetch_inventory(&host_of(&agent)).await.unwrap();

        assert_eq!(drives.len(), 2);
        assert_eq!(drives[0].device_name, "sda");
        assert_eq!(drives[0].size, 100);
        assert_eq!(drives[1].mnt_point, "/data");
        assert_eq!(drives[1].percent, 25.0);
        assert_eq!(drives[1].fs_type.as_deref(), Some("ext4"));
        assert_eq!(agent.requests()[0].path, FS_ENDPOINT);
    }

    #[tokio::test]
    async fn test_bad_status_is_fetch_error() {
        let agent = MockAgent::start().await.unwrap();
        agent.reply_with(AgentReply::Status(500));
        let host = host_of(&agent);

        let err = client().fetch_inventory(&host).await.unwrap_err();

        assert!(matches!(err, AgentError::Fetch { .. }));
        assert_eq!(err.host(), &host);
        assert!(err.to_string().contains("500"));
    }

    #[tokio::test]
    async fn test_malformed_body_is_fetch_error() {
        let agent = MockAgent::start().await.unwrap();
        agent.reply_with(AgentReply::Body("<html>not glances</html>".into()));

        let err = client().fetch_inventory(&host_of(&agent)).await.unwrap_err();
        assert!(matches!(err, AgentError::Fetch { .. }));
    }

    #[tokio::test]
    async fn test_missing_field_is_fetch_error() {
        let agent = MockAgent::start().await.unwrap();
        agent.reply_with(AgentReply::Body(
            r#"[{"device_name": "sda", "size": 1, "used": 0, "free": 1, "percent": 0}]"#.into(),
        ));

        let err = client().fetch_inventory(&host_of(&agent)).await.unwrap_err();

        assert!(matches!(err, AgentError::Fetch { .. }));
        assert!(err.to_string().contains("mnt_point"));
    }

    #[tokio::test]
    async fn test_hanging_agent_times_out() {
        let agent = MockAgent::start().await.unwrap();
        agent.reply_with(AgentReply::Hang);

        let err = client().fetch_inventory(&host_of(&agent)).await.unwrap_err();
        assert!(matches!(err, AgentError::Timeout { .. }), "{:?}", err);
    }

    #[tokio::test]
    async fn test_refused_connection() {
        let host = Host::new("127.0.0.1", unused_port().unwrap());

        let err = client().fetch_inventory(&host).await.unwrap_err();

        assert!(matches!(err, AgentError::Connection { .. }), "{:?}", err);
        assert!(err.to_string().contains(&host.to_string()));
    }

    #[tokio::test]
    async fn test_fetch_or_report_swallows_errors() {
        let host = Host::new("127.0.0.1", unused_port().unwrap());
        assert!(client().fetch_or_report(&host).await.is_none());
    }

    #[tokio::test]
    async fn test_fetch_all_skips_failed_hosts() {
        let up = MockAgent::serving(drive_list([drive("sda", "/", 100, 40, 60)]))
            .await
            .unwrap();
        let down = MockAgent::start().await.unwrap();
        down.reply_with(AgentReply::Status(503));
        let hosts = vec![host_of(&up), host_of(&down)];

        for concurrent in [false, true] {
            let inventories = client().with_concurrency(concurrent).fetch_all(&hosts).await;

            assert_eq!(inventories.len(), 1);
            assert_eq!(inventories[&hosts[0]][0].device_name, "sda");
            assert!(!inventories.contains_key(&hosts[1]));
        }
    }
}
