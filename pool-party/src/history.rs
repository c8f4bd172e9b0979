//! CSV history of pool totals
//!
//! Append-only: the header is written when the file is created, then one row
//! per cycle. Rows carry formatted sizes, not raw byte counts.

use crate::pool::AggregateSnapshot;
use crate::units::format_bytes;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

pub const HEADER: &str = "Timestamp,Total Size,Total Used,Total Free";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("failed to write history log {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub struct HistoryLog {
    path: PathBuf,
}

impl HistoryLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one row for `snapshot`, preceded by the header on first write
    pub async fn append(&self, snapshot: &AggregateSnapshot) -> Result<(), PersistenceError> {
        self.try_append(snapshot)
            .await
            .map_err(|source| PersistenceError::Write {
                path: self.path.clone(),
                source,
            })
    }

    async fn try_append(&self, snapshot: &AggregateSnapshot) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let needs_header = match fs::metadata(&self.path).await {
            Ok(meta) => meta.len() == 0,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
            Err(e) => return Err(e),
        };

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;

        let row = format_row(snapshot);
        let mut text = String::new();
        if needs_header {
            info!("Starting history log at {}", self.path.display());
            text.push_str(HEADER);
            text.push('\n');
        }
        text.push_str(&row);
        text.push('\n');

        file.write_all(text.as_bytes()).await?;
        file.flush().await?;
        file.sync_data().await?;

        debug!("Logged: {}", row);
        Ok(())
    }
}

/// CSV row for one snapshot, without line terminator
pub fn format_row(snapshot: &AggregateSnapshot) -> String {
    format!(
        "{},{},{},{}",
        snapshot.taken_at.format(TIMESTAMP_FORMAT),
        format_bytes(snapshot.total_size),
        format_bytes(snapshot.total_used),
        format_bytes(snapshot.total_free)
    )
}
