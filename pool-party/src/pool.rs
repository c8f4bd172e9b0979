//! Pool aggregation
//!
//! Re-matches the selected identities against the freshest inventories and
//! sums their capacity once per cycle, across every host of the pool.

use crate::agent::{DriveRecord, Inventories};
use crate::selection::{DriveIdentity, SelectedPool};
use crate::units::format_bytes;
use chrono::{DateTime, Local};
use std::fmt::Write;
use tracing::warn;

/// Pool totals at one point in time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateSnapshot {
    pub taken_at: DateTime<Local>,
    pub total_size: u64,
    pub total_used: u64,
    pub total_free: u64,
    /// Selected drives found in this cycle's inventories
    pub matched: usize,
    /// Selected drives whose host or device was absent this cycle
    pub missing: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PoolEntry {
    Matched(DriveIdentity, DriveRecord),
    Missing(DriveIdentity),
}

/// Per-drive breakdown in selection order, followed by the totals
#[derive(Debug, Clone, PartialEq)]
pub struct PoolReport {
    pub entries: Vec<PoolEntry>,
    pub snapshot: AggregateSnapshot,
}

/// Sum the selected drives found in `inventories`.
///
/// Lookup is by device name within the identity's host, so the order in
/// which agents list their drives has no effect. Missing drives count as zero.
pub fn aggregate(
    selected: &SelectedPool,
    inventories: &Inventories,
    taken_at: DateTime<Local>,
) -> PoolReport {
    let mut snapshot = AggregateSnapshot {
        taken_at,
        total_size: 0,
        total_used: 0,
        total_free: 0,
        matched: 0,
        missing: 0,
    };
    let mut entries = Vec::with_capacity(selected.len());

    for identity in selected.iter() {
        // device names are unique per host; a bind mount resolves to its first listing
        let found = inventories.get(&identity.host).and_then(|drives| {
            drives
                .iter()
                .find(|drive| drive.device_name == identity.device_name)
        });

        match found {
            Some(drive) => {
                snapshot.total_size = snapshot.total_size.saturating_add(drive.size);
                snapshot.total_used = snapshot.total_used.saturating_add(drive.used);
                snapshot.total_free = snapshot.total_free.saturating_add(drive.free);
                snapshot.matched += 1;
                entries.push(PoolEntry::Matched(identity.clone(), drive.clone()));
            }
            None => {
                if inventories.contains_key(&identity.host) {
                    warn!("Drive {} is no longer reported, counting it as empty", identity);
                } else {
                    warn!(
                        "No data from {} this cycle, counting {} as empty",
                        identity.host, identity.device_name
                    );
                }
                snapshot.missing += 1;
                entries.push(PoolEntry::Missing(identity.clone()));
            }
        }
    }

    PoolReport { entries, snapshot }
}

impl PoolReport {
    /// Console rendering of one cycle
    pub fn render(&self, pool_name: &str) -> String {
        let mut out = String::new();

        if self.entries.is_empty() {
            let _ = writeln!(out, "No drives available for {}.", pool_name);
            return out;
        }

        let _ = writeln!(out, "\nSelected Drives Pool for {}:", pool_name);
        for entry in &self.entries {
            match entry {
                PoolEntry::Matched(identity, drive) => {
                    let _ = write!(
                        out,
                        "Host: {} - Device: {} - Mount Point: {} - ",
                        identity.host, drive.device_name, drive.mnt_point
                    );
                    let _ = writeln!(
                        out,
                        "Total Size: {} - Used: {} - Free: {} - Percent: {:?}%",
                        format_bytes(drive.size),
                        format_bytes(drive.used),
                        format_bytes(drive.free),
                        drive.percent
                    );
                }
                PoolEntry::Missing(identity) => {
                    let _ = writeln!(
                        out,
                        "Host: {} - Device: {} - not reported this cycle",
                        identity.host, identity.device_name
                    );
                }
            }
        }

        let totals = &self.snapshot;
        let _ = writeln!(
            out,
            "\nTotal Pool Size for {}: {} - Total Pool Used: {} - Total Pool Free: {}",
            pool_name,
            format_bytes(totals.total_size),
            format_bytes(totals.total_used),
            format_bytes(totals.total_free)
        );
        out
    }
}
