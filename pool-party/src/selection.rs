//! Drive selection by stable identity
//!
//! The operator picks drives by their position in a listing, but agents do
//! not guarantee the order of `/api/3/fs` between calls. Positions are
//! therefore resolved once, at selection time, into (host, device name)
//! identities that later cycles match against.

use crate::agent::{DriveRecord, Host};
use std::fmt;
use thiserror::Error;

/// Key used to find a selected drive again on every cycle
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DriveIdentity {
    pub host: Host,
    pub device_name: String,
}

impl fmt::Display for DriveIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} on {}", self.device_name, self.host)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("'{0}' is not a number. Please enter valid numbers separated by commas.")]
    NotANumber(String),
    #[error("{index} is not in the list. Please enter numbers from 1 to {len}.")]
    OutOfRange { index: usize, len: usize },
}

/// Parse comma-separated 1-based indices into 0-based positions below `len`
pub fn parse_indices(raw: &str, len: usize) -> Result<Vec<usize>, SelectionError> {
    raw.split(',')
        .map(str::trim)
        .map(|token| {
            let index: usize = token
                .parse()
                .map_err(|_| SelectionError::NotANumber(token.to_string()))?;
            if index == 0 || index > len {
                return Err(SelectionError::OutOfRange { index, len });
            }
            Ok(index - 1)
        })
        .collect()
}

/// Ordered, duplicate-free set of drives chosen by the operator
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectedPool {
    identities: Vec<DriveIdentity>,
}

impl SelectedPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `raw` indices against `drives` as listed for `host` right now.
    ///
    /// Already selected identities are skipped silently. Returns how many
    /// identities were added; on error the pool is left untouched.
    pub fn select(
        &mut self,
        host: &Host,
        drives: &[DriveRecord],
        raw: &str,
    ) -> Result<usize, SelectionError> {
        let positions = parse_indices(raw, drives.len())?;

        let before = self.identities.len();
        for position in positions {
            self.insert(DriveIdentity {
                host: host.clone(),
                device_name: drives[position].device_name.clone(),
            });
        }
        Ok(self.identities.len() - before)
    }

    pub fn insert(&mut self, identity: DriveIdentity) -> bool {
        if self.identities.contains(&identity) {
            return false;
        }
        self.identities.push(identity);
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = &DriveIdentity> {
        self.identities.iter()
    }

    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(device_name: &str) -> DriveRecord {
        DriveRecord {
            device_name: device_name.to_string(),
            mnt_point: format!("/mnt/{}", device_name),
            size: 100,
            used: 40,
            free: 60,
            percent: 40.0,
            fs_type: None,
        }
    }

    fn names(pool: &SelectedPool) -> Vec<String> {
        pool.iter().map(|id| id.to_string()).collect()
    }

    #[test]
    fn test_parse_indices() {
        assert_eq!(parse_indices("1", 3), Ok(vec![0]));
        assert_eq!(parse_indices(" 3, 1 ,2", 3), Ok(vec![2, 0, 1]));
    }

    #[test]
    fn test_parse_rejects_out_of_range() {
        assert_eq!(
            parse_indices("0", 2),
            Err(SelectionError::OutOfRange { index: 0, len: 2 })
        );
        assert_eq!(
            parse_indices("1,3", 2),
            Err(SelectionError::OutOfRange { index: 3, len: 2 })
        );
    }

    #[test]
    fn test_parse_rejects_non_numbers() {
        assert_eq!(
            parse_indices("1,two", 2),
            Err(SelectionError::NotANumber("two".into()))
        );
        assert_eq!(parse_indices("", 2), Err(SelectionError::NotANumber(String::new())));
        assert_eq!(parse_indices("-1", 2), Err(SelectionError::NotANumber("-1".into())));
        assert_eq!(parse_indices("1,", 2), Err(SelectionError::NotANumber(String::new())));
    }

    #[test]
    fn test_select_resolves_identities_at_selection_time() {
        let host = Host::new("nas", 61208);
        let mut drives = vec![record("sda"), record("sdb"), record("sdc")];
        let mut pool = SelectedPool::new();

        assert_eq!(pool.select(&host, &drives, "3,1"), Ok(2));

        // a later reordering by the agent does not change what was picked
        drives.reverse();
        assert_eq!(names(&pool), vec!["sdc on nas:61208", "sda on nas:61208"]);
    }

    #[test]
    fn test_select_deduplicates_silently() {
        let host = Host::new("nas", 61208);
        let drives = vec![record("sda"), record("sdb")];
        let mut pool = SelectedPool::new();

        assert_eq!(pool.select(&host, &drives, "1,1,2"), Ok(2));
        assert_eq!(pool.select(&host, &drives, "2"), Ok(0));
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn test_same_device_name_on_two_hosts() {
        let drives = vec![record("sda")];
        let mut pool = SelectedPool::new();

        pool.select(&Host::new("alpha", 61208), &drives, "1").unwrap();
        pool.select(&Host::new("beta", 61208), &drives, "1").unwrap();

        assert_eq!(names(&pool), vec!["sda on alpha:61208", "sda on beta:61208"]);
    }

    #[test]
    fn test_failed_select_leaves_pool_untouched() {
        let host = Host::new("nas", 61208);
        let drives = vec![record("sda")];
        let mut pool = SelectedPool::new();

        assert!(pool.select(&host, &drives, "1,2").is_err());
        assert!(pool.is_empty());
    }
}
