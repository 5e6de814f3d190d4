//! Per-query performance statistics
//!
//! The table maps a query string to how many of its search hits were seen
//! and how many were accepted. The resulting hit rate orders the next run.

use crate::storage::{read_json, write_json, StorageResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Accepted and attempted counts for one query
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryStats {
    #[serde(default)]
    pub valid: u64,
    #[serde(default)]
    pub total: u64,
}

impl QueryStats {
    pub fn new(valid: u64, total: u64) -> Self {
        Self { valid, total }
    }

    /// valid / max(total, 1)
    pub fn hit_rate(&self) -> f64 {
        self.valid as f64 / self.total.max(1) as f64
    }
}

/// Query statistics table backed by a JSON file
#[derive(Debug, Clone)]
pub struct StatsTable {
    path: PathBuf,
    entries: BTreeMap<String, QueryStats>,
}

impl StatsTable {
    pub fn empty(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            entries: BTreeMap::new(),
        }
    }

    /// Loads the table; a missing or unreadable file yields an empty table
    ///
    /// Malformed entries are dropped one by one.
    pub fn load(path: &Path) -> Self {
        match read_json::<BTreeMap<String, serde_json::Value>>(path) {
            Ok(Some(raw)) => Self {
                path: path.to_path_buf(),
                entries: raw
                    .into_iter()
                    .filter_map(|(query, value)| match serde_json::from_value::<QueryStats>(value) {
                        Ok(stats) => Some((query, stats)),
                        Err(e) => {
                            tracing::debug!(query = %query, "Dropping malformed query stats: {}", e);
                            None
                        }
                    })
                    .collect(),
            },
            Ok(None) => Self::empty(path),
            Err(e) => {
                tracing::warn!("Error loading query stats: {}", e);
                Self::empty(path)
            }
        }
    }

    /// Persists the table
    pub fn save(&self) -> StorageResult<()> {
        write_json(&self.path, &self.entries)
    }

    /// Returns the stats for a query, zeroed if never run
    pub fn get(&self, query: &str) -> QueryStats {
        self.entries.get(query).copied().unwrap_or_default()
    }

    pub fn hit_rate(&self, query: &str) -> f64 {
        self.get(query).hit_rate()
    }

    /// Adds one page worth of counts to a query's entry
    pub fn record(&mut self, query: &str, valid: u64, total: u64) -> QueryStats {
        let entry = self.entries.entry(query.to_string()).or_default();
        entry.valid += valid;
        entry.total += total;
        *entry
    }

    pub fn set(&mut self, query: &str, stats: QueryStats) {
        self.entries.insert(query.to_string(), stats);
    }

    pub fn entries(&self) -> impl Iterator<Item = (&String, &QueryStats)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
