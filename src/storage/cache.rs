//! Discovery cache with load-time expiry
//!
//! Records describe accepted search hits (file name, path, repository) and
//! feed dynamic query mining. Anything older than the retention window is
//! dropped when the file is loaded and therefore never written back.

use crate::storage::{read_json, write_json, StorageResult};
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// One cached discovery record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheRecord {
    /// ISO-8601 timestamp of when the item was last seen modified
    pub last_modified: String,

    #[serde(default)]
    pub file_name: String,

    #[serde(default)]
    pub path: String,

    /// Repository full name (`owner/name`)
    #[serde(default)]
    pub repo: String,
}

impl CacheRecord {
    /// Creates a record stamped with the given time
    pub fn new(
        file_name: impl Into<String>,
        path: impl Into<String>,
        repo: impl Into<String>,
        modified: DateTime<Utc>,
    ) -> Self {
        Self {
            last_modified: modified.to_rfc3339(),
            file_name: file_name.into(),
            path: path.into(),
            repo: repo.into(),
        }
    }

    /// Parses `last_modified`; offset-less timestamps are read as UTC
    pub fn modified_at(&self) -> Option<DateTime<Utc>> {
        if let Ok(ts) = DateTime::parse_from_rfc3339(&self.last_modified) {
            return Some(ts.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(&self.last_modified, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc())
    }

    /// Returns true if the record is still inside the retention window
    ///
    /// A window reaching past the earliest representable time keeps every
    /// parsable record.
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        let Some(modified) = self.modified_at() else {
            return false;
        };
        now.checked_sub_signed(ttl)
            .map_or(true, |cutoff| modified > cutoff)
    }
}

/// TTL-bounded key to record cache backed by a JSON file
#[derive(Debug, Clone)]
pub struct DiscoveryCache {
    path: PathBuf,
    records: BTreeMap<String, CacheRecord>,
}

impl DiscoveryCache {
    /// Creates an empty cache that will be saved to `path`
    pub fn empty(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            records: BTreeMap::new(),
        }
    }

    /// Loads the cache, dropping records older than `ttl_days`
    ///
    /// A missing or unreadable file yields an empty cache; the problem is
    /// logged and the run continues.
    pub fn load(path: &Path, ttl_days: i64) -> Self {
        Self::load_at(path, ttl_days, Utc::now())
    }

    /// Loads the cache relative to an explicit `now`
    pub fn load_at(path: &Path, ttl_days: i64, now: DateTime<Utc>) -> Self {
        let raw: BTreeMap<String, serde_json::Value> = match read_json(path) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Self::empty(path),
            Err(e) => {
                tracing::warn!("Error loading cache: {}", e);
                return Self::empty(path);
            }
        };

        let ttl = Duration::try_days(ttl_days).unwrap_or(Duration::MAX);
        let total = raw.len();
        let records: BTreeMap<String, CacheRecord> = raw
            .into_iter()
            .filter_map(|(key, value)| match serde_json::from_value::<CacheRecord>(value) {
                Ok(record) => Some((key, record)),
                Err(e) => {
                    tracing::debug!(key = %key, "Dropping malformed cache record: {}", e);
                    None
                }
            })
            .filter(|(_, record)| record.is_fresh(now, ttl))
            .collect();

        tracing::info!(
            "Loaded {} cache records ({} expired or malformed dropped)",
            records.len(),
            total - records.len()
        );

        Self {
            path: path.to_path_buf(),
            records,
        }
    }

    /// Persists the cache
    pub fn save(&self) -> StorageResult<()> {
        write_json(&self.path, &self.records)
    }

    /// Inserts or replaces a record
    pub fn insert(&mut self, key: impl Into<String>, record: CacheRecord) {
        self.records.insert(key.into(), record);
    }

    pub fn get(&self, key: &str) -> Option<&CacheRecord> {
        self.records.get(key)
    }

    pub fn records(&self) -> impl Iterator<Item = &CacheRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_cache(dir: &TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("search_cache.json");
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_expired_records_dropped_on_load() {
        let dir = TempDir::new().unwrap();
        let now = Utc::now();
        let fresh = (now - Duration::days(2)).to_rfc3339();
        let stale = (now - Duration::days(31)).to_rfc3339();
        let path = write_cache(
            &dir,
            &format!(
                r#"{{
                    "fresh": {{"last_modified": "{}", "file_name": "tv.json", "path": "a/tv.json", "repo": "u/r"}},
                    "stale": {{"last_modified": "{}", "file_name": "old.json", "path": "old.json", "repo": "u/r"}}
                }}"#,
                fresh, stale
            ),
        );

        let cache = DiscoveryCache::load_at(&path, 30, now);
        assert_eq!(cache.len(), 1);
        assert!(cache.get("fresh").is_some());
        assert!(cache.get("stale").is_none());
    }

    #[test]
    fn test_expired_records_never_written_back() {
        let dir = TempDir::new().unwrap();
        let now = Utc::now();
        let stale = (now - Duration::days(45)).to_rfc3339();
        let path = write_cache(
            &dir,
            &format!(r#"{{"stale": {{"last_modified": "{}"}}}}"#, stale),
        );

        let mut cache = DiscoveryCache::load_at(&path, 30, now);
        cache.insert("new", CacheRecord::new("tv.json", "tv.json", "u/r", now));
        cache.save().unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("\"new\""));
        assert!(!content.contains("\"stale\""));
    }

    #[test]
    fn test_zulu_and_naive_timestamps_parse() {
        let zulu = CacheRecord {
            last_modified: "2024-05-01T10:00:00Z".to_string(),
            file_name: String::new(),
            path: String::new(),
            repo: String::new(),
        };
        let naive = CacheRecord {
            last_modified: "2024-05-01T10:00:00.123456".to_string(),
            ..zulu.clone()
        };

        assert!(zulu.modified_at().is_some());
        assert!(naive.modified_at().is_some());
    }

    #[test]
    fn test_malformed_record_dropped_others_kept() {
        let dir = TempDir::new().unwrap();
        let now = Utc::now();
        let path = write_cache(
            &dir,
            &format!(
                r#"{{"bad": {{"last_modified": "yesterday"}}, "num": 5, "ok": {{"last_modified": "{}"}}}}"#,
                now.to_rfc3339()
            ),
        );

        let cache = DiscoveryCache::load_at(&path, 30, now);
        assert_eq!(cache.len(), 1);
        assert!(cache.get("ok").is_some());
    }

    #[test]
    fn test_huge_ttl_keeps_records() {
        let dir = TempDir::new().unwrap();
        let now = Utc::now();
        let path = write_cache(
            &dir,
            &format!(
                r#"{{"old": {{"last_modified": "{}"}}}}"#,
                (now - Duration::days(3650)).to_rfc3339()
            ),
        );

        assert_eq!(DiscoveryCache::load_at(&path, 100_000_000, now).len(), 1);
        assert_eq!(DiscoveryCache::load_at(&path, i64::MAX, now).len(), 1);
    }

    #[test]
    fn test_missing_or_corrupt_file_is_empty() {
        let dir = TempDir::new().unwrap();
        assert!(DiscoveryCache::load(&dir.path().join("none.json"), 30).is_empty());

        let path = write_cache(&dir, "[1, 2");
        assert!(DiscoveryCache::load(&path, 30).is_empty());
    }
}
