//! Query scheduling
//!
//! This module handles:
//! - Building the query list from the baseline plus queries mined from the
//!   discovery cache
//! - Ordering that list by each query's historical hit rate
//!
//! The order is computed once per run, before any query executes.

use crate::config::SchedulerConfig;
use crate::storage::{CacheRecord, DiscoveryCache, StatsTable};
use std::collections::{HashMap, HashSet};

/// Builds and orders the query list for a run
#[derive(Debug, Clone)]
pub struct QueryScheduler {
    config: SchedulerConfig,
}

impl QueryScheduler {
    pub fn new(config: &SchedulerConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Baseline queries followed by mined ones, without duplicates
    pub fn build(&self, cache: &DiscoveryCache) -> Vec<String> {
        let mined = mine_queries(cache.records(), &self.config);
        tracing::info!("Added {} dynamic queries: {:?}", mined.len(), mined);

        let mut seen = HashSet::new();
        self.config
            .base_queries
            .iter()
            .cloned()
            .chain(mined)
            .filter(|q| seen.insert(q.clone()))
            .collect()
    }

    /// The full query list, sorted by descending hit rate
    pub fn schedule(&self, cache: &DiscoveryCache, stats: &StatsTable) -> Vec<String> {
        let queries = rank_by_hit_rate(self.build(cache), stats);
        tracing::info!("Sorted queries by hit rate: {:?}", queries);
        queries
    }
}

/// Stable sort by descending hit rate; ties keep their list order
pub fn rank_by_hit_rate(mut queries: Vec<String>, stats: &StatsTable) -> Vec<String> {
    queries.sort_by(|a, b| stats.hit_rate(b).total_cmp(&stats.hit_rate(a)));
    queries
}

/// Derives extra queries from recurring file names, parent paths and
/// repositories in the discovery cache
///
/// Each category has its own occurrence threshold. Within a category the
/// most frequent values come first (ties alphabetical); file-name queries
/// precede path queries, which precede repository queries. At most
/// `max_dynamic_queries` are returned.
pub fn mine_queries<'a, I>(records: I, config: &SchedulerConfig) -> Vec<String>
where
    I: IntoIterator<Item = &'a CacheRecord>,
{
    let mut file_names: HashMap<String, usize> = HashMap::new();
    let mut paths: HashMap<String, usize> = HashMap::new();
    let mut repos: HashMap<String, usize> = HashMap::new();

    for record in records {
        if let Some(name) = canonical_file_name(&record.file_name) {
            *file_names.entry(name).or_default() += 1;
        }
        if let Some((dir, _)) = record.path.rsplit_once('/') {
            if !dir.is_empty() {
                *paths.entry(dir.to_string()).or_default() += 1;
            }
        }
        if !record.repo.is_empty() {
            *repos.entry(record.repo.clone()).or_default() += 1;
        }
    }

    let mut queries = Vec::new();
    queries.extend(
        frequent(file_names, config.filename_threshold)
            .into_iter()
            .map(|name| format!("filename:{} tvbox in:file", name)),
    );
    queries.extend(
        frequent(paths, config.path_threshold)
            .into_iter()
            .map(|path| format!("extension:json path:{}", path)),
    );
    queries.extend(
        frequent(repos, config.repo_threshold)
            .into_iter()
            .map(|repo| format!("extension:json repo:{}", repo)),
    );

    queries.truncate(config.max_dynamic_queries);
    queries
}

/// `tv_20240101.json` and `tv.json` both count as `tv.json`
fn canonical_file_name(file_name: &str) -> Option<String> {
    let stem = file_name
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(file_name);
    let base = stem.split('_').next().unwrap_or("");

    if base.is_empty() || base.contains(char::is_whitespace) {
        None
    } else {
        Some(format!("{}.json", base))
    }
}

fn frequent(counts: HashMap<String, usize>, threshold: usize) -> Vec<String> {
    let mut kept: Vec<(String, usize)> = counts
        .into_iter()
        .filter(|(_, count)| *count >= threshold)
        .collect();
    kept.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    kept.into_iter().map(|(value, _)| value).collect()
}
