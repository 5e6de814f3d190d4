//! Discovery run orchestration
//!
//! This module contains the main discovery loop that coordinates:
//! - Loading persisted statistics, the discovery cache and stored hashes
//! - Scheduling queries and spreading them over a pool of workers
//! - Per page: URL dedup, bounded concurrent fetch, content dedup,
//!   validation and artifact persistence
//! - Saving statistics and the cache after every page

use crate::config::Config;
use crate::crawler::{validate, ContentFetcher, QueryScheduler};
use crate::output::RunSummary;
use crate::search::{Credentials, PageCursor, SearchClient, SearchItem, SearchPage};
use crate::storage::{
    content_hash, ArtifactStore, CacheRecord, ContentHashIndex, DiscoveryCache, HashClaim,
    StatsTable,
};
use crate::url::{normalize_candidate, raw_content_url};
use crate::Result;
use chrono::Utc;
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Run-wide counters, updated concurrently by workers
#[derive(Debug, Default)]
struct RunCounters {
    queries_run: AtomicU64,
    queries_failed: AtomicU64,
    pages_fetched: AtomicU64,
    candidates_seen: AtomicU64,
    duplicates_skipped: AtomicU64,
    fetch_failures: AtomicU64,
    validation_failures: AtomicU64,
    accepted: AtomicU64,
}

impl RunCounters {
    fn bump(counter: &AtomicU64, by: u64) {
        counter.fetch_add(by, Ordering::Relaxed);
    }

    fn snapshot(&self) -> RunSummary {
        RunSummary {
            queries_run: self.queries_run.load(Ordering::Relaxed),
            queries_failed: self.queries_failed.load(Ordering::Relaxed),
            pages_fetched: self.pages_fetched.load(Ordering::Relaxed),
            candidates_seen: self.candidates_seen.load(Ordering::Relaxed),
            duplicates_skipped: self.duplicates_skipped.load(Ordering::Relaxed),
            fetch_failures: self.fetch_failures.load(Ordering::Relaxed),
            validation_failures: self.validation_failures.load(Ordering::Relaxed),
            accepted: self.accepted.load(Ordering::Relaxed),
        }
    }
}

/// Main discovery orchestrator
///
/// Everything workers share lives here behind an `Arc`. Maps and sets that
/// several workers write are guarded by mutexes that are never held across
/// an await point.
pub struct Orchestrator {
    config: Arc<Config>,
    search: SearchClient,
    fetcher: ContentFetcher,
    artifacts: ArtifactStore,
    hashes: ContentHashIndex,
    processed: Mutex<HashSet<String>>,
    stats: Mutex<StatsTable>,
    cache: Mutex<DiscoveryCache>,
    counters: RunCounters,
}

impl Orchestrator {
    /// Creates an orchestrator, loading all persisted state
    ///
    /// The artifact directory is created if needed and every artifact in it
    /// is hashed to seed content deduplication.
    pub fn new(config: Config, credentials: Credentials) -> Result<Self> {
        let artifacts = ArtifactStore::open(&config.storage.artifact_dir)?;
        let hashes = ContentHashIndex::seed_from_dir(artifacts.dir());
        let stats = StatsTable::load(&config.storage.stats_path);
        let cache = DiscoveryCache::load(&config.storage.cache_path, config.storage.cache_ttl_days);

        tracing::info!(
            "Loaded {} query stats and {} cache records",
            stats.len(),
            cache.len()
        );

        let search = SearchClient::new(&config.github, credentials)?;
        let fetcher = ContentFetcher::new(&config.fetch)?;

        Ok(Self {
            config: Arc::new(config),
            search,
            fetcher,
            artifacts,
            hashes,
            processed: Mutex::new(HashSet::new()),
            stats: Mutex::new(stats),
            cache: Mutex::new(cache),
            counters: RunCounters::default(),
        })
    }

    /// The query list for this run, best historical hit rate first
    pub fn scheduled_queries(&self) -> Vec<String> {
        let scheduler = QueryScheduler::new(&self.config.scheduler);
        let cache = lock(&self.cache);
        let stats = lock(&self.stats);
        scheduler.schedule(&cache, &stats)
    }

    /// Runs every scheduled query and returns the run's counters
    pub async fn run(self: Arc<Self>) -> RunSummary {
        let queries = self.scheduled_queries();
        self.run_queries(queries).await
    }

    /// Runs `queries` in order over the worker pool
    ///
    /// Workers pull the next query from a shared queue, so execution starts
    /// in list order even though queries then overlap.
    pub async fn run_queries(self: Arc<Self>, queries: Vec<String>) -> RunSummary {
        let start_time = std::time::Instant::now();
        let workers = worker_count(queries.len(), self.config.github.max_workers);
        let max_pages = if queries.len() > workers {
            self.config.github.max_pages_when_saturated
        } else {
            self.config.github.max_pages
        };

        tracing::info!(
            "Starting {} queries on {} workers (max {} pages each)",
            queries.len(),
            workers,
            max_pages
        );

        let queue = Arc::new(Mutex::new(VecDeque::from(queries)));
        let mut pool = JoinSet::new();
        for worker in 0..workers {
            let this = Arc::clone(&self);
            let queue = Arc::clone(&queue);
            pool.spawn(async move {
                loop {
                    let next = lock(&queue).pop_front();
                    let Some(query) = next else { break };
                    tracing::debug!(worker, query = %query, "Worker picked up query");
                    this.run_query(&query, max_pages).await;
                }
            });
        }

        while let Some(joined) = pool.join_next().await {
            if let Err(e) = joined {
                tracing::error!("Query worker failed: {}", e);
            }
        }

        self.persist();

        let summary = self.counters.snapshot();
        tracing::info!("Run finished in {:?}: {}", start_time.elapsed(), summary);
        summary
    }

    /// Current counters without waiting for the run to end
    pub fn summary(&self) -> RunSummary {
        self.counters.snapshot()
    }

    /// Paginates one query, processing each page before requesting the next
    async fn run_query(self: &Arc<Self>, query: &str, max_pages: u32) {
        RunCounters::bump(&self.counters.queries_run, 1);
        tracing::info!(query, "Processing query");

        let mut cursor = PageCursor::new(query, max_pages);
        while let Some(result) = self.search.next_page(&mut cursor).await {
            match result {
                Ok(page) => {
                    RunCounters::bump(&self.counters.pages_fetched, 1);
                    self.process_page(query, page).await;
                }
                Err(e) => {
                    RunCounters::bump(&self.counters.queries_failed, 1);
                    tracing::error!(query, "Abandoning query: {}", e);
                }
            }
        }

        let delay = self.config.github.inter_query_delay();
        if !delay.is_zero() {
            tracing::debug!(query, "Sleeping {:?} before next query", delay);
            tokio::time::sleep(delay).await;
        }
    }

    /// Handles one page of search results and records its statistics
    async fn process_page(self: &Arc<Self>, query: &str, page: SearchPage) {
        let total = page.items.len() as u64;
        RunCounters::bump(&self.counters.candidates_seen, total);

        let permits = Arc::new(Semaphore::new(self.config.fetch.concurrency.max(1)));
        let mut tasks = JoinSet::new();

        for item in page.items {
            let url = match raw_content_url(&item.html_url, &self.config.github.raw_base_url) {
                Ok(raw) => normalize_candidate(&raw, &self.config.probe.proxy_prefixes),
                Err(e) => {
                    tracing::debug!(query, url = %item.html_url, "Skipping item: {}", e);
                    RunCounters::bump(&self.counters.fetch_failures, 1);
                    continue;
                }
            };

            let first_sighting = lock(&self.processed).insert(url.clone());
            if !first_sighting {
                tracing::debug!(query, url = %url, "Skipping already processed URL");
                RunCounters::bump(&self.counters.duplicates_skipped, 1);
                continue;
            }

            let Ok(permit) = Arc::clone(&permits).acquire_owned().await else {
                break;
            };
            let this = Arc::clone(self);
            tasks.spawn(async move {
                let _permit = permit;
                this.process_candidate(item, url).await
            });
        }

        let mut valid = 0u64;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(true) => valid += 1,
                Ok(false) => {}
                Err(e) => tracing::error!(query, "Candidate task failed: {}", e),
            }
        }

        let updated = lock(&self.stats).record(query, valid, total);
        tracing::info!(
            query,
            valid,
            total,
            "Page done; query hit rate now {:.3}",
            updated.hit_rate()
        );

        self.persist();
    }

    /// Fetch, dedup, validate and store one candidate
    ///
    /// Returns whether an artifact was written.
    async fn process_candidate(&self, item: SearchItem, url: String) -> bool {
        let Some(body) = self.fetcher.fetch(&url).await else {
            RunCounters::bump(&self.counters.fetch_failures, 1);
            return false;
        };

        let hash = content_hash(&body);
        match self.hashes.claim(&hash) {
            HashClaim::New => {}
            claim => {
                tracing::info!(url = %url, hash = %hash, ?claim, "Skipping duplicate content");
                RunCounters::bump(&self.counters.duplicates_skipped, 1);
                return false;
            }
        }

        if !validate(&body) {
            tracing::info!(url = %url, "Rejected: not a recognizable config");
            RunCounters::bump(&self.counters.validation_failures, 1);
            return false;
        }

        let captured = Utc::now();
        match self.artifacts.save_at(&item.name, &body, captured) {
            Ok(path) => {
                tracing::info!(url = %url, hash = %hash, "Saved valid config to {}", path.display());
            }
            Err(e) => {
                tracing::error!(url = %url, "Failed to save artifact: {}", e);
                self.hashes.release(&hash);
                return false;
            }
        }

        lock(&self.cache).insert(
            item.html_url.clone(),
            CacheRecord::new(&item.name, &item.path, item.repo_name(), captured),
        );
        RunCounters::bump(&self.counters.accepted, 1);
        true
    }

    /// Writes statistics and the cache; failures are logged, not fatal
    fn persist(&self) {
        if let Err(e) = lock(&self.stats).save() {
            tracing::warn!("Failed to save query stats: {}", e);
        }
        if let Err(e) = lock(&self.cache).save() {
            tracing::warn!("Failed to save discovery cache: {}", e);
        }
    }
}

/// Runs a complete discovery pass with the configured credentials
///
/// # Example
///
/// ```no_run
/// use tvbox_scout::config::load_config;
/// use tvbox_scout::crawler::run_discovery;
/// use tvbox_scout::Credentials;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("scout.toml"))?;
/// let credentials = Credentials::from_env(&config.github.token_env)?;
/// let summary = run_discovery(config, credentials).await?;
/// println!("{}", summary);
/// # Ok(())
/// # }
/// ```
pub async fn run_discovery(config: Config, credentials: Credentials) -> Result<RunSummary> {
    let orchestrator = Arc::new(Orchestrator::new(config, credentials)?);
    Ok(orchestrator.run().await)
}

/// Pool size: bounded by the query count, the host's parallelism and the
/// optional configured cap, and never zero
fn worker_count(queries: usize, cap: Option<usize>) -> usize {
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    let mut workers = queries.min(cpus);
    if let Some(cap) = cap {
        workers = workers.min(cap);
    }
    workers.max(1)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
