//! Bounded-concurrency reachability checks
//!
//! A URL is first normalized (mirror prefix stripped, scheme restored),
//! then rejected outright if its host is excluded, then answered from the
//! memo if possible. Only then is a HEAD request issued, under a permit
//! from a semaphore shared by every caller of the validator.

use crate::config::ProbeConfig;
use crate::crawler::build_http_client;
use crate::probe::ReachabilityCache;
use crate::url::{extract_host, is_excluded_host, normalize_candidate};
use crate::Result;
use reqwest::redirect::Policy;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use url::Url;

/// Memoized, concurrency-bounded URL reachability checker
#[derive(Debug)]
pub struct UrlValidator {
    client: Client,
    permits: Arc<Semaphore>,
    cache: ReachabilityCache,
    proxy_prefixes: Vec<String>,
    excluded_hosts: Vec<String>,
}

impl UrlValidator {
    /// Creates a validator from probe settings
    ///
    /// Redirects are not followed: a 3xx answer already proves the
    /// resource exists.
    pub fn new(config: &ProbeConfig) -> Result<Self> {
        let client = build_http_client(Duration::from_secs(config.timeout_secs), Policy::none())?;
        Ok(Self {
            client,
            permits: Arc::new(Semaphore::new(config.concurrency.max(1))),
            cache: ReachabilityCache::new(config.cache_capacity),
            proxy_prefixes: config.proxy_prefixes.clone(),
            excluded_hosts: config.excluded_hosts.clone(),
        })
    }

    /// Whether `url` answers a HEAD request with a 2xx or 3xx status
    ///
    /// Timeouts, connection failures, unparsable URLs and excluded hosts
    /// are all `false`. Results are memoized by normalized URL.
    pub async fn reachable(&self, url: &str) -> bool {
        let normalized = normalize_candidate(url, &self.proxy_prefixes);

        let parsed = match Url::parse(&normalized) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::debug!(url, "Unparsable URL: {}", e);
                return false;
            }
        };

        match extract_host(&parsed) {
            Some(host) if is_excluded_host(&host, &self.excluded_hosts) => {
                tracing::debug!(url, host = %host, "Excluded host");
                return false;
            }
            Some(_) => {}
            None => return false,
        }

        if let Some(hit) = self.cache.get(&normalized) {
            return hit;
        }

        let reachable = match self.permits.acquire().await {
            Ok(_permit) => self.probe(&normalized).await,
            Err(_) => false,
        };

        self.cache.put(normalized, reachable);
        reachable
    }

    /// Checks every URL concurrently and returns the reachable ones
    ///
    /// The input order is preserved. In-flight probes never exceed the
    /// configured concurrency, however large the batch.
    pub async fn validate_batch(self: &Arc<Self>, urls: Vec<String>) -> Vec<String> {
        let total = urls.len();
        let mut tasks = JoinSet::new();

        for (index, url) in urls.into_iter().enumerate() {
            let this = Arc::clone(self);
            tasks.spawn(async move {
                let ok = this.reachable(&url).await;
                (index, url, ok)
            });
        }

        let mut reachable = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, url, true)) => reachable.push((index, url)),
                Ok(_) => {}
                Err(e) => tracing::error!("Probe task failed: {}", e),
            }
        }
        reachable.sort_by_key(|(index, _)| *index);

        tracing::info!("{} of {} URLs reachable", reachable.len(), total);
        reachable.into_iter().map(|(_, url)| url).collect()
    }

    /// Number of memoized results
    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    async fn probe(&self, url: &str) -> bool {
        match self.client.head(url).send().await {
            Ok(response) => {
                let status = response.status();
                tracing::debug!(url, status = status.as_u16(), "Probed");
                status.is_success() || status.is_redirection()
            }
            Err(e) => {
                tracing::debug!(url, "Probe failed: {}", e);
                false
            }
        }
    }
}
