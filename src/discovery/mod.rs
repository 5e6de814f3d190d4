//! Source-list discovery
//!
//! Searches for raw stream-list URLs by keyword, screens them locally,
//! probes the survivors for reachability and merges the reachable ones
//! into a durable URL list.

mod prescreen;
mod url_list;

pub use prescreen::{Prescreen, Screened};
pub use url_list::{fetch_url_list, parse_url_list, read_url_list, write_url_list};

use crate::config::Config;
use crate::crawler::build_http_client;
use crate::probe::UrlValidator;
use crate::search::{Credentials, PageCursor, SearchClient};
use crate::url::raw_content_url;
use crate::Result;
use reqwest::redirect::Policy;
use reqwest::Client;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

const BACKUP_LIST_TIMEOUT: Duration = Duration::from_secs(10);

/// Outcome of one discovery pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiscoveryReport {
    /// URLs that passed screening and were probed
    pub candidates: usize,

    /// Probed URLs that turned out reachable
    pub validated: usize,

    /// Size of the list after merging; `None` when it was left untouched
    pub written: Option<usize>,
}

/// Keyword-driven discovery of stream-list URLs
pub struct SourceDiscovery {
    config: Arc<Config>,
    search: SearchClient,
    validator: Arc<UrlValidator>,
    prescreen: Prescreen,
    http: Client,
}

impl SourceDiscovery {
    pub fn new(config: Config, credentials: Credentials) -> Result<Self> {
        let search = SearchClient::new(&config.github, credentials)?;
        let validator = Arc::new(UrlValidator::new(&config.probe)?);
        let prescreen = Prescreen::new(&config.discovery)?;
        let http = build_http_client(BACKUP_LIST_TIMEOUT, Policy::limited(5))?;

        Ok(Self {
            config: Arc::new(config),
            search,
            validator,
            prescreen,
            http,
        })
    }

    /// Runs every keyword, validates new URLs and updates the list file
    ///
    /// The list is only rewritten when at least one new URL validates.
    pub async fn run(&self) -> Result<DiscoveryReport> {
        let urls_path = &self.config.discovery.urls_path;
        let existing = read_url_list(urls_path)?;

        let mut known = existing.clone();
        known.extend(self.fetch_backups().await);

        let discovered = self.search_keywords(&known).await;
        let mut report = DiscoveryReport {
            candidates: discovered.len(),
            ..DiscoveryReport::default()
        };

        if discovered.is_empty() {
            tracing::info!("No new URLs discovered");
            return Ok(report);
        }

        tracing::info!("Validating {} newly discovered URLs", discovered.len());
        let validated = self
            .validator
            .validate_batch(discovered.into_iter().collect())
            .await;
        report.validated = validated.len();

        if validated.is_empty() {
            tracing::info!("No discovered URL passed validation");
            return Ok(report);
        }

        let mut merged = existing;
        merged.extend(validated);
        write_url_list(urls_path, &merged)?;
        report.written = Some(merged.len());

        tracing::info!(
            "Saved {} URLs ({} new)",
            merged.len(),
            report.validated
        );
        Ok(report)
    }

    /// Entries of every backup list; failed downloads are skipped
    async fn fetch_backups(&self) -> BTreeSet<String> {
        let mut urls = BTreeSet::new();
        for backup in &self.config.discovery.backup_urls {
            match fetch_url_list(&self.http, backup).await {
                Ok(list) => {
                    tracing::info!(url = %backup, "Loaded {} known URLs from backup", list.len());
                    urls.extend(list);
                }
                Err(e) => tracing::warn!(url = %backup, "Failed to load backup list: {}", e),
            }
        }
        urls
    }

    /// Collects screened raw URLs that are neither known nor already found
    async fn search_keywords(&self, known: &BTreeSet<String>) -> BTreeSet<String> {
        let mut discovered = BTreeSet::new();
        let delay = self.config.github.inter_query_delay();

        for (i, keyword) in self.config.discovery.keywords.iter().enumerate() {
            if i > 0 && !delay.is_zero() {
                tracing::info!(keyword = %keyword, "Waiting {:?} before next keyword", delay);
                tokio::time::sleep(delay).await;
            }

            let mut cursor = PageCursor::new(keyword.as_str(), self.config.github.max_pages);
            while let Some(result) = self.search.next_page(&mut cursor).await {
                let page = match result {
                    Ok(page) => page,
                    Err(e) => {
                        tracing::error!(keyword = %keyword, "Search failed: {}", e);
                        continue;
                    }
                };

                let before = discovered.len();
                for item in &page.items {
                    let Ok(raw) = raw_content_url(&item.html_url, &self.config.github.raw_base_url)
                    else {
                        continue;
                    };

                    match self.prescreen.check(&raw) {
                        Screened::Candidate => {}
                        Screened::WrongSuffix => continue,
                        Screened::Blocked(index) => {
                            tracing::debug!(url = %raw, pattern = index, "Blocked by invalid-URL pattern");
                            continue;
                        }
                    }

                    if !known.contains(&raw) {
                        discovered.insert(raw);
                    }
                }

                tracing::info!(
                    keyword = %keyword,
                    "Found {} new URLs on this page",
                    discovered.len() - before
                );
            }
        }

        discovered
    }
}

/// Runs one source-list discovery pass
pub async fn run_source_discovery(config: Config, credentials: Credentials) -> Result<DiscoveryReport> {
    SourceDiscovery::new(config, credentials)?.run().await
}
