//! HTTP side of the code-search API

use crate::config::GithubConfig;
use crate::crawler::build_http_client;
use crate::search::quota::{forbidden_wait, QuotaGate, RateHeaders};
use crate::search::PageCursor;
use crate::{Result, ScoutError};
use chrono::Utc;
use reqwest::header::{ACCEPT, RETRY_AFTER};
use reqwest::redirect::Policy;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

const SEARCH_PATH: &str = "/search/code";
const ACCEPT_JSON: &str = "application/vnd.github.v3+json";

/// Bearer token for the search API
#[derive(Clone)]
pub struct Credentials {
    token: String,
}

impl Credentials {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    /// Reads the token from an environment variable
    ///
    /// An unset or blank variable is fatal: nothing can be searched without it.
    pub fn from_env(var: &str) -> Result<Self> {
        match std::env::var(var) {
            Ok(token) if !token.trim().is_empty() => Ok(Self::new(token.trim())),
            _ => Err(ScoutError::MissingCredential {
                var: var.to_string(),
            }),
        }
    }

    pub(crate) fn token(&self) -> &str {
        &self.token
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Repository a search hit belongs to
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RepositoryRef {
    #[serde(default)]
    pub full_name: String,
}

/// One code-search hit
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SearchItem {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub path: String,

    /// Browsable reference URL of the file
    #[serde(default)]
    pub html_url: String,

    #[serde(default)]
    pub repository: Option<RepositoryRef>,
}

impl SearchItem {
    pub fn repo_name(&self) -> &str {
        self.repository
            .as_ref()
            .map(|r| r.full_name.as_str())
            .unwrap_or("")
    }
}

/// One page of search results
#[derive(Debug, Clone, Default)]
pub struct SearchPage {
    pub items: Vec<SearchItem>,
    /// Total hits the API reports for the query
    pub total_count: u64,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    total_count: u64,
    #[serde(default)]
    items: Vec<SearchItem>,
}

/// Why the last attempt for a page failed
enum Failure {
    Transient(String),
    RateLimited,
}

/// Paginated, rate-limit aware client for the code-search endpoint
pub struct SearchClient {
    http: Client,
    endpoint: String,
    config: GithubConfig,
    credentials: Credentials,
    quota: Arc<QuotaGate>,
}

impl SearchClient {
    /// Builds a client for the configured API base URL
    pub fn new(config: &GithubConfig, credentials: Credentials) -> Result<Self> {
        let http = build_http_client(config.request_timeout(), Policy::limited(5))?;
        Ok(Self {
            http,
            endpoint: format!("{}{}", config.api_base_url.trim_end_matches('/'), SEARCH_PATH),
            config: config.clone(),
            credentials,
            quota: Arc::new(QuotaGate::new()),
        })
    }

    /// The quota gate shared by all callers of this client
    pub fn quota(&self) -> &QuotaGate {
        &self.quota
    }

    /// Fetches one page of results for `query`
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | Connection error / timeout / 5xx | Retry after `backoff * 2^attempt` |
    /// | HTTP 403 | Retry after reset-header wait, else `forbidden_backoff * attempt` |
    /// | HTTP 429 | Retry after `Retry-After`, else `forbidden_backoff * attempt` |
    /// | Other 4xx | Fail immediately |
    /// | Malformed body | Fail immediately |
    ///
    /// After every successful response the quota headers are checked and the
    /// shared gate is closed when the remaining allowance is low.
    pub async fn search(&self, query: &str, page: u32) -> Result<SearchPage> {
        let max_attempts = self.config.max_retries.max(1);
        let mut last_failure = Failure::Transient("no attempt made".to_string());

        for attempt in 0..max_attempts {
            let is_last = attempt + 1 == max_attempts;
            self.quota.wait().await;

            let response = match self.send(query, page).await {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!(
                        query,
                        page,
                        "Error searching (attempt {}/{}): {}",
                        attempt + 1,
                        max_attempts,
                        e
                    );
                    last_failure = Failure::Transient(e.to_string());
                    if !is_last {
                        tokio::time::sleep(self.transient_backoff(attempt)).await;
                    }
                    continue;
                }
            };

            let status = response.status();
            let rate = RateHeaders::from_headers(response.headers());

            if status == StatusCode::FORBIDDEN || status == StatusCode::TOO_MANY_REQUESTS {
                let wait = if status == StatusCode::TOO_MANY_REQUESTS {
                    retry_after(&response).unwrap_or_else(|| self.forbidden_backoff() * (attempt + 1))
                } else {
                    forbidden_wait(
                        rate.reset,
                        attempt + 1,
                        Utc::now().timestamp(),
                        self.config.reset_margin(),
                        self.forbidden_backoff(),
                    )
                };
                tracing::warn!(
                    query,
                    page,
                    status = status.as_u16(),
                    "Rate limited (attempt {}/{}), waiting {}s",
                    attempt + 1,
                    max_attempts,
                    wait.as_secs()
                );
                last_failure = Failure::RateLimited;
                if !is_last {
                    tokio::time::sleep(wait).await;
                }
                continue;
            }

            if status.is_server_error() {
                tracing::warn!(
                    query,
                    page,
                    status = status.as_u16(),
                    "Server error (attempt {}/{})",
                    attempt + 1,
                    max_attempts
                );
                last_failure = Failure::Transient(format!("HTTP {}", status.as_u16()));
                if !is_last {
                    tokio::time::sleep(self.transient_backoff(attempt)).await;
                }
                continue;
            }

            if !status.is_success() {
                return Err(ScoutError::Search {
                    query: query.to_string(),
                    page,
                    reason: format!("HTTP {}", status.as_u16()),
                });
            }

            let body = match response.bytes().await {
                Ok(body) => body,
                Err(e) => {
                    last_failure = Failure::Transient(e.to_string());
                    if !is_last {
                        tokio::time::sleep(self.transient_backoff(attempt)).await;
                    }
                    continue;
                }
            };

            let parsed: SearchResponse =
                serde_json::from_slice(&body).map_err(|e| ScoutError::Search {
                    query: query.to_string(),
                    page,
                    reason: format!("malformed response: {}", e),
                })?;

            self.quota.observe(
                &rate,
                u64::from(self.config.rate_limit_threshold),
                self.config.reset_margin(),
            );

            return Ok(SearchPage {
                items: parsed.items,
                total_count: parsed.total_count,
            });
        }

        tracing::error!(query, page, "Failed to search after {} attempts", max_attempts);
        Err(match last_failure {
            Failure::RateLimited => ScoutError::RateLimited {
                query: query.to_string(),
                page,
                attempts: max_attempts,
            },
            Failure::Transient(reason) => ScoutError::Search {
                query: query.to_string(),
                page,
                reason,
            },
        })
    }

    /// Fetches the cursor's next page, advancing or finishing it
    ///
    /// Returns `None` once pagination is over. A failed page finishes the
    /// cursor, so the caller moves on to its next query.
    pub async fn next_page(&self, cursor: &mut PageCursor) -> Option<Result<SearchPage>> {
        let page = cursor.next_page()?;
        match self.search(cursor.query(), page).await {
            Ok(result) => {
                cursor.advance(&result);
                Some(Ok(result))
            }
            Err(e) => {
                cursor.finish();
                Some(Err(e))
            }
        }
    }

    async fn send(&self, query: &str, page: u32) -> std::result::Result<reqwest::Response, reqwest::Error> {
        let per_page = self.config.per_page.to_string();
        let page = page.to_string();
        self.http
            .get(&self.endpoint)
            .bearer_auth(self.credentials.token())
            .header(ACCEPT, ACCEPT_JSON)
            .query(&[
                ("q", query),
                ("per_page", per_page.as_str()),
                ("page", page.as_str()),
                ("sort", self.config.sort.as_str()),
                ("order", self.config.order.as_str()),
            ])
            .send()
            .await
    }

    fn transient_backoff(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.config.retry_backoff_ms.saturating_mul(1u64 << attempt.min(16)))
    }

    fn forbidden_backoff(&self) -> Duration {
        Duration::from_secs(self.config.forbidden_backoff_secs)
    }
}

fn retry_after(response: &reqwest::Response) -> Option<Duration> {
    response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}
