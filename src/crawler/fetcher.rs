//! Raw-content fetcher
//!
//! This module handles the HTTP work of the pipeline:
//! - Building HTTP clients with the crate's user agent and timeouts
//! - GET requests for candidate payloads
//! - Bounded retries with exponential backoff
//!
//! A candidate that cannot be fetched is skipped, never fatal, so the
//! fetcher reports failure as `None` rather than an error.

use crate::config::FetchConfig;
use reqwest::{redirect::Policy, Client};
use std::time::Duration;

/// User agent sent with every request
pub const USER_AGENT: &str = concat!("tvbox-scout/", env!("CARGO_PKG_VERSION"));

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `timeout` - Per-request deadline
/// * `redirect` - Redirect policy; probes use `Policy::none()` so a 3xx is
///   observed directly
pub fn build_http_client(timeout: Duration, redirect: Policy) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .redirect(redirect)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches candidate bodies with bounded retries
#[derive(Debug, Clone)]
pub struct ContentFetcher {
    client: Client,
    attempts: u32,
    backoff_base: f64,
    backoff_unit: Duration,
}

impl ContentFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, reqwest::Error> {
        let client = build_http_client(Duration::from_secs(config.timeout_secs), Policy::limited(10))?;
        Ok(Self::with_client(client, config))
    }

    pub fn with_client(client: Client, config: &FetchConfig) -> Self {
        Self {
            client,
            attempts: config.attempts.max(1),
            backoff_base: config.backoff_base,
            backoff_unit: Duration::from_millis(config.backoff_unit_ms),
        }
    }

    /// Delay before retrying after the failed attempt `attempt` (0-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = self.backoff_base.powi(attempt.min(30) as i32);
        self.backoff_unit.mul_f64(factor)
    }

    /// Fetches the body of `url`
    ///
    /// Non-2xx statuses, connection errors and timeouts all count as a
    /// failed attempt. Returns `None` once every attempt has failed.
    pub async fn fetch(&self, url: &str) -> Option<Vec<u8>> {
        for attempt in 0..self.attempts {
            match self.try_fetch(url).await {
                Ok(body) => return Some(body),
                Err(e) => {
                    tracing::warn!(
                        url,
                        "Error fetching (attempt {}/{}): {}",
                        attempt + 1,
                        self.attempts,
                        e
                    );
                    if attempt + 1 < self.attempts {
                        tokio::time::sleep(self.backoff(attempt)).await;
                    }
                }
            }
        }

        tracing::error!(url, "Failed to fetch after {} attempts", self.attempts);
        None
    }

    async fn try_fetch(&self, url: &str) -> Result<Vec<u8>, reqwest::Error> {
        self.client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await
            .map(|body| body.to_vec())
    }
}
