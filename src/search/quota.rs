//! Rate-limit bookkeeping for the search API
//!
//! Two independent policies live here. The proactive one inspects the quota
//! headers of every successful response and, once the remaining allowance
//! drops to the threshold, holds all later requests until the reset time
//! plus a margin. The reactive one computes how long to back off after a
//! permission-denied response.

use chrono::Utc;
use reqwest::header::HeaderMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

const REMAINING_HEADER: &str = "x-ratelimit-remaining";
const RESET_HEADER: &str = "x-ratelimit-reset";

/// Quota headers of one response
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RateHeaders {
    /// Requests left in the current window
    pub remaining: Option<u64>,
    /// Epoch second at which the window refills
    pub reset: Option<i64>,
}

impl RateHeaders {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let parse = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<i64>().ok())
        };

        Self {
            remaining: parse(REMAINING_HEADER).and_then(|v| u64::try_from(v).ok()),
            reset: parse(RESET_HEADER),
        }
    }
}

/// Time until `reset_epoch` (never negative) plus `margin`
pub fn wait_until_reset(reset_epoch: i64, now_epoch: i64, margin: Duration) -> Duration {
    let secs = reset_epoch.saturating_sub(now_epoch).max(0) as u64;
    Duration::from_secs(secs) + margin
}

/// Wait after a permission-denied response
///
/// Uses the reset header when present, otherwise `base * attempt` where
/// `attempt` is 1-based.
pub fn forbidden_wait(
    reset_epoch: Option<i64>,
    attempt: u32,
    now_epoch: i64,
    margin: Duration,
    base: Duration,
) -> Duration {
    match reset_epoch {
        Some(reset) => wait_until_reset(reset, now_epoch, margin),
        None => base * attempt.max(1),
    }
}

/// Shared gate that holds search requests while the quota is exhausted
///
/// The quota belongs to the token, not to a worker, so one gate is shared
/// by every worker using the same client.
#[derive(Debug, Default)]
pub struct QuotaGate {
    resume_at: Mutex<Option<Instant>>,
}

impl QuotaGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inspects a successful response's quota headers
    ///
    /// Returns the pause that was scheduled, if the remaining allowance is at
    /// or below `threshold`. Responses without quota headers change nothing.
    pub fn observe(&self, headers: &RateHeaders, threshold: u64, margin: Duration) -> Option<Duration> {
        let remaining = headers.remaining?;
        if remaining > threshold {
            return None;
        }

        let wait = match headers.reset {
            Some(reset) => wait_until_reset(reset, Utc::now().timestamp(), margin),
            None => margin,
        };

        let until = Instant::now() + wait;
        let mut resume_at = self.resume_at.lock().unwrap_or_else(PoisonError::into_inner);
        if resume_at.map_or(true, |current| current < until) {
            *resume_at = Some(until);
        }

        tracing::warn!(
            remaining,
            "Search quota nearly exhausted, pausing requests for {}s",
            wait.as_secs()
        );
        Some(wait)
    }

    /// Remaining pause, if any
    pub fn pending(&self) -> Option<Duration> {
        let resume_at = *self.resume_at.lock().unwrap_or_else(PoisonError::into_inner);
        resume_at
            .map(|at| at.saturating_duration_since(Instant::now()))
            .filter(|d| !d.is_zero())
    }

    /// Sleeps until the gate is open
    pub async fn wait(&self) {
        if let Some(delay) = self.pending() {
            tracing::debug!("Waiting {:?} for search quota reset", delay);
            tokio::time::sleep(delay).await;
        }
    }
}
