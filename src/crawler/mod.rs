//! Crawler module for the discovery pipeline
//!
//! This module contains the core discovery logic, including:
//! - Raw-content fetching with retry logic
//! - Structural validation of fetched configs
//! - Query list construction and ordering
//! - Overall run orchestration

mod coordinator;
mod fetcher;
mod scheduler;
mod validator;

pub use coordinator::{run_discovery, Orchestrator};
pub use fetcher::{build_http_client, ContentFetcher, USER_AGENT};
pub use scheduler::{mine_queries, rank_by_hit_rate, QueryScheduler};
pub use validator::{detect_shape, validate, ConfigShape};
