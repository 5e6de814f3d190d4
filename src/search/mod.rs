//! Code-search API client
//!
//! This module handles everything between a query string and a page of
//! search hits:
//! - Bearer credentials read from the environment
//! - Paginated requests with cursor-based termination
//! - Transient-failure retries with exponential backoff
//! - Proactive quota pausing and reactive rate-limit backoff

mod client;
mod pagination;
mod quota;

pub use client::{Credentials, RepositoryRef, SearchClient, SearchItem, SearchPage};
pub use pagination::PageCursor;
pub use quota::{forbidden_wait, wait_until_reset, QuotaGate, RateHeaders};
