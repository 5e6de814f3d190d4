//! TVBox-Scout: a code-search crawler for TVBox configuration files
//!
//! This crate discovers TVBox configuration documents through the GitHub
//! code-search API, fetches candidate files, rejects duplicates by URL and by
//! content fingerprint, structurally validates what is left and stores the
//! accepted payloads. Per-query hit rates are persisted and steer the order
//! of future runs.

pub mod config;
pub mod crawler;
pub mod discovery;
pub mod output;
pub mod probe;
pub mod search;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for TVBox-Scout operations
#[derive(Debug, Error)]
pub enum ScoutError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Environment variable {var} is not set; a GitHub token is required")]
    MissingCredential { var: String },

    #[error("Search for '{query}' page {page} failed: {reason}")]
    Search {
        query: String,
        page: u32,
        reason: String,
    },

    #[error("Search for '{query}' page {page} still rate limited after {attempts} attempts")]
    RateLimited {
        query: String,
        page: u32,
        attempts: u32,
    },

    #[error("Malformed search response: {0}")]
    MalformedResponse(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,

    #[error("Not a browsable blob URL: {0}")]
    NotBlob(String),
}

/// Result type alias for TVBox-Scout operations
pub type Result<T> = std::result::Result<T, ScoutError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Orchestrator, QueryScheduler};
pub use probe::UrlValidator;
pub use search::{Credentials, SearchClient};
pub use url::{normalize_candidate, raw_content_url, strip_proxy_prefix};
