use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Baseline code-search expressions run on every pass
pub const DEFAULT_BASE_QUERIES: &[&str] = &[
    "filename:config.json tvbox in:file",
    "filename:tv.json tvbox in:file",
    "filename:interface.json tvbox in:file",
    "extension:json path:tvbox",
    "extension:json path:config",
    "extension:json sites in:file language:json",
    "extension:json lives in:file language:json",
    "extension:json spider in:file language:json",
    "extension:json api in:file language:json",
    "extension:json channels in:file language:json",
];

/// Known mirror prefixes stripped before a URL is checked
pub const DEFAULT_PROXY_PREFIXES: &[&str] = &[
    "https://ghproxy.com/",
    "https://ghp.ci/",
    "https://raw.gitmirror.com/",
    "https://github.3x25.com/",
];

/// Hosts that are rejected without a network call
pub const DEFAULT_EXCLUDED_HOSTS: &[&str] = &["agit.ai", "gitcode.net", "cccimg.com"];

/// Main configuration structure for TVBox-Scout
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub github: GithubConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub probe: ProbeConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
}

/// Code-search API behavior
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct GithubConfig {
    /// Base URL of the REST API (the search path is appended)
    pub api_base_url: String,

    /// Base URL browsable blob links are rewritten onto
    pub raw_base_url: String,

    /// Environment variable holding the bearer token
    pub token_env: String,

    /// Results requested per page
    pub per_page: u32,

    /// Page ceiling per query
    pub max_pages: u32,

    /// Page ceiling per query when there are more queries than workers
    pub max_pages_when_saturated: u32,

    pub sort: String,
    pub order: String,

    /// Attempts per page before the query is abandoned
    pub max_retries: u32,

    /// Unit for transient-failure backoff (unit * 2^attempt)
    pub retry_backoff_ms: u64,

    /// Remaining-quota level at which requests pause until the reset
    pub rate_limit_threshold: u32,

    /// Extra wait added on top of a quota reset time
    pub reset_margin_secs: u64,

    /// Linear backoff unit for permission-denied responses without a reset header
    pub forbidden_backoff_secs: u64,

    pub request_timeout_secs: u64,

    /// Pause a worker takes after finishing a query
    pub inter_query_delay_secs: u64,

    /// Optional cap on the number of parallel query workers
    pub max_workers: Option<usize>,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.github.com".to_string(),
            raw_base_url: "https://raw.githubusercontent.com".to_string(),
            token_env: "BOT".to_string(),
            per_page: 100,
            max_pages: 10,
            max_pages_when_saturated: 5,
            sort: "indexed".to_string(),
            order: "desc".to_string(),
            max_retries: 3,
            retry_backoff_ms: 1000,
            rate_limit_threshold: 3,
            reset_margin_secs: 5,
            forbidden_backoff_secs: 60,
            request_timeout_secs: 30,
            inter_query_delay_secs: 20,
            max_workers: None,
        }
    }
}

impl GithubConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn inter_query_delay(&self) -> Duration {
        Duration::from_secs(self.inter_query_delay_secs)
    }

    pub fn reset_margin(&self) -> Duration {
        Duration::from_secs(self.reset_margin_secs)
    }
}

/// Raw-content fetch behavior
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct FetchConfig {
    /// Attempts per candidate URL
    pub attempts: u32,

    /// Exponential base; attempt `n` waits `unit * base^n`
    pub backoff_base: f64,

    pub backoff_unit_ms: u64,

    pub timeout_secs: u64,

    /// Maximum in-flight fetches per page
    pub concurrency: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff_base: 2.0,
            backoff_unit_ms: 1000,
            timeout_secs: 10,
            concurrency: 100,
        }
    }
}

/// Flat-file persistence locations
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct StorageConfig {
    /// Directory accepted artifacts are written to
    pub artifact_dir: PathBuf,

    pub cache_path: PathBuf,

    pub stats_path: PathBuf,

    /// Retention window for discovery cache records
    pub cache_ttl_days: i64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            artifact_dir: PathBuf::from("box"),
            cache_path: PathBuf::from("search_cache.json"),
            stats_path: PathBuf::from("query_stats.json"),
            cache_ttl_days: 30,
        }
    }
}

/// Query list construction
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SchedulerConfig {
    pub base_queries: Vec<String>,

    /// Cap on queries mined from the discovery cache
    pub max_dynamic_queries: usize,

    /// Minimum occurrences before a file name becomes a query
    pub filename_threshold: usize,

    /// Minimum occurrences before a parent path becomes a query
    pub path_threshold: usize,

    /// Minimum occurrences before a repository becomes a query
    pub repo_threshold: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            base_queries: DEFAULT_BASE_QUERIES.iter().map(|q| q.to_string()).collect(),
            max_dynamic_queries: 5,
            filename_threshold: 2,
            path_threshold: 2,
            repo_threshold: 3,
        }
    }
}

/// Reachability probing
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ProbeConfig {
    /// Maximum in-flight probes
    pub concurrency: usize,

    pub timeout_secs: u64,

    /// Capacity of the memoized result cache
    pub cache_capacity: usize,

    pub proxy_prefixes: Vec<String>,

    pub excluded_hosts: Vec<String>,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            concurrency: 50,
            timeout_secs: 5,
            cache_capacity: 10_000,
            proxy_prefixes: DEFAULT_PROXY_PREFIXES.iter().map(|p| p.to_string()).collect(),
            excluded_hosts: DEFAULT_EXCLUDED_HOSTS.iter().map(|h| h.to_string()).collect(),
        }
    }
}

/// Source-list discovery
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct DiscoveryConfig {
    pub keywords: Vec<String>,

    /// Durable list that validated URLs are merged into
    pub urls_path: PathBuf,

    /// Suffix a raw URL must end with (case-insensitive)
    pub required_suffix: String,

    /// Regular expressions that disqualify a URL
    pub invalid_url_patterns: Vec<String>,

    /// Plain-text URL lists whose entries count as already known
    pub backup_urls: Vec<String>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            keywords: Vec::new(),
            urls_path: PathBuf::from("config/urls.txt"),
            required_suffix: ".m3u8".to_string(),
            invalid_url_patterns: Vec::new(),
            backup_urls: Vec::new(),
        }
    }
}
