use crate::config::types::{
    Config, DiscoveryConfig, FetchConfig, GithubConfig, ProbeConfig, SchedulerConfig,
    StorageConfig,
};
use crate::ConfigError;
use regex::Regex;
use url::Url;

/// Upper bound for `cache-ttl-days` (one century)
const MAX_CACHE_TTL_DAYS: i64 = 36_500;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_github_config(&config.github)?;
    validate_fetch_config(&config.fetch)?;
    validate_storage_config(&config.storage)?;
    validate_scheduler_config(&config.scheduler)?;
    validate_probe_config(&config.probe)?;
    validate_discovery_config(&config.discovery)?;
    Ok(())
}

/// Validates code-search configuration
fn validate_github_config(config: &GithubConfig) -> Result<(), ConfigError> {
    validate_base_url("api_base_url", &config.api_base_url)?;
    validate_base_url("raw_base_url", &config.raw_base_url)?;

    if config.token_env.trim().is_empty() {
        return Err(ConfigError::Validation(
            "token_env cannot be empty".to_string(),
        ));
    }

    if config.per_page < 1 || config.per_page > 100 {
        return Err(ConfigError::Validation(format!(
            "per_page must be between 1 and 100, got {}",
            config.per_page
        )));
    }

    if config.max_pages < 1 || config.max_pages_when_saturated < 1 {
        return Err(ConfigError::Validation(format!(
            "max_pages and max_pages_when_saturated must be >= 1, got {} and {}",
            config.max_pages, config.max_pages_when_saturated
        )));
    }

    if config.max_retries < 1 {
        return Err(ConfigError::Validation(format!(
            "max_retries must be >= 1, got {}",
            config.max_retries
        )));
    }

    if config.order != "asc" && config.order != "desc" {
        return Err(ConfigError::Validation(format!(
            "order must be 'asc' or 'desc', got '{}'",
            config.order
        )));
    }

    if config.max_workers == Some(0) {
        return Err(ConfigError::Validation(
            "max_workers must be >= 1 when set".to_string(),
        ));
    }

    Ok(())
}

/// Validates raw-content fetch configuration
fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if config.attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "fetch attempts must be >= 1, got {}",
            config.attempts
        )));
    }

    if !config.backoff_base.is_finite() || config.backoff_base < 1.0 {
        return Err(ConfigError::Validation(format!(
            "backoff_base must be >= 1.0, got {}",
            config.backoff_base
        )));
    }

    if config.concurrency < 1 || config.concurrency > 1000 {
        return Err(ConfigError::Validation(format!(
            "fetch concurrency must be between 1 and 1000, got {}",
            config.concurrency
        )));
    }

    Ok(())
}

/// Validates storage locations
fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    for (name, path) in [
        ("artifact_dir", &config.artifact_dir),
        ("cache_path", &config.cache_path),
        ("stats_path", &config.stats_path),
    ] {
        if path.as_os_str().is_empty() {
            return Err(ConfigError::Validation(format!("{} cannot be empty", name)));
        }
    }

    if !(1..=MAX_CACHE_TTL_DAYS).contains(&config.cache_ttl_days) {
        return Err(ConfigError::Validation(format!(
            "cache_ttl_days must be between 1 and {}, got {}",
            MAX_CACHE_TTL_DAYS, config.cache_ttl_days
        )));
    }

    Ok(())
}

/// Validates query scheduling configuration
fn validate_scheduler_config(config: &SchedulerConfig) -> Result<(), ConfigError> {
    if config.base_queries.iter().any(|q| q.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "base_queries cannot contain empty queries".to_string(),
        ));
    }

    if config.filename_threshold < 1 || config.path_threshold < 1 || config.repo_threshold < 1 {
        return Err(ConfigError::Validation(
            "mining thresholds must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates reachability probe configuration
fn validate_probe_config(config: &ProbeConfig) -> Result<(), ConfigError> {
    if config.concurrency < 1 {
        return Err(ConfigError::Validation(format!(
            "probe concurrency must be >= 1, got {}",
            config.concurrency
        )));
    }

    if config.cache_capacity < 1 {
        return Err(ConfigError::Validation(format!(
            "probe cache_capacity must be >= 1, got {}",
            config.cache_capacity
        )));
    }

    for prefix in &config.proxy_prefixes {
        let url = Url::parse(prefix).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid proxy prefix '{}': {}", prefix, e))
        })?;
        if !prefix.ends_with('/') || url.host_str().is_none() {
            return Err(ConfigError::Validation(format!(
                "Proxy prefix '{}' must be an absolute URL ending in '/'",
                prefix
            )));
        }
    }

    if config.excluded_hosts.iter().any(|h| h.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "excluded_hosts cannot contain empty hosts".to_string(),
        ));
    }

    Ok(())
}

/// Validates source discovery configuration
fn validate_discovery_config(config: &DiscoveryConfig) -> Result<(), ConfigError> {
    for pattern in &config.invalid_url_patterns {
        Regex::new(pattern).map_err(|e| {
            ConfigError::InvalidPattern(format!("Invalid URL pattern '{}': {}", pattern, e))
        })?;
    }

    for backup in &config.backup_urls {
        Url::parse(backup).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid backup URL '{}': {}", backup, e))
        })?;
    }

    if config.urls_path.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "urls_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates an HTTP(S) base URL
fn validate_base_url(name: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {}: {}", name, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} must use http or https, got '{}'",
            name,
            url.scheme()
        )));
    }

    Ok(())
}
