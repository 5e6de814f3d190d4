//! Configuration module for TVBox-Scout
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every section has defaults, so a minimal file only overrides what differs.
//!
//! # Example
//!
//! ```no_run
//! use tvbox_scout::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("scout.toml")).unwrap();
//! println!("Searching at most {} pages per query", config.github.max_pages);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, DiscoveryConfig, FetchConfig, GithubConfig, ProbeConfig, SchedulerConfig,
    StorageConfig, DEFAULT_BASE_QUERIES, DEFAULT_EXCLUDED_HOSTS, DEFAULT_PROXY_PREFIXES,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
