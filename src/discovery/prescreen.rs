use crate::config::DiscoveryConfig;
use crate::{ConfigError, ConfigResult};
use regex::{Regex, RegexBuilder};

/// Outcome of screening a raw URL before it is probed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screened {
    Candidate,
    WrongSuffix,
    /// Matched the invalid-URL pattern at this index
    Blocked(usize),
}

/// Cheap local checks that decide whether a raw URL is worth probing
#[derive(Debug, Clone)]
pub struct Prescreen {
    suffix: String,
    invalid: Vec<Regex>,
}

impl Prescreen {
    /// Compiles the configured patterns; matching is case-insensitive
    pub fn new(config: &DiscoveryConfig) -> ConfigResult<Self> {
        let invalid = config
            .invalid_url_patterns
            .iter()
            .map(|pattern| {
                RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| {
                        ConfigError::InvalidPattern(format!(
                            "Invalid URL pattern '{}': {}",
                            pattern, e
                        ))
                    })
            })
            .collect::<ConfigResult<Vec<_>>>()?;

        Ok(Self {
            suffix: config.required_suffix.to_ascii_lowercase(),
            invalid,
        })
    }

    pub fn check(&self, url: &str) -> Screened {
        if !url.to_ascii_lowercase().ends_with(&self.suffix) {
            return Screened::WrongSuffix;
        }

        match self.invalid.iter().position(|re| re.is_match(url)) {
            Some(index) => Screened::Blocked(index),
            None => Screened::Candidate,
        }
    }
}
