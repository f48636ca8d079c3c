//! Target URL whitelist.
//!
//! # Design Decisions
//! - Patterns are regular expressions over the full normalized target URL
//! - An empty whitelist allows every URL
//! - First match wins; order only affects how soon a match is found

use regex::Regex;

use crate::config::WhitelistConfig;

/// Immutable set of URL patterns consulted for every request.
#[derive(Debug, Clone, Default)]
pub struct Whitelist {
    patterns: Vec<Regex>,
}

impl Whitelist {
    pub fn new(patterns: Vec<Regex>) -> Self {
        Self { patterns }
    }

    /// Compile the configured patterns followed by one pattern per hostname.
    pub fn from_config(config: &WhitelistConfig) -> Result<Self, regex::Error> {
        let mut patterns = config
            .patterns
            .iter()
            .map(|p| Regex::new(p))
            .collect::<Result<Vec<_>, _>>()?;
        for hostname in &config.hostnames {
            patterns.push(Self::hostname_pattern(hostname)?);
        }
        Ok(Self { patterns })
    }

    /// Pattern matching every http(s) URL on `hostname` or any of its subdomains.
    pub fn hostname_pattern(hostname: &str) -> Result<Regex, regex::Error> {
        Regex::new(&format!(
            r"(?i)^https?://([a-z0-9-]+\.)*{}",
            regex::escape(hostname)
        ))
    }

    pub fn allows(&self, url: &str) -> bool {
        self.patterns.is_empty() || self.patterns.iter().any(|p| p.is_match(url))
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }
}
