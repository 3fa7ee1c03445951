use crate::client::DEFAULT_TIMEOUT;
use crate::page::DEFAULT_MAX_CONCURRENT_FETCHES;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::{Validate, ValidationError};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ProbeConfig {
    /// Base address of the site under test
    #[serde(default)]
    #[validate(url)]
    pub site: String,

    /// First segment of every reported metric namespace
    #[serde(default = "default_vendor")]
    #[validate(length(min = 1), custom = "validate_namespace_segment")]
    pub vendor: String,

    #[serde(default = "default_timeout")]
    #[validate(range(min = 1, max = 300))]
    pub timeout_secs: u64,

    /// Simultaneous resource downloads per page, `0` for no cap
    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,

    /// Simultaneously timed pages, `0` for no cap
    #[serde(default)]
    pub max_concurrent_pages: usize,

    /// Upper bound on a whole collection run
    #[serde(default)]
    #[validate(range(min = 1))]
    pub deadline_secs: Option<u64>,

    /// Join relative resource addresses with the page address before fetching
    #[serde(default)]
    pub resolve_relative_links: bool,

    #[serde(default = "default_user_agent")]
    #[validate(length(min = 1))]
    pub user_agent: String,

    #[serde(default)]
    pub output: Option<OutputConfig>,

    /// Optional path to a parent configuration file to inherit from
    #[serde(default)]
    pub extends: Option<String>,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            site: String::new(),
            vendor: default_vendor(),
            timeout_secs: default_timeout(),
            max_concurrent_fetches: default_max_concurrent_fetches(),
            max_concurrent_pages: 0,
            deadline_secs: None,
            resolve_relative_links: false,
            user_agent: default_user_agent(),
            output: None,
            extends: None,
        }
    }
}

impl ProbeConfig {
    pub fn for_site(site: impl Into<String>) -> Self {
        Self {
            site: site.into(),
            ..Self::default()
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OutputConfig {
    Console,
    Json {
        path: String,
    },
    Csv {
        path: String,
    },
}

fn validate_namespace_segment(value: &str) -> Result<(), ValidationError> {
    if value.contains('/') || value.chars().any(char::is_whitespace) {
        return Err(ValidationError::new("namespace_segment"));
    }
    Ok(())
}

pub(crate) fn default_vendor() -> String {
    "siteprobe".to_string()
}

pub(crate) fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

pub(crate) fn default_max_concurrent_fetches() -> usize {
    DEFAULT_MAX_CONCURRENT_FETCHES
}

pub(crate) fn default_user_agent() -> String {
    format!("siteprobe/{}", env!("CARGO_PKG_VERSION"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_fields() {
        let config: ProbeConfig = serde_json::from_str(r#"{"site": "https://example.com"}"#).unwrap();
        assert_eq!(config.vendor, "siteprobe");
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert_eq!(config.max_concurrent_fetches, 32);
        assert_eq!(config.max_concurrent_pages, 0);
        assert!(config.deadline().is_none());
        assert!(!config.resolve_relative_links);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn site_is_required() {
        assert!(ProbeConfig::default().validate().is_err());
        assert!(ProbeConfig::for_site("not a url").validate().is_err());
    }

    #[test]
    fn vendor_must_be_a_single_segment() {
        let mut config = ProbeConfig::for_site("https://example.com");
        config.vendor = "acme/corp".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn timeout_is_bounded() {
        let mut config = ProbeConfig::for_site("https://example.com");
        config.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn output_is_tagged_by_type() {
        let output: OutputConfig = serde_json::from_str(r#"{"type": "csv", "path": "out.csv"}"#).unwrap();
        assert_eq!(output, OutputConfig::Csv { path: "out.csv".to_string() });
    }
}
