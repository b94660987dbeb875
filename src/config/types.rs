use crate::scrape::{BatchPolicy, DEFAULT_BATCH_BUDGET, DEFAULT_MAX_IN_FLIGHT};
use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for linkloom
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scrape: ScrapeConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Scrape behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ScrapeConfig {
    /// Wall-clock budget for one group's batch, in seconds
    #[serde(rename = "batch-budget-secs", default = "default_batch_budget_secs")]
    pub batch_budget_secs: u64,

    /// Maximum concurrent fetches within one batch
    #[serde(rename = "max-concurrent-fetches", default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,

    /// Per-request timeout, in seconds
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Attempts for retryable failures (5xx, timeouts)
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay between retry attempts, in milliseconds
    #[serde(rename = "retry-delay-ms", default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the scraper
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the scraper
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the scraper
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for scraper-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file (content cache + job records)
    #[serde(rename = "database-path", default = "default_database_path")]
    pub database_path: String,
}

impl ScrapeConfig {
    /// Derives the batch policy the orchestrator consumes
    pub fn batch_policy(&self) -> BatchPolicy {
        BatchPolicy {
            budget: Duration::from_secs(self.batch_budget_secs),
            max_in_flight: self.max_concurrent_fetches,
        }
    }
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            batch_budget_secs: default_batch_budget_secs(),
            max_concurrent_fetches: default_max_concurrent_fetches(),
            request_timeout_secs: default_request_timeout_secs(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { database_path: default_database_path() }
    }
}

fn default_batch_budget_secs() -> u64 {
    DEFAULT_BATCH_BUDGET.as_secs()
}

fn default_max_concurrent_fetches() -> usize {
    DEFAULT_MAX_IN_FLIGHT
}

fn default_request_timeout_secs() -> u64 {
    crate::scrape::DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_max_retries() -> u32 {
    crate::scrape::DEFAULT_MAX_RETRIES
}

fn default_retry_delay_ms() -> u64 {
    5000
}

fn default_database_path() -> String {
    "./linkloom.db".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scrape_defaults() {
        let config = ScrapeConfig::default();
        assert_eq!(config.batch_budget_secs, 45);
        assert_eq!(config.max_concurrent_fetches, 8);
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.max_retries, 3);
    }

    #[test]
    fn test_batch_policy_derivation() {
        let config = ScrapeConfig { batch_budget_secs: 10, max_concurrent_fetches: 3, ..Default::default() };
        let policy = config.batch_policy();
        assert_eq!(policy.budget, Duration::from_secs(10));
        assert_eq!(policy.max_in_flight, 3);
    }
}
