//! Linkloom: a cached batch-scrape orchestrator
//!
//! This crate extracts every hyperlink from a seed page, partitions the links
//! into path-based groups, and retrieves readable content for each link
//! through a persistent content cache, fetching misses concurrently under a
//! per-group wall-clock budget.

pub mod cache;
pub mod config;
pub mod group;
pub mod jobs;
pub mod scrape;
pub mod session;
pub mod url;

use thiserror::Error;

/// Main error type for linkloom operations
#[derive(Debug, Error)]
pub enum LoomError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("Cache error: {0}")]
    Cache(#[from] cache::CacheError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] scrape::FetchError),

    #[error("Seed extraction failed for {url}: {reason}")]
    SeedExtraction { url: String, reason: String },

    #[error("Job store error: {0}")]
    Jobs(#[from] jobs::JobError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

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
}

/// Result type alias for linkloom operations
pub type Result<T> = std::result::Result<T, LoomError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use cache::{CacheEntry, ContentCache, ContentKind, MemoryCache, SqliteCache};
pub use config::Config;
pub use group::{group_links, Grouping, LinkGroup};
pub use scrape::{BatchPolicy, GroupPhase, GroupResult, PageFetcher, ScrapeOutcome};
pub use session::SessionStream;
pub use url::{normalize_url, parse_link};
