//! HTTP fetching for linkloom
//!
//! This module provides:
//! - The `PageFetcher` trait consumed by the session and the batch
//!   orchestrator (seed link extraction + single-page content retrieval)
//! - An HTTP client builder with a proper user-agent string
//! - `HttpFetcher`, the reqwest-backed implementation with retry logic
//!   and error classification

use crate::config::{Config, UserAgentConfig};
use crate::scrape::parser::{self, PageContent};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Default per-request timeout in seconds
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default number of attempts for retryable failures
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Errors from fetch operations
///
/// These never escape the batch orchestrator; it records them as per-link
/// `Failed`/`TimedOut` outcomes. Only the session's seed extraction turns
/// one into a fatal error.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP {status} for {url}")]
    Http { url: String, status: u16 },

    #[error("Network error for {url}: {reason}")]
    Network { url: String, reason: String },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Expected HTML for {url}, got {content_type}")]
    ContentMismatch { url: String, content_type: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

/// Result type for fetch operations
pub type FetchResult<T> = Result<T, FetchError>;

/// Result of one-hop link extraction from a seed page
#[derive(Debug, Clone)]
pub struct LinkExtraction {
    /// Final URL after redirects
    pub final_url: String,

    /// HTTP status code of the seed response
    pub status_code: u16,

    /// Content-Type header value
    pub content_type: String,

    /// Absolute same-host URLs found on the page
    pub links: Vec<String>,
}

/// Trait for the page-fetching collaborator
///
/// The session calls `extract_links` once per run; the batch orchestrator
/// calls `fetch_content` once per uncached link.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Extracts the hyperlinks from a seed page
    async fn extract_links(&self, url: &str) -> FetchResult<LinkExtraction>;

    /// Retrieves readable content for a single page
    async fn fetch_content(&self, url: &Url) -> FetchResult<PageContent>;
}

/// Builds an HTTP client with proper configuration
///
/// The user agent follows the `name/version (+contact-url; contact-email)`
/// convention so site operators can identify and reach us.
pub fn build_http_client(
    config: &UserAgentConfig,
    request_timeout: Duration,
) -> Result<Client, reqwest::Error> {
    let user_agent = format!(
        "{}/{} (+{}; {})",
        config.crawler_name, config.crawler_version, config.contact_url, config.contact_email
    );

    Client::builder()
        .user_agent(user_agent)
        .timeout(request_timeout)
        .connect_timeout(Duration::from_secs(10))
        .redirect(reqwest::redirect::Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Reqwest-backed page fetcher
///
/// # Retry Logic
///
/// | Condition          | Action                            |
/// |--------------------|-----------------------------------|
/// | HTTP 2xx           | Success                           |
/// | HTTP 5xx           | Retry up to `max_retries` times   |
/// | Request timeout    | Retry up to `max_retries` times   |
/// | HTTP 404, 429, 4xx | Immediate failure                 |
/// | Connection refused | Immediate failure                 |
pub struct HttpFetcher {
    client: Client,
    max_retries: u32,
    retry_delay: Duration,
}

impl HttpFetcher {
    /// Creates a fetcher around an existing client with default retry policy
    pub fn new(client: Client) -> Self {
        Self {
            client,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: Duration::from_secs(5),
        }
    }

    /// Builds a fetcher from the crate configuration
    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        let client = build_http_client(
            &config.user_agent,
            Duration::from_secs(config.scrape.request_timeout_secs),
        )?;

        Ok(Self {
            client,
            max_retries: config.scrape.max_retries,
            retry_delay: Duration::from_millis(config.scrape.retry_delay_ms),
        })
    }

    /// Overrides the retry policy
    pub fn with_retries(mut self, max_retries: u32, retry_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_delay = retry_delay;
        self
    }

    /// Sends a GET request, retrying transient failures
    async fn get_with_retry(&self, url: &str) -> FetchResult<Response> {
        let mut attempt = 0;

        loop {
            attempt += 1;

            match self.client.get(url).send().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        return Ok(response);
                    }

                    if status.is_server_error() && attempt < self.max_retries {
                        tracing::debug!(
                            "HTTP {} from {}, retrying ({}/{})",
                            status.as_u16(),
                            url,
                            attempt,
                            self.max_retries
                        );
                        tokio::time::sleep(self.retry_delay).await;
                        continue;
                    }

                    return Err(FetchError::Http {
                        url: url.to_string(),
                        status: status.as_u16(),
                    });
                }
                Err(e) if e.is_timeout() => {
                    if attempt < self.max_retries {
                        tracing::debug!(
                            "Timeout fetching {}, retrying ({}/{})",
                            url,
                            attempt,
                            self.max_retries
                        );
                        tokio::time::sleep(self.retry_delay).await;
                        continue;
                    }
                    return Err(FetchError::Timeout { url: url.to_string() });
                }
                Err(e) if e.is_connect() => {
                    return Err(FetchError::Network {
                        url: url.to_string(),
                        reason: "connection failed".to_string(),
                    });
                }
                Err(e) => {
                    return Err(FetchError::Network {
                        url: url.to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }
    }

    fn require_html(url: &str, response: &Response) -> FetchResult<String> {
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        if !content_type.contains("text/html") {
            return Err(FetchError::ContentMismatch {
                url: url.to_string(),
                content_type,
            });
        }

        Ok(content_type)
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn extract_links(&self, url: &str) -> FetchResult<LinkExtraction> {
        let response = self.get_with_retry(url).await?;

        let status_code = response.status().as_u16();
        let final_url = response.url().clone();
        let content_type = Self::require_html(url, &response)?;

        let body = response.text().await.map_err(|e| FetchError::Network {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let links = parser::extract_links(&body, &final_url);
        tracing::debug!("Extracted {} links from {}", links.len(), final_url);

        Ok(LinkExtraction {
            final_url: final_url.into(),
            status_code,
            content_type,
            links,
        })
    }

    async fn fetch_content(&self, url: &Url) -> FetchResult<PageContent> {
        let response = self.get_with_retry(url.as_str()).await?;
        Self::require_html(url.as_str(), &response)?;

        let body = response.text().await.map_err(|e| FetchError::Network {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        Ok(parser::extract_readable(&body, url))
    }
}

// Keep the 404/429 mapping visible for callers that branch on status
impl FetchError {
    /// Returns the HTTP status for status-classified errors
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Http { status, .. } => StatusCode::from_u16(*status).ok(),
            _ => None,
        }
    }
}
