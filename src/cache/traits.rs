//! Content cache trait and error types

use crate::cache::CacheEntry;
use async_trait::async_trait;
use thiserror::Error;
use url::Url;

/// Errors that can occur during cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt cache entry for {url}: {message}")]
    Corrupt { url: String, message: String },
}

/// Result type for cache operations
pub type CacheResult<T> = Result<T, CacheError>;

/// Trait for content cache backends
///
/// The cache maps a normalized link to previously fetched readable content.
/// It is the only resource shared across concurrent group scrapes, so
/// implementations must be safe under concurrent `store` calls: a store is
/// an atomic per-key replace, last write wins, and a reader never observes
/// a partially applied entry.
#[async_trait]
pub trait ContentCache: Send + Sync {
    /// Looks up the cached entry for a link
    ///
    /// Purely a read against persisted state; never fetches. Keys by the
    /// normalized form of `link`, so fragment/tracking-param variants of the
    /// same page share an entry. Placeholder entries (empty title and
    /// content) are reported as absent.
    async fn lookup(&self, link: &Url) -> CacheResult<Option<CacheEntry>>;

    /// Stores (upserts) the entry for a link
    ///
    /// Idempotent; the latest write for a given link wins.
    async fn store(&self, link: &Url, entry: &CacheEntry) -> CacheResult<()>;
}
