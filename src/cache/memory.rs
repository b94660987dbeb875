//! In-memory content cache implementation
//!
//! Useful for tests and dry runs. Data is lost when the process exits.

use crate::cache::traits::{CacheResult, ContentCache};
use crate::cache::CacheEntry;
use crate::url::cache_key;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use url::Url;

/// In-memory content cache backed by a `RwLock<HashMap>`
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl MemoryCache {
    /// Creates an empty in-memory cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries (placeholders included)
    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    /// Returns true if the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.read().unwrap().is_empty()
    }

    /// Removes all entries
    pub fn clear(&self) {
        self.entries.write().unwrap().clear();
    }
}

#[async_trait]
impl ContentCache for MemoryCache {
    async fn lookup(&self, link: &Url) -> CacheResult<Option<CacheEntry>> {
        let entries = self.entries.read().unwrap();
        Ok(entries
            .get(&cache_key(link))
            .filter(|entry| !entry.is_placeholder())
            .cloned())
    }

    async fn store(&self, link: &Url, entry: &CacheEntry) -> CacheResult<()> {
        self.entries
            .write()
            .unwrap()
            .insert(cache_key(link), entry.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ContentKind;
    use chrono::Utc;

    fn entry(title: &str) -> CacheEntry {
        CacheEntry {
            title: title.to_string(),
            preview: String::new(),
            content: "body".to_string(),
            kind: ContentKind::Other,
            scraped_at: Utc::now(),
        }
    }

    fn link(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_store_then_lookup() {
        let cache = MemoryCache::new();
        let url = link("https://ex.com/a");

        cache.store(&url, &entry("A")).await.unwrap();
        assert_eq!(cache.lookup(&url).await.unwrap().unwrap().title, "A");
    }

    #[tokio::test]
    async fn test_normalized_key_sharing() {
        let cache = MemoryCache::new();

        cache.store(&link("https://ex.com/a/"), &entry("A")).await.unwrap();
        assert!(cache.lookup(&link("https://ex.com/a#x")).await.unwrap().is_some());
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_placeholder_reported_absent() {
        let cache = MemoryCache::new();
        let url = link("https://ex.com/empty");

        let placeholder = CacheEntry {
            title: " ".to_string(),
            preview: "p".to_string(),
            content: String::new(),
            kind: ContentKind::Other,
            scraped_at: Utc::now(),
        };
        cache.store(&url, &placeholder).await.unwrap();

        assert!(cache.lookup(&url).await.unwrap().is_none());
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_clear() {
        let cache = MemoryCache::new();
        cache.store(&link("https://ex.com/a"), &entry("A")).await.unwrap();
        cache.clear();
        assert!(cache.is_empty());
    }
}
