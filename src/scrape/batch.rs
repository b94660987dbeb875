//! Batch scrape orchestrator
//!
//! This module scrapes one group of links under a single wall-clock budget:
//! - resolve every link against the content cache first, in input order
//! - fetch the misses concurrently, bounded by a per-batch semaphore
//! - time-box each fetch against the remaining budget; the batch never
//!   blocks past the deadline
//! - store successful fetches back into the cache before reporting them
//! - merge cached and fresh results into one ordered result set

use crate::cache::{CacheEntry, ContentCache};
use crate::group::LinkGroup;
use crate::scrape::fetcher::PageFetcher;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};
use tokio::time::{timeout_at, Instant};
use url::Url;

/// Default wall-clock budget for one batch
pub const DEFAULT_BATCH_BUDGET: Duration = Duration::from_secs(45);

/// Default maximum in-flight fetches per batch
pub const DEFAULT_MAX_IN_FLIGHT: usize = 8;

/// Fetch policy for one batch
///
/// The budget covers the *entire* batch, not individual links; the
/// in-flight bound is local to one invocation, so a heavy group cannot
/// starve another group's fetches.
#[derive(Debug, Clone)]
pub struct BatchPolicy {
    /// Wall-clock deadline for the whole batch
    pub budget: Duration,

    /// Maximum concurrent fetches
    pub max_in_flight: usize,
}

impl Default for BatchPolicy {
    fn default() -> Self {
        Self {
            budget: DEFAULT_BATCH_BUDGET,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
        }
    }
}

/// The outcome of scraping one link within a batch
///
/// Produced exactly once per link per invocation; immutable once produced.
#[derive(Debug, Clone)]
pub enum ScrapeOutcome {
    /// Content was already in the cache
    CachedHit(CacheEntry),

    /// Content was fetched during this batch (and stored into the cache)
    FreshHit(CacheEntry),

    /// The fetch failed; the reason is recorded, never raised
    Failed(String),

    /// The batch budget elapsed before the fetch completed
    TimedOut,
}

impl ScrapeOutcome {
    /// Returns the cache entry for hit outcomes
    pub fn entry(&self) -> Option<&CacheEntry> {
        match self {
            Self::CachedHit(entry) | Self::FreshHit(entry) => Some(entry),
            _ => None,
        }
    }

    /// Returns true for either kind of hit
    pub fn is_hit(&self) -> bool {
        self.entry().is_some()
    }
}

/// Progress state of a group scrape
///
/// `Pending -> Partial -> Complete`, strictly forward; a group never leaves
/// `Complete` and never returns to `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupPhase {
    /// Created; no outcomes resolved yet
    Pending,

    /// Some outcomes resolved, fetches still outstanding
    Partial,

    /// All outcomes resolved or the deadline fired
    Complete,
}

impl GroupPhase {
    /// Returns true if fetches for the group may still be outstanding
    pub fn is_in_progress(&self) -> bool {
        !matches!(self, Self::Complete)
    }

    /// Returns true if the state machine permits moving to `next`
    pub fn can_transition(self, next: GroupPhase) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Partial)
                | (Self::Pending, Self::Complete)
                | (Self::Partial, Self::Complete)
        )
    }

    /// Moves forward to `next` if the machine permits it
    fn advance(&mut self, next: GroupPhase) {
        if self.can_transition(next) {
            *self = next;
        }
    }
}

/// A scraped group: the group's links plus one ordered outcome per link
#[derive(Debug, Clone)]
pub struct GroupResult {
    /// Group name, as assigned by the path grouper
    pub name: String,

    /// Member links, in the group's input order
    pub links: Vec<Url>,

    /// One outcome per link, index-aligned with `links`
    pub outcomes: Vec<ScrapeOutcome>,

    /// Progress state; `Complete` for every result the session yields
    pub phase: GroupPhase,
}

impl GroupResult {
    /// Number of cache hits
    pub fn cached_hits(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, ScrapeOutcome::CachedHit(_)))
            .count()
    }

    /// Number of fresh fetches
    pub fn fresh_hits(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, ScrapeOutcome::FreshHit(_)))
            .count()
    }

    /// Number of failed fetches
    pub fn failures(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, ScrapeOutcome::Failed(_)))
            .count()
    }

    /// Number of timed-out fetches
    pub fn timeouts(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, ScrapeOutcome::TimedOut))
            .count()
    }
}

/// Scrapes one group of links under a single budget
///
/// Cache lookups for *all* links complete before any fetch starts, so the
/// merged result preserves each link's original position. Misses are
/// fetched concurrently (bounded by `policy.max_in_flight`), each fetch
/// time-boxed against the batch deadline. Partial failure is non-fatal: a
/// `GroupResult` is always produced, whatever mix of outcomes was achieved.
pub async fn scrape_group(
    group: &LinkGroup,
    cache: Arc<dyn ContentCache>,
    fetcher: Arc<dyn PageFetcher>,
    policy: &BatchPolicy,
) -> GroupResult {
    let deadline = Instant::now() + policy.budget;
    let mut phase = GroupPhase::Pending;
    let mut slots: Vec<Option<ScrapeOutcome>> = vec![None; group.links.len()];
    let mut misses: Vec<usize> = Vec::new();

    // Partition pass: every link consults the cache before fetching starts
    for (index, link) in group.links.iter().enumerate() {
        match cache.lookup(link).await {
            Ok(Some(entry)) => {
                slots[index] = Some(ScrapeOutcome::CachedHit(entry));
                phase.advance(GroupPhase::Partial);
            }
            Ok(None) => misses.push(index),
            Err(e) => {
                tracing::warn!("Cache lookup failed for {}: {}; treating as miss", link, e);
                misses.push(index);
            }
        }
    }

    tracing::debug!(
        "Group {}: {} cached, {} to fetch",
        group.name,
        group.links.len() - misses.len(),
        misses.len()
    );

    if !misses.is_empty() {
        let semaphore = Arc::new(Semaphore::new(policy.max_in_flight));
        let (tx, mut rx) = mpsc::channel(misses.len());

        for index in misses.drain(..) {
            let link = group.links[index].clone();
            let cache = Arc::clone(&cache);
            let fetcher = Arc::clone(&fetcher);
            let semaphore = Arc::clone(&semaphore);
            let tx = tx.clone();

            tokio::spawn(async move {
                let outcome = fetch_one(&link, cache, fetcher, semaphore, deadline).await;
                // The receiver outlives every sender; a send only fails if
                // the whole batch was dropped, in which case nothing is
                // waiting for the outcome anyway.
                let _ = tx.send((index, outcome)).await;
            });
        }
        drop(tx);

        while let Some((index, outcome)) = rx.recv().await {
            slots[index] = Some(outcome);
            phase.advance(GroupPhase::Partial);
        }
    }

    phase.advance(GroupPhase::Complete);

    let outcomes = slots
        .into_iter()
        // Every slot was filled: cached in the partition pass, the rest by
        // exactly one message per spawned fetch
        .map(|slot| slot.unwrap_or(ScrapeOutcome::TimedOut))
        .collect();

    GroupResult {
        name: group.name.clone(),
        links: group.links.clone(),
        outcomes,
        phase,
    }
}

/// Fetches one link under the batch deadline and stores the result
async fn fetch_one(
    link: &Url,
    cache: Arc<dyn ContentCache>,
    fetcher: Arc<dyn PageFetcher>,
    semaphore: Arc<Semaphore>,
    deadline: Instant,
) -> ScrapeOutcome {
    // Time spent waiting for a slot counts against the budget too
    let permit = match timeout_at(deadline, semaphore.acquire_owned()).await {
        Ok(Ok(permit)) => permit,
        Ok(Err(_)) | Err(_) => return ScrapeOutcome::TimedOut,
    };

    let result = timeout_at(deadline, fetcher.fetch_content(link)).await;
    drop(permit);

    match result {
        Err(_) => ScrapeOutcome::TimedOut,
        Ok(Err(e)) => ScrapeOutcome::Failed(e.to_string()),
        Ok(Ok(content)) => {
            let entry = content.into_cache_entry();
            // Store before reporting so concurrent groups sharing this link
            // observe the fresh entry
            if let Err(e) = cache.store(link, &entry).await {
                tracing::warn!("Failed to cache {}: {}", link, e);
            }
            ScrapeOutcome::FreshHit(entry)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{ContentKind, MemoryCache};
    use crate::scrape::fetcher::{FetchError, FetchResult, LinkExtraction};
    use crate::scrape::parser::PageContent;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scripted fetcher: responds per-path with content, an error, or a hang
    struct ScriptedFetcher {
        fetches: AtomicUsize,
        active: AtomicUsize,
        peak: AtomicUsize,
        delay: Duration,
        fail_paths: Vec<String>,
        hang_paths: Vec<String>,
    }

    /// Decrements the active-fetch count even when the fetch is cancelled
    struct InFlightGuard<'a>(&'a AtomicUsize);

    impl Drop for InFlightGuard<'_> {
        fn drop(&mut self) {
            self.0.fetch_sub(1, Ordering::SeqCst);
        }
    }

    impl ScriptedFetcher {
        fn new() -> Self {
            Self {
                fetches: AtomicUsize::new(0),
                active: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
                delay: Duration::ZERO,
                fail_paths: Vec::new(),
                hang_paths: Vec::new(),
            }
        }

        fn failing_on(mut self, path: &str) -> Self {
            self.fail_paths.push(path.to_string());
            self
        }

        fn hanging_on(mut self, path: &str) -> Self {
            self.hang_paths.push(path.to_string());
            self
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        fn fetch_count(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }

        fn peak_in_flight(&self) -> usize {
            self.peak.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PageFetcher for ScriptedFetcher {
        async fn extract_links(&self, url: &str) -> FetchResult<LinkExtraction> {
            Err(FetchError::InvalidUrl(url.to_string()))
        }

        async fn fetch_content(&self, url: &Url) -> FetchResult<PageContent> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            let current = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(current, Ordering::SeqCst);
            let _guard = InFlightGuard(&self.active);

            if self.hang_paths.iter().any(|p| url.path() == p) {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.fail_paths.iter().any(|p| url.path() == p) {
                return Err(FetchError::Http { url: url.to_string(), status: 500 });
            }

            Ok(PageContent {
                title: format!("Title of {}", url.path()),
                preview: "preview".to_string(),
                content: "body".to_string(),
                kind: ContentKind::classify(url),
            })
        }
    }

    fn group(paths: &[&str]) -> LinkGroup {
        LinkGroup {
            name: "Blog".to_string(),
            links: paths
                .iter()
                .map(|p| Url::parse(&format!("https://ex.com{}", p)).unwrap())
                .collect(),
        }
    }

    fn policy(budget_ms: u64) -> BatchPolicy {
        BatchPolicy {
            budget: Duration::from_millis(budget_ms),
            max_in_flight: 4,
        }
    }

    #[tokio::test]
    async fn test_all_fresh_fetches() {
        let cache = Arc::new(MemoryCache::new());
        let fetcher = Arc::new(ScriptedFetcher::new());

        let result = scrape_group(
            &group(&["/blog/a", "/blog/b"]),
            cache.clone(),
            fetcher.clone(),
            &policy(5_000),
        )
        .await;

        assert_eq!(result.phase, GroupPhase::Complete);
        assert_eq!(result.fresh_hits(), 2);
        assert_eq!(fetcher.fetch_count(), 2);
        // Fetched content was stored
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test]
    async fn test_merge_preserves_input_order() {
        let cache = Arc::new(MemoryCache::new());
        // Warm the cache for the middle link only
        let warm = Url::parse("https://ex.com/blog/b").unwrap();
        cache
            .store(
                &warm,
                &CacheEntry {
                    title: "B".to_string(),
                    preview: String::new(),
                    content: "body".to_string(),
                    kind: ContentKind::Blog,
                    scraped_at: Utc::now(),
                },
            )
            .await
            .unwrap();

        let fetcher = Arc::new(ScriptedFetcher::new().failing_on("/blog/c"));
        let g = group(&["/blog/a", "/blog/b", "/blog/c"]);
        let result = scrape_group(&g, cache, fetcher, &policy(5_000)).await;

        assert_eq!(result.links, g.links);
        assert!(matches!(result.outcomes[0], ScrapeOutcome::FreshHit(_)));
        assert!(matches!(result.outcomes[1], ScrapeOutcome::CachedHit(_)));
        assert!(matches!(result.outcomes[2], ScrapeOutcome::Failed(_)));
    }

    #[tokio::test]
    async fn test_failures_are_non_fatal() {
        let cache = Arc::new(MemoryCache::new());
        let fetcher = Arc::new(
            ScriptedFetcher::new()
                .failing_on("/blog/a")
                .failing_on("/blog/b"),
        );

        let result =
            scrape_group(&group(&["/blog/a", "/blog/b"]), cache, fetcher, &policy(5_000)).await;

        assert_eq!(result.phase, GroupPhase::Complete);
        assert_eq!(result.failures(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_budget_expiry_times_out_outstanding_fetches() {
        let cache = Arc::new(MemoryCache::new());
        let fetcher = Arc::new(
            ScriptedFetcher::new()
                .hanging_on("/blog/a")
                .hanging_on("/blog/b"),
        );

        let started = Instant::now();
        let result =
            scrape_group(&group(&["/blog/a", "/blog/b"]), cache, fetcher, &policy(500)).await;

        assert_eq!(result.timeouts(), 2);
        assert_eq!(result.phase, GroupPhase::Complete);
        // Auto-advanced virtual time lands on the deadline, not the hang
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_permit_wait_counts_against_budget() {
        let cache = Arc::new(MemoryCache::new());
        let fetcher = Arc::new(ScriptedFetcher::new().with_delay(Duration::from_secs(10)));

        // 6 links, 4 in flight: every link resolves TimedOut, whether it
        // spent the budget fetching or queued behind a permit
        let result = scrape_group(
            &group(&["/a", "/b", "/c", "/d", "/e", "/f"]),
            cache,
            fetcher.clone(),
            &policy(1_000),
        )
        .await;

        assert_eq!(result.timeouts(), 6);
        assert!(fetcher.peak_in_flight() <= 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_flight_fetches_stay_bounded() {
        let cache = Arc::new(MemoryCache::new());
        let fetcher = Arc::new(ScriptedFetcher::new().with_delay(Duration::from_millis(50)));

        let result = scrape_group(
            &group(&["/a", "/b", "/c", "/d", "/e", "/f", "/g", "/h"]),
            cache,
            fetcher.clone(),
            &policy(5_000),
        )
        .await;

        assert_eq!(result.fresh_hits(), 8);
        assert_eq!(fetcher.peak_in_flight(), 4);
    }

    #[tokio::test]
    async fn test_warm_cache_is_idempotent() {
        let cache = Arc::new(MemoryCache::new());
        let fetcher = Arc::new(ScriptedFetcher::new());
        let g = group(&["/blog/a", "/blog/b", "/blog/c"]);

        let first = scrape_group(&g, cache.clone(), fetcher.clone(), &policy(5_000)).await;
        assert_eq!(first.fresh_hits(), 3);

        let second = scrape_group(&g, cache, fetcher.clone(), &policy(5_000)).await;
        assert_eq!(second.cached_hits(), 3);
        assert_eq!(second.fresh_hits(), 0);
        // No new fetches on the second pass
        assert_eq!(fetcher.fetch_count(), 3);
    }

    #[tokio::test]
    async fn test_empty_group() {
        let cache = Arc::new(MemoryCache::new());
        let fetcher = Arc::new(ScriptedFetcher::new());

        let result = scrape_group(&group(&[]), cache, fetcher, &policy(1_000)).await;
        assert_eq!(result.phase, GroupPhase::Complete);
        assert!(result.outcomes.is_empty());
    }

    #[test]
    fn test_phase_machine() {
        use GroupPhase::*;

        assert!(Pending.can_transition(Partial));
        assert!(Pending.can_transition(Complete));
        assert!(Partial.can_transition(Complete));

        assert!(!Partial.can_transition(Pending));
        assert!(!Complete.can_transition(Pending));
        assert!(!Complete.can_transition(Partial));
        assert!(!Pending.can_transition(Pending));

        assert!(Pending.is_in_progress());
        assert!(Partial.is_in_progress());
        assert!(!Complete.is_in_progress());
    }
}
