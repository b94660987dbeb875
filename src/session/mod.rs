//! Extraction session for linkloom
//!
//! A session is the top-level sequence: extract links from the seed page,
//! group them, then scrape every group concurrently, streaming each
//! GroupResult to the consumer as soon as its batch resolves. The consumer
//! never waits for the whole session to see the first group.

use crate::cache::ContentCache;
use crate::group::{group_links, Grouping};
use crate::scrape::{scrape_group, BatchPolicy, GroupResult, PageFetcher};
use crate::LoomError;
use std::sync::Arc;
use tokio::sync::mpsc;

/// A running session's stream of group results
///
/// Results arrive in completion order, not grouping order. The stream is
/// finite (one result per realized group) and not restartable.
pub struct SessionStream {
    /// Final seed URL after redirects
    pub seed_url: String,

    /// Realized group names, in grouping order
    pub group_names: Vec<String>,

    /// Seed-page links that failed URL parsing; excluded from every group
    pub malformed: Vec<String>,

    rx: mpsc::Receiver<GroupResult>,
}

impl SessionStream {
    /// Yields the next completed group, or None once every group resolved
    pub async fn next(&mut self) -> Option<GroupResult> {
        self.rx.recv().await
    }

    /// Number of groups this session will yield
    pub fn group_count(&self) -> usize {
        self.group_names.len()
    }
}

/// Runs one extraction session
///
/// Calls the link-extraction collaborator once on `seed_url`; if that call
/// fails there is nothing to group or scrape, so the session surfaces
/// `LoomError::SeedExtraction` and performs no cache writes. On success the
/// links are grouped and every group is handed to its own batch scrape,
/// spawned concurrently; each group gets its own budget and fetch pool, so
/// one group's deadline or fan-out cannot stall another's.
pub async fn run(
    seed_url: &str,
    fetcher: Arc<dyn PageFetcher>,
    cache: Arc<dyn ContentCache>,
    policy: BatchPolicy,
) -> Result<SessionStream, LoomError> {
    let extraction = fetcher
        .extract_links(seed_url)
        .await
        .map_err(|e| LoomError::SeedExtraction {
            url: seed_url.to_string(),
            reason: e.to_string(),
        })?;

    tracing::info!(
        "Seed {} returned {} links (status {})",
        extraction.final_url,
        extraction.links.len(),
        extraction.status_code
    );

    let Grouping { groups, malformed } = group_links(&extraction.links);
    if !malformed.is_empty() {
        tracing::warn!("{} links failed URL parsing", malformed.len());
    }

    let group_names: Vec<String> = groups.iter().map(|g| g.name.clone()).collect();

    let (tx, rx) = mpsc::channel(groups.len().max(1));

    for group in groups {
        let fetcher = Arc::clone(&fetcher);
        let cache = Arc::clone(&cache);
        let policy = policy.clone();
        let tx = tx.clone();

        tokio::spawn(async move {
            let result = scrape_group(&group, cache, fetcher, &policy).await;
            tracing::debug!(
                "Group {} complete: {} cached, {} fresh, {} failed, {} timed out",
                result.name,
                result.cached_hits(),
                result.fresh_hits(),
                result.failures(),
                result.timeouts()
            );
            // Send only fails if the consumer dropped the stream; the
            // session is cancelled with it
            let _ = tx.send(result).await;
        });
    }
    drop(tx);

    Ok(SessionStream {
        seed_url: extraction.final_url,
        group_names,
        malformed,
        rx,
    })
}
