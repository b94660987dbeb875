//! Content cache module for linkloom
//!
//! This module persists readable page content keyed by normalized URL so
//! that repeated scrape sessions (and concurrent groups sharing a link)
//! never fetch the same page twice. It provides:
//! - The `ContentCache` trait consumed by the batch orchestrator
//! - A SQLite-backed implementation for real runs
//! - An in-memory implementation for tests and dry runs

mod memory;
mod schema;
mod sqlite;
mod traits;

pub use memory::MemoryCache;
pub use schema::initialize_schema;
pub use sqlite::{CacheStats, SqliteCache};
pub use traits::{CacheError, CacheResult, ContentCache};

use chrono::{DateTime, Utc};
use url::Url;

/// Content-type classification for a cached page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentKind {
    Blog,
    PodcastTranscript,
    CallTranscript,
    LinkedinPost,
    RedditComment,
    Book,
    Other,
}

impl ContentKind {
    /// Classifies a page by URL patterns
    pub fn classify(url: &Url) -> Self {
        let s = url.as_str().to_lowercase();

        if s.contains("/blog/") {
            Self::Blog
        } else if s.contains("/podcast/") {
            Self::PodcastTranscript
        } else if s.contains("transcript") {
            Self::CallTranscript
        } else if s.contains("linkedin.com") {
            Self::LinkedinPost
        } else if s.contains("reddit.com") {
            Self::RedditComment
        } else if s.contains("/book/") {
            Self::Book
        } else {
            Self::Other
        }
    }

    /// Converts the kind to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Blog => "blog",
            Self::PodcastTranscript => "podcast_transcript",
            Self::CallTranscript => "call_transcript",
            Self::LinkedinPost => "linkedin_post",
            Self::RedditComment => "reddit_comment",
            Self::Book => "book",
            Self::Other => "other",
        }
    }

    /// Parses a kind from its database string representation
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "blog" => Some(Self::Blog),
            "podcast_transcript" => Some(Self::PodcastTranscript),
            "call_transcript" => Some(Self::CallTranscript),
            "linkedin_post" => Some(Self::LinkedinPost),
            "reddit_comment" => Some(Self::RedditComment),
            "book" => Some(Self::Book),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

/// A cached readable-content entry for one link
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// Page title; "Untitled" when the page had none
    pub title: String,

    /// Short preview of the readable text
    pub preview: String,

    /// Full readable body content; may be empty
    pub content: String,

    /// Content-type classification tag
    pub kind: ContentKind,

    /// When the content was fetched
    pub scraped_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Returns true if this entry carries no usable content
    ///
    /// An entry whose title and content are both empty after trimming is a
    /// placeholder; `lookup` treats such entries as absent so an empty
    /// result never suppresses a real fetch.
    pub fn is_placeholder(&self) -> bool {
        self.title.trim().is_empty() && self.content.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_classify_blog() {
        assert_eq!(ContentKind::classify(&url("https://ex.com/blog/post")), ContentKind::Blog);
    }

    #[test]
    fn test_classify_podcast() {
        assert_eq!(
            ContentKind::classify(&url("https://ex.com/podcast/ep-1")),
            ContentKind::PodcastTranscript
        );
    }

    #[test]
    fn test_classify_transcript() {
        assert_eq!(
            ContentKind::classify(&url("https://ex.com/calls/Transcript-42")),
            ContentKind::CallTranscript
        );
    }

    #[test]
    fn test_classify_social() {
        assert_eq!(
            ContentKind::classify(&url("https://www.linkedin.com/posts/abc")),
            ContentKind::LinkedinPost
        );
        assert_eq!(
            ContentKind::classify(&url("https://reddit.com/r/rust/comments/1")),
            ContentKind::RedditComment
        );
    }

    #[test]
    fn test_classify_other() {
        assert_eq!(ContentKind::classify(&url("https://ex.com/about")), ContentKind::Other);
    }

    #[test]
    fn test_kind_db_roundtrip() {
        for kind in [
            ContentKind::Blog,
            ContentKind::PodcastTranscript,
            ContentKind::CallTranscript,
            ContentKind::LinkedinPost,
            ContentKind::RedditComment,
            ContentKind::Book,
            ContentKind::Other,
        ] {
            assert_eq!(ContentKind::from_db_string(kind.to_db_string()), Some(kind));
        }
    }

    #[test]
    fn test_placeholder_detection() {
        let entry = CacheEntry {
            title: "  ".to_string(),
            preview: "something".to_string(),
            content: "\n\t".to_string(),
            kind: ContentKind::Other,
            scraped_at: Utc::now(),
        };
        assert!(entry.is_placeholder());

        let entry = CacheEntry { title: "Untitled".to_string(), ..entry };
        assert!(!entry.is_placeholder());
    }
}
