//! URL handling module for linkloom
//!
//! This module provides link parsing/validation, URL normalization for cache
//! keys, and the first-path-segment helper used by the path grouper.

mod normalize;

pub use normalize::{cache_key, normalize_url};

use crate::{UrlError, UrlResult};
use url::Url;

/// Parses a raw link into an absolute HTTP(S) URL
///
/// A link must parse as a valid URL with an `http` or `https` scheme and a
/// host to participate in grouping or scraping. Anything else is malformed
/// and reported separately by the grouper, never silently dropped.
///
/// # Examples
///
/// ```
/// use linkloom::url::parse_link;
///
/// let url = parse_link("https://example.com/blog/post").unwrap();
/// assert_eq!(url.host_str(), Some("example.com"));
///
/// assert!(parse_link("not a url").is_err());
/// assert!(parse_link("mailto:a@b.com").is_err());
/// ```
pub fn parse_link(raw: &str) -> UrlResult<Url> {
    let url = Url::parse(raw.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingHost);
    }

    Ok(url)
}

/// Returns the first non-empty path segment of a URL, if any
///
/// `https://example.com/` and `https://example.com` have no segments;
/// `https://example.com/blog/post` has first segment `blog`.
pub fn first_path_segment(url: &Url) -> Option<&str> {
    url.path_segments()
        .and_then(|mut segments| segments.find(|s| !s.is_empty()))
}
