//! HTML parsing for link extraction and readable content
//!
//! This module turns raw HTML into the two shapes the rest of the crate
//! consumes:
//! - the list of same-host hyperlinks on a seed page
//! - readable content for a single page: title, preview, markdown-ish body,
//!   and a content-kind tag

use crate::cache::ContentKind;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Headings that are navigation chrome rather than article titles
const NAV_STOPWORDS: &[&str] = &["Blog", "Product", "Docs", "Jobs", "Home"];

/// Maximum preview length in characters, before the ellipsis
const PREVIEW_CHARS: usize = 150;

/// Readable content extracted from one page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageContent {
    /// Page title; "Untitled" when none was found
    pub title: String,

    /// Short preview of the body text
    pub preview: String,

    /// Markdown-ish readable body; may be empty
    pub content: String,

    /// Content-type classification tag
    pub kind: ContentKind,
}

impl PageContent {
    /// Converts fetched content into a cache entry stamped with the current time
    pub fn into_cache_entry(self) -> crate::cache::CacheEntry {
        crate::cache::CacheEntry {
            title: self.title,
            preview: self.preview,
            content: self.content,
            kind: self.kind,
            scraped_at: chrono::Utc::now(),
        }
    }
}

/// Extracts all same-host hyperlinks from a page
///
/// # Link Extraction Rules
///
/// **Include:** `<a href="...">` anywhere in the document, resolved against
/// `base_url`, with fragments stripped.
///
/// **Exclude:**
/// - `javascript:`, `mailto:`, `tel:` and `data:` hrefs
/// - fragment-only links (same-page anchors)
/// - `<a href="..." download>` links
/// - links resolving to a different host than `base_url`
/// - non-HTTP(S) URLs after resolution
pub fn extract_links(html: &str, base_url: &Url) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut links = Vec::new();
    let mut seen = HashSet::new();

    if let Ok(selector) = Selector::parse("a[href]") {
        for element in document.select(&selector) {
            if element.value().attr("download").is_some() {
                continue;
            }
            let Some(href) = element.value().attr("href") else {
                continue;
            };
            if let Some(absolute) = resolve_link(href, base_url) {
                if seen.insert(absolute.clone()) {
                    links.push(absolute);
                }
            }
        }
    }

    links
}

/// Resolves an href to an absolute same-host URL, or None if excluded
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }
    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    let mut resolved = base_url.join(href).ok()?;
    if resolved.scheme() != "http" && resolved.scheme() != "https" {
        return None;
    }
    if resolved.host_str() != base_url.host_str() {
        return None;
    }

    resolved.set_fragment(None);
    Some(resolved.into())
}

/// Extracts readable content from a page
///
/// Walks the body in document order, mapping `h1`-`h6` to `#`-prefixed
/// headings and keeping paragraph text, with repeated blocks and navigation
/// chrome skipped. The title comes from the first substantial `h1`/`h2`;
/// pages without one get "Untitled". The preview is the first
/// 150 characters of non-heading text.
pub fn extract_readable(html: &str, url: &Url) -> PageContent {
    let document = Html::parse_document(html);

    let title = extract_title(&document).unwrap_or_else(|| "Untitled".to_string());

    let lines = readable_lines(&document);
    let content = lines.join("\n\n");
    let preview = build_preview(&lines);

    PageContent {
        title,
        preview,
        content,
        kind: ContentKind::classify(url),
    }
}

/// Finds the article title: the first h1/h2 that is long enough to be a
/// real heading and is not navigation chrome
fn extract_title(document: &Html) -> Option<String> {
    for level in ["h1", "h2"] {
        let selector = Selector::parse(level).ok()?;
        for element in document.select(&selector) {
            let text = element_text(&element);
            if text.len() > 10 && !NAV_STOPWORDS.contains(&text.as_str()) {
                return Some(text);
            }
        }
    }
    None
}

/// Collects the readable text blocks of the document, in order
fn readable_lines(document: &Html) -> Vec<String> {
    let (Ok(selector), Ok(heading_selector)) = (
        Selector::parse("h1, h2, h3, h4, h5, h6, p, div"),
        Selector::parse("h1, h2, h3, h4, h5, h6"),
    ) else {
        return Vec::new();
    };

    let mut lines = Vec::new();
    let mut seen = HashSet::new();

    for element in document.select(&selector) {
        let text = element_text(&element);
        if text.is_empty() || seen.contains(&text) {
            continue;
        }
        if NAV_STOPWORDS.contains(&text.as_str()) {
            continue;
        }

        let name = element.value().name();
        let line = match name {
            "h1" => format!("# {}", text),
            "h2" => format!("## {}", text),
            "h3" => format!("### {}", text),
            "h4" => format!("#### {}", text),
            "h5" => format!("##### {}", text),
            "h6" => format!("###### {}", text),
            // Containers that merely wrap headings would duplicate them
            _ if element.select(&heading_selector).next().is_some() => continue,
            _ => text.clone(),
        };

        seen.insert(text);
        lines.push(line);
    }

    lines
}

/// Builds the preview from non-heading text
fn build_preview(lines: &[String]) -> String {
    let body_text = lines
        .iter()
        .filter(|line| !line.starts_with('#'))
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" ");

    if body_text.chars().count() > PREVIEW_CHARS {
        let truncated: String = body_text.chars().take(PREVIEW_CHARS).collect();
        format!("{}...", truncated)
    } else {
        body_text
    }
}

fn element_text(element: &ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}
