//! Path grouper for linkloom
//!
//! This module partitions a raw link list into named groups keyed by the
//! first path segment of each link. It is pure: no I/O, no dependencies on
//! the cache or the fetcher, usable on its own for display purposes.

use crate::url::{cache_key, first_path_segment, parse_link};
use std::collections::{HashMap, HashSet};
use url::Url;

/// Group name for links with no path segments (site root)
pub const HOME_GROUP: &str = "Home";

/// Group name for links that did not qualify for any named group
pub const OTHER_GROUP: &str = "Other";

/// A named bucket of links sharing a first-path-segment taxonomy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkGroup {
    /// Group name: title-cased first segment, `Home`, or `Other`
    pub name: String,

    /// Member links, in input order, deduplicated
    pub links: Vec<Url>,
}

/// The result of one grouping operation
#[derive(Debug, Clone, Default)]
pub struct Grouping {
    /// Realized groups, in first-seen order of their names
    pub groups: Vec<LinkGroup>,

    /// Raw inputs that failed URL parsing; reported, never silently dropped
    pub malformed: Vec<String>,
}

impl Grouping {
    /// Total number of links across all groups
    pub fn link_count(&self) -> usize {
        self.groups.iter().map(|g| g.links.len()).sum()
    }

    /// Looks up a group by name
    pub fn get(&self, name: &str) -> Option<&LinkGroup> {
        self.groups.iter().find(|g| g.name == name)
    }
}

/// Partitions links into named groups by first path segment
///
/// Each parseable link is assigned to exactly one group:
///
/// - links with no path segments go to `Home`
/// - links whose first segment is shared by more than one input link go to
///   a group named by title-casing that segment
/// - remaining links (singleton segments) go to `Other`
///
/// Group names appear in first-seen order of the *final* assignment; links
/// keep input order within their group. Duplicate links (same normalized
/// form) are kept once, first occurrence wins. Unparseable inputs are
/// collected into `malformed` and excluded from every group.
///
/// # Examples
///
/// ```
/// use linkloom::group::group_links;
///
/// let grouping = group_links([
///     "https://ex.com/blog/a",
///     "https://ex.com/blog/b",
///     "https://ex.com/about",
/// ]);
///
/// assert_eq!(grouping.groups[0].name, "Blog");
/// assert_eq!(grouping.groups[0].links.len(), 2);
/// assert_eq!(grouping.groups[1].name, "Other");
/// assert_eq!(grouping.groups[1].links.len(), 1);
/// ```
pub fn group_links<I, S>(links: I) -> Grouping
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut malformed = Vec::new();
    let mut parsed: Vec<(Url, Option<String>)> = Vec::new();
    let mut seen_keys = HashSet::new();

    for raw in links {
        let raw = raw.as_ref();
        match parse_link(raw) {
            Ok(url) => {
                if !seen_keys.insert(cache_key(&url)) {
                    continue;
                }
                let candidate = first_path_segment(&url).map(title_case);
                parsed.push((url, candidate));
            }
            Err(_) => malformed.push(raw.to_string()),
        }
    }

    // Count candidate members across the entire input; singleton candidates
    // (other than Home) are demoted to Other.
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for (_, candidate) in &parsed {
        if let Some(name) = candidate {
            *counts.entry(name.as_str()).or_insert(0) += 1;
        }
    }

    let mut groups: Vec<LinkGroup> = Vec::new();
    for (url, candidate) in &parsed {
        let name = match candidate {
            None => HOME_GROUP,
            Some(name) if counts[name.as_str()] > 1 => name.as_str(),
            Some(_) => OTHER_GROUP,
        };

        match groups.iter_mut().find(|g| g.name == name) {
            Some(group) => group.links.push(url.clone()),
            None => groups.push(LinkGroup {
                name: name.to_string(),
                links: vec![url.clone()],
            }),
        }
    }

    Grouping { groups, malformed }
}

/// Title-cases a path segment: first character uppercased, rest lowercased
fn title_case(segment: &str) -> String {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(|c| c.to_lowercase())).collect(),
        None => String::new(),
    }
}
