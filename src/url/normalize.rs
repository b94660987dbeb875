use crate::{UrlError, UrlResult};
use url::Url;

/// Tracking query parameters removed during normalization
const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "fbclid",
    "gclid",
    "mc_eid",
];

/// Normalizes a URL for use as a content-cache key
///
/// Two links that differ only in fragment, tracking parameters, query
/// ordering, or a trailing slash refer to the same content and must share a
/// cache entry, so the key folds those differences away:
///
/// 1. Parse; reject non-HTTP(S) schemes and host-less URLs
/// 2. Remove the fragment
/// 3. Collapse dot segments and repeated slashes in the path
/// 4. Remove the trailing slash (except for the root `/`)
/// 5. Drop tracking query parameters (`utm_*`, `fbclid`, `gclid`, ...)
/// 6. Sort the remaining query parameters; drop an empty query entirely
///
/// The host is already lowercased by the `url` crate during parsing.
///
/// # Examples
///
/// ```
/// use linkloom::url::normalize_url;
///
/// let url = normalize_url("https://example.com/blog/post/?utm_source=x#top").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/blog/post");
/// ```
pub fn normalize_url(raw: &str) -> UrlResult<Url> {
    let mut url = Url::parse(raw.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }
    if url.host_str().is_none() {
        return Err(UrlError::MissingHost);
    }

    url.set_fragment(None);

    let folded = fold_path(url.path());
    url.set_path(&folded);

    if url.query().is_some() {
        let params = filter_and_sort_query_params(&url);
        if params.is_empty() {
            url.set_query(None);
        } else {
            let query = params
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join("&");
            url.set_query(Some(&query));
        }
    }

    Ok(url)
}

/// Returns the string cache key for a link
pub fn cache_key(url: &Url) -> String {
    match normalize_url(url.as_str()) {
        Ok(normalized) => normalized.into(),
        // Already-parsed URLs only fail normalization on scheme/host rules,
        // which parse_link has enforced upstream; fall back to the raw form.
        Err(_) => url.as_str().to_string(),
    }
}

/// Collapses dot segments and repeated slashes; trims the trailing slash
fn fold_path(path: &str) -> String {
    let mut kept: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                kept.pop();
            }
            _ => kept.push(segment),
        }
    }

    if kept.is_empty() {
        return "/".to_string();
    }

    format!("/{}", kept.join("/"))
}

/// Filters out tracking parameters and sorts the rest by key
fn filter_and_sort_query_params(url: &Url) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    params.sort_by(|a, b| a.0.cmp(&b.0));
    params
}

fn is_tracking_param(key: &str) -> bool {
    TRACKING_PARAMS.contains(&key) || key.starts_with("utm_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_fragment() {
        let result = normalize_url("https://example.com/page#section").unwrap();
        assert_eq!(result.as_str(), "https://example.com/page");
    }

    #[test]
    fn test_remove_trailing_slash() {
        let result = normalize_url("https://example.com/page/").unwrap();
        assert_eq!(result.as_str(), "https://example.com/page");
    }

    #[test]
    fn test_keep_root_slash() {
        let result = normalize_url("https://example.com/").unwrap();
        assert_eq!(result.as_str(), "https://example.com/");
    }

    #[test]
    fn test_empty_path_becomes_root() {
        let result = normalize_url("https://example.com").unwrap();
        assert_eq!(result.as_str(), "https://example.com/");
    }

    #[test]
    fn test_lowercase_host() {
        let result = normalize_url("https://EXAMPLE.COM/Page").unwrap();
        assert_eq!(result.as_str(), "https://example.com/Page");
    }

    #[test]
    fn test_remove_tracking_params() {
        let result = normalize_url("https://example.com/page?utm_source=twitter").unwrap();
        assert_eq!(result.as_str(), "https://example.com/page");
    }

    #[test]
    fn test_custom_utm_param() {
        let result = normalize_url("https://example.com/page?utm_custom=value").unwrap();
        assert_eq!(result.as_str(), "https://example.com/page");
    }

    #[test]
    fn test_sort_query_params() {
        let result = normalize_url("https://example.com/page?b=2&a=1").unwrap();
        assert_eq!(result.as_str(), "https://example.com/page?a=1&b=2");
    }

    #[test]
    fn test_mixed_query_params() {
        let result =
            normalize_url("https://example.com/page?keep=yes&utm_medium=email&another=1").unwrap();
        assert_eq!(result.as_str(), "https://example.com/page?another=1&keep=yes");
    }

    #[test]
    fn test_fold_dot_segments() {
        let result = normalize_url("https://example.com/a/../b/./c").unwrap();
        assert_eq!(result.as_str(), "https://example.com/b/c");
    }

    #[test]
    fn test_fold_repeated_slashes() {
        let result = normalize_url("https://example.com///blog//post").unwrap();
        assert_eq!(result.as_str(), "https://example.com/blog/post");
    }

    #[test]
    fn test_rejects_bad_scheme() {
        assert!(normalize_url("ftp://example.com/file").is_err());
    }

    #[test]
    fn test_rejects_malformed() {
        assert!(normalize_url("not a url").is_err());
    }

    #[test]
    fn test_cache_key_folds_variants() {
        let a = parse("https://example.com/blog/post/?utm_source=x");
        let b = parse("https://example.com/blog/post#comments");
        assert_eq!(cache_key(&a), cache_key(&b));
    }

    fn parse(s: &str) -> Url {
        Url::parse(s).unwrap()
    }
}
