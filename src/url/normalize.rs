use crate::{UrlError, UrlResult};
use std::fmt;
use url::Url;

/// An absolute http(s) URL with its query string and fragment removed
///
/// Two URLs that differ only in query or fragment normalize to the same value,
/// so this type is used as the key of the crawl index and of the per-run
/// visited map.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NormalizedUrl(String);

impl NormalizedUrl {
    /// Returns the normalized URL as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NormalizedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NormalizedUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Normalizes an absolute URL
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Reject schemes other than http and https
/// 3. Reject URLs without a host
/// 4. Remove the query string (everything after ?)
/// 5. Remove the fragment (everything after #)
///
/// Scheme, host, port and path are preserved as the `url` crate serializes
/// them. Applying the function to its own output returns the same value.
///
/// # Examples
///
/// ```
/// use cache_warmer::url::normalize_url;
///
/// let url = normalize_url("https://example.com/page?utm_source=x#top").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/page");
/// ```
pub fn normalize_url(url_str: &str) -> UrlResult<NormalizedUrl> {
    let url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;
    normalize_parsed(url)
}

/// Resolves a possibly relative href against `base` and normalizes the result
///
/// # Examples
///
/// ```
/// use cache_warmer::url::resolve_url;
/// use url::Url;
///
/// let base = Url::parse("https://example.com/blog/post").unwrap();
/// let url = resolve_url("../about?ref=nav", &base).unwrap();
/// assert_eq!(url.as_str(), "https://example.com/about");
/// ```
pub fn resolve_url(href: &str, base: &Url) -> UrlResult<NormalizedUrl> {
    let url = base
        .join(href.trim())
        .map_err(|e| UrlError::Parse(e.to_string()))?;
    normalize_parsed(url)
}

fn normalize_parsed(mut url: Url) -> UrlResult<NormalizedUrl> {
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingDomain);
    }

    url.set_query(None);
    url.set_fragment(None);

    Ok(NormalizedUrl(url.into()))
}

/// Builds the cache-warming variant of a URL by appending `marker` to its query
///
/// An existing query is kept and the marker is joined with `&`. Any fragment
/// is dropped since it is never sent to the server anyway.
///
/// # Examples
///
/// ```
/// use cache_warmer::url::warm_url;
///
/// assert_eq!(
///     warm_url("https://example.com/page", "qc-cache-warm").unwrap(),
///     "https://example.com/page?qc-cache-warm"
/// );
/// ```
pub fn warm_url(url_str: &str, marker: &str) -> UrlResult<String> {
    let mut url = Url::parse(url_str).map_err(|e| UrlError::Parse(e.to_string()))?;

    let query = match url.query() {
        Some(existing) if !existing.is_empty() => format!("{}&{}", existing, marker),
        _ => marker.to_string(),
    };

    url.set_query(Some(&query));
    url.set_fragment(None);

    Ok(url.into())
}
