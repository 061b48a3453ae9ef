use url::Url;

/// Extracts the domain from a URL
///
/// This function retrieves the host portion of a URL and converts it to lowercase.
/// If the URL has no host, it returns None.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use cache_warmer::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Checks whether `url` points at `domain`
///
/// The comparison is an exact, case-insensitive host match: subdomains are
/// treated as different sites. Anything that fails to parse is reported as
/// out of domain rather than as an error.
pub fn is_same_domain(url: &str, domain: &str) -> bool {
    Url::parse(url)
        .ok()
        .and_then(|u| extract_domain(&u))
        .is_some_and(|host| host.eq_ignore_ascii_case(domain))
}
