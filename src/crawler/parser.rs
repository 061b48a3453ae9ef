//! HTML link extraction
//!
//! Turns a fetched page into the in-domain links the recursive crawler
//! follows. Parsing is lenient; a page that yields nothing simply has no
//! links.

use crate::url::{is_same_domain, resolve_url, NormalizedUrl};
use scraper::{ElementRef, Html, Selector};
use std::sync::OnceLock;
use url::Url;

static LINK_SELECTOR: OnceLock<Option<Selector>> = OnceLock::new();

fn link_selector() -> Option<&'static Selector> {
    LINK_SELECTOR
        .get_or_init(|| Selector::parse("a[href], area[href]").ok())
        .as_ref()
}

/// Lazily yields the normalized in-domain links of a parsed document
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` and `<area href="...">`
///
/// **Exclude:**
/// - Elements carrying a `download` attribute
/// - `javascript:`, `mailto:`, `tel:` and `data:` hrefs
/// - Fragment-only hrefs (same page anchors)
/// - Non-HTTP(S) URLs after resolution
/// - URLs whose host is not `domain`
///
/// Relative hrefs are resolved against `base_url`. Yielded URLs have their
/// query and fragment removed. Duplicates are not filtered here.
///
/// # Example
///
/// ```
/// use cache_warmer::crawler::extract_links;
/// use scraper::Html;
/// use url::Url;
///
/// let html = r#"<a href="/about?ref=nav">About</a><a href="https://other.com/">Out</a>"#;
/// let document = Html::parse_document(html);
/// let base = Url::parse("https://example.com/").unwrap();
///
/// let links: Vec<_> = extract_links(&document, &base, "example.com").collect();
/// assert_eq!(links.len(), 1);
/// assert_eq!(links[0].as_str(), "https://example.com/about");
/// ```
pub fn extract_links<'a>(
    document: &'a Html,
    base_url: &'a Url,
    domain: &'a str,
) -> impl Iterator<Item = NormalizedUrl> + 'a {
    link_selector()
        .into_iter()
        .flat_map(move |selector| document.select(selector))
        .filter_map(move |element| link_target(element, base_url))
        .filter(move |url| is_same_domain(url.as_str(), domain))
}

/// Parses `html` and collects its in-domain links
///
/// The parsed document is dropped before returning, so the result can be held
/// across await points.
pub fn extract_links_from_html(html: &str, base_url: &Url, domain: &str) -> Vec<NormalizedUrl> {
    let document = Html::parse_document(html);
    extract_links(&document, base_url, domain).collect()
}

fn link_target(element: ElementRef<'_>, base_url: &Url) -> Option<NormalizedUrl> {
    if element.value().attr("download").is_some() {
        return None;
    }

    let href = element.value().attr("href")?.trim();

    if href.is_empty() || href.starts_with('#') || has_excluded_scheme(href) {
        return None;
    }

    resolve_url(href, base_url).ok()
}

fn has_excluded_scheme(href: &str) -> bool {
    let lower = href.to_ascii_lowercase();
    ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
}
