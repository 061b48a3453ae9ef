//! Sitemap discovery
//!
//! Fetches a sitemap document, follows nested sitemap indexes depth-first and
//! returns the page URLs in document order. Fetch and parse failures only
//! drop the affected document; they never abort the resolution.

use crate::WarmError;
use futures::future::{BoxFuture, FutureExt};
use quick_xml::events::Event;
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::NsReader;
use reqwest::{Client, StatusCode};
use std::collections::HashSet;
use std::time::Duration;

/// XML namespace of sitemap and sitemap index documents
pub const SITEMAP_NAMESPACE: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

/// Returns true if a `<loc>` entry points at another sitemap rather than a page
///
/// The document type is not inspected; any URL containing "sitemap" and
/// ending in ".xml" is treated as a nested sitemap.
pub fn is_sitemap_url(url: &str) -> bool {
    url.contains("sitemap") && url.ends_with(".xml")
}

/// Extracts the text of every `<loc>` element in the sitemap namespace
///
/// Both `<urlset>` and `<sitemapindex>` documents are accepted. `<loc>`
/// elements in other namespaces are ignored. Surrounding whitespace is
/// trimmed and empty entries are dropped.
///
/// # Returns
///
/// * `Ok(Vec<String>)` - The `<loc>` values in document order
/// * `Err(quick_xml::Error)` - The document is not well-formed XML
pub fn parse_sitemap(xml: &str) -> Result<Vec<String>, quick_xml::Error> {
    let mut reader = NsReader::from_str(xml);
    let mut locs = Vec::new();
    let mut current: Option<String> = None;

    loop {
        match reader.read_resolved_event()? {
            (ResolveResult::Bound(Namespace(ns)), Event::Start(e))
                if ns == SITEMAP_NAMESPACE.as_bytes() && e.local_name().as_ref() == b"loc" =>
            {
                current = Some(String::new());
            }
            (_, Event::Text(text)) => {
                if let Some(buf) = current.as_mut() {
                    buf.push_str(&text.unescape()?);
                }
            }
            (_, Event::CData(data)) => {
                if let Some(buf) = current.as_mut() {
                    buf.push_str(&String::from_utf8_lossy(&data));
                }
            }
            (_, Event::End(e)) if e.local_name().as_ref() == b"loc" => {
                if let Some(buf) = current.take() {
                    let loc = buf.trim();
                    if !loc.is_empty() {
                        locs.push(loc.to_string());
                    }
                }
            }
            (_, Event::Eof) => break,
            _ => {}
        }
    }

    Ok(locs)
}

/// Resolves a sitemap into a flat list of page URLs
///
/// Nested sitemaps are fetched recursively and their pages spliced in at the
/// position of the nested entry. Each sitemap URL is fetched at most once per
/// call, which terminates cyclic indexes. Duplicate page URLs are kept.
///
/// # Arguments
///
/// * `client` - HTTP client carrying the crawler's User-Agent
/// * `url` - The root sitemap
/// * `timeout` - Timeout for each sitemap request
///
/// # Returns
///
/// The discovered page URLs; empty if nothing could be fetched or parsed.
pub async fn resolve_sitemap(client: &Client, url: &str, timeout: Duration) -> Vec<String> {
    let mut visited = HashSet::new();
    let mut urls = Vec::new();

    resolve_into(client, url.to_string(), timeout, &mut visited, &mut urls).await;

    urls
}

fn resolve_into<'a>(
    client: &'a Client,
    url: String,
    timeout: Duration,
    visited: &'a mut HashSet<String>,
    urls: &'a mut Vec<String>,
) -> BoxFuture<'a, ()> {
    async move {
        if !visited.insert(url.clone()) {
            tracing::debug!("Sitemap {} already visited, skipping", url);
            return;
        }

        let locs = match fetch_sitemap(client, &url, timeout).await {
            Ok(locs) => locs,
            Err(WarmError::UnexpectedStatus { status, .. }) => {
                tracing::warn!("Sitemap {} returned HTTP {}", url, status);
                return;
            }
            Err(e) => {
                tracing::error!("Error fetching sitemap: {}", e);
                return;
            }
        };

        tracing::debug!("Sitemap {} lists {} entries", url, locs.len());

        for loc in locs {
            if is_sitemap_url(&loc) {
                resolve_into(client, loc, timeout, &mut *visited, &mut *urls).await;
            } else {
                urls.push(loc);
            }
        }
    }
    .boxed()
}

/// Fetches one sitemap document and returns its `<loc>` entries
async fn fetch_sitemap(
    client: &Client,
    url: &str,
    timeout: Duration,
) -> Result<Vec<String>, WarmError> {
    let response = client
        .get(url)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| WarmError::from_request(url, e))?;

    if response.status() != StatusCode::OK {
        return Err(WarmError::UnexpectedStatus {
            url: url.to_string(),
            status: response.status().as_u16(),
        });
    }

    let body = response
        .text()
        .await
        .map_err(|e| WarmError::from_request(url, e))?;

    parse_sitemap(&body).map_err(|e| WarmError::SitemapParse {
        url: url.to_string(),
        message: e.to_string(),
    })
}
