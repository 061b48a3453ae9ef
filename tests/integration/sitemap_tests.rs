//! Sitemap resolution against a mock origin

use crate::support::{sitemap_index, urlset};
use cache_warmer::crawler::{build_http_client, resolve_sitemap};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TIMEOUT: Duration = Duration::from_secs(2);

async fn serve_xml(server: &MockServer, at: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "application/xml"),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_flat_urlset() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();
    let pages: Vec<String> = ["/", "/about", "/contact"]
        .iter()
        .map(|p| format!("{}{}", base, p))
        .collect();

    serve_xml(&mock_server, "/sitemap.xml", urlset(&pages)).await;

    let client = build_http_client("test").unwrap();
    let urls = resolve_sitemap(&client, &format!("{}/sitemap.xml", base), TIMEOUT).await;

    assert_eq!(urls, pages);
}

#[tokio::test]
async fn test_nested_index_is_expanded_in_order() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();

    let index = sitemap_index(&[
        format!("{}/post-sitemap.xml", base),
        format!("{}/page-sitemap.xml", base),
    ]);
    let posts: Vec<String> = (1..=3).map(|i| format!("{}/post-{}", base, i)).collect();
    let pages: Vec<String> = (1..=3).map(|i| format!("{}/page-{}", base, i)).collect();

    serve_xml(&mock_server, "/sitemap_index.xml", index).await;
    serve_xml(&mock_server, "/post-sitemap.xml", urlset(&posts)).await;
    serve_xml(&mock_server, "/page-sitemap.xml", urlset(&pages)).await;

    let client = build_http_client("test").unwrap();
    let urls = resolve_sitemap(&client, &format!("{}/sitemap_index.xml", base), TIMEOUT).await;

    let expected: Vec<String> = posts.into_iter().chain(pages).collect();
    assert_eq!(urls, expected);
}

#[tokio::test]
async fn test_cyclic_index_terminates() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();

    // a-sitemap.xml -> b-sitemap.xml -> a-sitemap.xml
    Mock::given(method("GET"))
        .and(path("/a-sitemap.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(sitemap_index(&[format!(
            "{}/b-sitemap.xml",
            base
        )])))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/b-sitemap.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(sitemap_index(&[
            format!("{}/a-sitemap.xml", base),
            format!("{}/only-page", base),
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = build_http_client("test").unwrap();
    let urls = resolve_sitemap(&client, &format!("{}/a-sitemap.xml", base), TIMEOUT).await;

    assert_eq!(urls, vec![format!("{}/only-page", base)]);
}

#[tokio::test]
async fn test_missing_sitemap_yields_nothing() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/sitemap.xml"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let client = build_http_client("test").unwrap();
    let urls = resolve_sitemap(
        &client,
        &format!("{}/sitemap.xml", mock_server.uri()),
        TIMEOUT,
    )
    .await;

    assert!(urls.is_empty());
}

#[tokio::test]
async fn test_malformed_sitemap_yields_nothing() {
    let mock_server = MockServer::start().await;

    serve_xml(
        &mock_server,
        "/sitemap.xml",
        "<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\"><url><loc>x</loc></oops>"
            .to_string(),
    )
    .await;

    let client = build_http_client("test").unwrap();
    let urls = resolve_sitemap(
        &client,
        &format!("{}/sitemap.xml", mock_server.uri()),
        TIMEOUT,
    )
    .await;

    assert!(urls.is_empty());
}

#[tokio::test]
async fn test_failing_child_sitemap_is_skipped() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();

    let index = sitemap_index(&[
        format!("{}/good-sitemap.xml", base),
        format!("{}/broken-sitemap.xml", base),
    ]);
    let good = vec![format!("{}/kept", base)];

    serve_xml(&mock_server, "/sitemap.xml", index).await;
    serve_xml(&mock_server, "/good-sitemap.xml", urlset(&good)).await;

    Mock::given(method("GET"))
        .and(path("/broken-sitemap.xml"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let client = build_http_client("test").unwrap();
    let urls = resolve_sitemap(&client, &format!("{}/sitemap.xml", base), TIMEOUT).await;

    assert_eq!(urls, good);
}

#[tokio::test]
async fn test_unreachable_sitemap_yields_nothing() {
    let client = build_http_client("test").unwrap();
    let urls = resolve_sitemap(&client, "http://127.0.0.1:1/sitemap.xml", TIMEOUT).await;
    assert!(urls.is_empty());
}
