//! Cache-aware fetch behavior against a mock origin

use crate::support::{html_page, test_config, test_fetcher, NoQuery};
use cache_warmer::crawler::FetchResult;
use cache_warmer::url::normalize_url;
use cache_warmer::CacheStatus;
use std::time::{Duration, Instant};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn html_response() -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(html_page(&[]))
        .insert_header("content-type", "text/html; charset=utf-8")
}

#[tokio::test]
async fn test_cache_hit_skips_warming() {
    let mock_server = MockServer::start().await;

    Mock::given(method("HEAD"))
        .and(path("/page"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("X-QC-Cache", "hit")
                .insert_header("X-LiteSpeed-Cache", "hit"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/page"))
        .and(query_param("qc-cache-warm", ""))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/page"))
        .and(NoQuery)
        .respond_with(html_response())
        .expect(1)
        .mount(&mock_server)
        .await;

    let (fetcher, index, sink) = test_fetcher(test_config(&mock_server.uri()));
    let url = format!("{}/page", mock_server.uri());

    let result = fetcher.fetch(&url).await;

    let report = result.report().cloned().expect("full fetch should complete");
    assert_eq!(report.warm_requests, 0);
    assert_eq!(report.probe.edge, CacheStatus::Hit);
    assert!(result.into_content().is_some());

    let rows = sink.cache_rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].url, url);
    // Header values are logged as the cache sent them
    assert_eq!(rows[0].edge_status, "hit");
    assert_eq!(rows[0].proxy_status, "hit");

    let record = index.get(&normalize_url(&url).unwrap()).unwrap();
    assert_eq!(record.cache_status, CacheStatus::Hit);
    assert!(sink.error_rows().is_empty());
}

#[tokio::test]
async fn test_persistent_miss_warms_max_retries() {
    let mock_server = MockServer::start().await;

    Mock::given(method("HEAD"))
        .and(path("/page"))
        .respond_with(ResponseTemplate::new(200).insert_header("X-QC-Cache", "MISS"))
        .expect(4)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/page"))
        .and(query_param("qc-cache-warm", ""))
        .respond_with(ResponseTemplate::new(200))
        .expect(3)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/page"))
        .and(NoQuery)
        .respond_with(html_response())
        .expect(1)
        .mount(&mock_server)
        .await;

    let (fetcher, index, sink) = test_fetcher(test_config(&mock_server.uri()));
    let url = format!("{}/page", mock_server.uri());

    let started = Instant::now();
    let result = fetcher.fetch(&url).await;

    // Backoff of 10ms, 20ms and 30ms before the three re-probes
    assert!(started.elapsed() >= Duration::from_millis(60));

    let report = result.report().cloned().expect("full fetch should complete");
    assert_eq!(report.warm_requests, 3);
    assert!(report.probe.edge.is_miss());
    assert!(result.into_content().is_some());

    assert_eq!(sink.cache_rows()[0].edge_status, "MISS");
    assert_eq!(sink.cache_rows()[0].proxy_status, "UNKNOWN");

    let record = index.get(&normalize_url(&url).unwrap()).unwrap();
    assert_eq!(record.cache_status, CacheStatus::Miss);
}

#[tokio::test]
async fn test_miss_then_hit_stops_warming() {
    let mock_server = MockServer::start().await;

    Mock::given(method("HEAD"))
        .and(path("/page"))
        .respond_with(ResponseTemplate::new(200).insert_header("X-QC-Cache", "miss"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("HEAD"))
        .and(path("/page"))
        .respond_with(ResponseTemplate::new(200).insert_header("X-QC-Cache", "hit"))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/page"))
        .and(query_param("qc-cache-warm", ""))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/page"))
        .and(NoQuery)
        .respond_with(html_response())
        .expect(1)
        .mount(&mock_server)
        .await;

    let (fetcher, _index, sink) = test_fetcher(test_config(&mock_server.uri()));
    let result = fetcher.fetch(&format!("{}/page", mock_server.uri())).await;

    let report = result.report().cloned().expect("full fetch should complete");
    assert_eq!(report.warm_requests, 1);
    assert_eq!(report.probe.edge, CacheStatus::Hit);
    assert_eq!(sink.cache_rows()[0].edge_status, "hit");
}

#[tokio::test]
async fn test_backoff_releases_gate_slot() {
    let mock_server = MockServer::start().await;

    Mock::given(method("HEAD"))
        .and(path("/cold"))
        .respond_with(ResponseTemplate::new(200).insert_header("X-QC-Cache", "miss"))
        .expect(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("HEAD"))
        .and(path("/warm"))
        .respond_with(ResponseTemplate::new(200).insert_header("X-QC-Cache", "hit"))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(query_param("qc-cache-warm", ""))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(NoQuery)
        .respond_with(html_response())
        .expect(2)
        .mount(&mock_server)
        .await;

    let mut config = test_config(&mock_server.uri());
    config.crawler.max_concurrent_requests = 1;
    config.cache.max_warm_retries = 1;
    config.cache.warm_backoff_ms = 300;
    let (fetcher, _index, _sink) = test_fetcher(config);

    let cold_url = format!("{}/cold", mock_server.uri());
    let warm_url = format!("{}/warm", mock_server.uri());
    let started = Instant::now();

    // /cold takes the only slot first, then sleeps through its backoff
    let cold = async {
        let result = fetcher.fetch(&cold_url).await;
        (result, Instant::now())
    };
    let warm = async {
        let result = fetcher.fetch(&warm_url).await;
        (result, Instant::now())
    };
    let ((cold_result, cold_done), (warm_result, warm_done)) = tokio::join!(cold, warm);

    assert_eq!(cold_result.report().map(|r| r.warm_requests), Some(1));
    assert_eq!(warm_result.report().map(|r| r.warm_requests), Some(0));
    assert!(cold_done - started >= Duration::from_millis(300));
    assert!(
        warm_done < cold_done,
        "second page should finish while the first is backing off"
    );
    assert_eq!(fetcher.gate().peak(), 1);
    assert_eq!(fetcher.gate().in_flight(), 0);
}

#[tokio::test]
async fn test_warming_disabled_with_zero_retries() {
    let mock_server = MockServer::start().await;

    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(200).insert_header("X-QC-Cache", "miss"))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(query_param("qc-cache-warm", ""))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(NoQuery)
        .respond_with(html_response())
        .mount(&mock_server)
        .await;

    let mut config = test_config(&mock_server.uri());
    config.cache.max_warm_retries = 0;
    let (fetcher, _index, _sink) = test_fetcher(config);

    let result = fetcher.fetch(&format!("{}/page", mock_server.uri())).await;
    assert_eq!(result.report().map(|r| r.warm_requests), Some(0));
}

#[tokio::test]
async fn test_slow_page_is_reported() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(html_response().set_delay(Duration::from_millis(800)))
        .mount(&mock_server)
        .await;

    let (fetcher, _index, sink) = test_fetcher(test_config(&mock_server.uri()));
    let url = format!("{}/slow", mock_server.uri());

    let result = fetcher.fetch(&url).await;
    let report = result.report().cloned().expect("full fetch should complete");
    assert!(report.slow);
    assert!(report.response_time_ms >= 800);

    let slow = sink.slow_rows();
    assert_eq!(slow.len(), 1);
    assert_eq!(slow[0].url, url);
    assert!(slow[0].response_time_ms > 500);

    assert_eq!(sink.cache_rows().len(), 1);
}

#[tokio::test]
async fn test_fast_page_only_logs_cache_row() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/fast"))
        .respond_with(html_response())
        .mount(&mock_server)
        .await;

    let (fetcher, _index, sink) = test_fetcher(test_config(&mock_server.uri()));
    let result = fetcher.fetch(&format!("{}/fast", mock_server.uri())).await;

    assert!(!result.report().unwrap().slow);
    assert!(sink.slow_rows().is_empty());
    assert_eq!(sink.cache_rows().len(), 1);
    // Missing cache headers are reported as unknown
    assert_eq!(sink.cache_rows()[0].edge_status, "UNKNOWN");
}

#[tokio::test]
async fn test_non_html_response_has_no_content() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/file.pdf"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(b"%PDF-1.4".to_vec())
                .insert_header("content-type", "application/pdf"),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_string(html_page(&[]))
                .insert_header("content-type", "text/html"),
        )
        .mount(&mock_server)
        .await;

    let (fetcher, _index, sink) = test_fetcher(test_config(&mock_server.uri()));

    let pdf = fetcher.fetch(&format!("{}/file.pdf", mock_server.uri())).await;
    match &pdf {
        FetchResult::NotHtml { content_type, .. } => assert_eq!(content_type, "application/pdf"),
        other => panic!("expected NotHtml, got {:?}", other),
    }

    let missing = fetcher.fetch(&format!("{}/missing", mock_server.uri())).await;
    assert_eq!(missing.report().map(|r| r.status_code), Some(404));
    assert!(missing.into_content().is_none());

    // Both completed a full fetch, neither is an error
    assert_eq!(sink.cache_rows().len(), 2);
    assert!(sink.error_rows().is_empty());
}

#[tokio::test]
async fn test_network_error_is_reported() {
    let (fetcher, index, sink) = test_fetcher(test_config("http://127.0.0.1:1"));
    let url = "http://127.0.0.1:1/unreachable";

    let result = fetcher.fetch(url).await;
    assert!(matches!(result, FetchResult::Failed { .. }));

    let errors = sink.error_rows();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].url, url);
    assert!(!errors[0].message.is_empty());

    assert!(sink.cache_rows().is_empty());
    assert!(index.is_empty());
    assert_eq!(fetcher.gate().in_flight(), 0);
}

#[tokio::test]
async fn test_invalid_url_is_reported() {
    let (fetcher, _index, sink) = test_fetcher(test_config("http://127.0.0.1:1"));

    let result = fetcher.fetch("not a url").await;
    assert!(matches!(result, FetchResult::Failed { .. }));
    assert_eq!(sink.error_rows().len(), 1);
}

#[tokio::test]
async fn test_recently_crawled_page_is_skipped() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(html_response())
        .expect(1)
        .mount(&mock_server)
        .await;

    let (fetcher, index, _sink) = test_fetcher(test_config(&mock_server.uri()));
    let url = format!("{}/page", mock_server.uri());

    assert!(fetcher.fetch(&url).await.into_content().is_some());
    assert!(matches!(fetcher.fetch(&url).await, FetchResult::Skipped));
    // Query variants share the index entry
    assert!(matches!(
        fetcher.fetch(&format!("{}?ref=nav", url)).await,
        FetchResult::Skipped
    ));

    assert_eq!(index.len(), 1);
}

#[tokio::test]
async fn test_warm_request_keeps_existing_query() {
    let mock_server = MockServer::start().await;

    Mock::given(method("HEAD"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).insert_header("X-QC-Cache", "miss"))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "rust"))
        .and(query_param("qc-cache-warm", ""))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(html_response())
        .mount(&mock_server)
        .await;

    let mut config = test_config(&mock_server.uri());
    config.cache.max_warm_retries = 1;
    let (fetcher, _index, _sink) = test_fetcher(config);

    let result = fetcher
        .fetch(&format!("{}/search?q=rust", mock_server.uri()))
        .await;
    assert_eq!(result.report().map(|r| r.warm_requests), Some(1));
}
