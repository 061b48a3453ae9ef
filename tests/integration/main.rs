//! Integration tests for Cache-Warmer
//!
//! These tests use wiremock to create mock HTTP servers and exercise the
//! fetcher, the sitemap resolver and full crawl runs end-to-end.

mod fetch_tests;
mod sitemap_tests;
mod support;
