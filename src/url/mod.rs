//! URL handling module for Cache-Warmer
//!
//! This module provides URL normalization, relative link resolution,
//! in-domain checks and construction of cache-warming URLs.

mod domain;
mod normalize;

pub use domain::{extract_domain, is_same_domain};
pub use normalize::{normalize_url, resolve_url, warm_url, NormalizedUrl};
