//! Cache status values reported by edge and reverse-proxy caches
//!
//! The caches send free-form header values; only "hit" and "miss" drive
//! behavior. Everything else is carried through for reporting.

use std::fmt;

/// The status of a page in a cache layer, as read from a response header
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum CacheStatus {
    /// The cache served the page
    Hit,

    /// The cache did not have the page
    Miss,

    /// The header was absent or unreadable
    #[default]
    Unknown,

    /// Any other value the cache reported (e.g. "hit,private", "expired")
    Other(String),
}

impl CacheStatus {
    /// Parses a header value, matching "hit" and "miss" case-insensitively
    ///
    /// `None` and blank values become `Unknown`.
    pub fn from_header(value: Option<&str>) -> Self {
        let Some(raw) = value.map(str::trim).filter(|v| !v.is_empty()) else {
            return Self::Unknown;
        };

        if raw.eq_ignore_ascii_case("hit") {
            Self::Hit
        } else if raw.eq_ignore_ascii_case("miss") {
            Self::Miss
        } else if raw.eq_ignore_ascii_case("unknown") {
            Self::Unknown
        } else {
            Self::Other(raw.to_string())
        }
    }

    /// Returns true if the cache served the page
    pub fn is_hit(&self) -> bool {
        matches!(self, Self::Hit)
    }

    /// Returns true if the cache reported a miss
    pub fn is_miss(&self) -> bool {
        matches!(self, Self::Miss)
    }

    /// Returns the value written to the cache-performance log
    pub fn as_str(&self) -> &str {
        match self {
            Self::Hit => "HIT",
            Self::Miss => "MISS",
            Self::Unknown => "UNKNOWN",
            Self::Other(raw) => raw,
        }
    }
}

impl fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cache status of one page as seen by a single header-only probe
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CacheProbe {
    /// Edge cache status (`X-QC-Cache` by default), drives cache warming
    pub edge: CacheStatus,

    /// Reverse-proxy cache status (`X-LiteSpeed-Cache` by default), informational
    pub proxy: CacheStatus,

    /// Edge header value exactly as received, if present
    pub edge_raw: Option<String>,

    /// Proxy header value exactly as received, if present
    pub proxy_raw: Option<String>,
}

impl CacheProbe {
    /// Builds a probe from the two header values of a response
    pub fn from_headers(edge: Option<&str>, proxy: Option<&str>) -> Self {
        Self {
            edge: CacheStatus::from_header(edge),
            proxy: CacheStatus::from_header(proxy),
            edge_raw: raw_value(edge),
            proxy_raw: raw_value(proxy),
        }
    }

    /// Edge value as written to the cache-performance log
    pub fn edge_label(&self) -> &str {
        self.edge_raw.as_deref().unwrap_or("UNKNOWN")
    }

    /// Proxy value as written to the cache-performance log
    pub fn proxy_label(&self) -> &str {
        self.proxy_raw.as_deref().unwrap_or("UNKNOWN")
    }
}

fn raw_value(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
