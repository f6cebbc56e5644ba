//! Cacheability heuristic
//!
//! Looks for response headers that suggest a caching layer sits in front of
//! the origin. A match is a signal, not proof that this particular response
//! came from (or went into) a cache; no match does not prove the response is
//! uncacheable either.

use serde::{Deserialize, Serialize};

/// Which header rule fired, with the value that triggered it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", content = "value", rename_all = "snake_case")]
pub enum CacheSignal {
    /// `Age` present
    Age(String),
    /// `X-Cache` mentions hit or miss
    XCache(String),
    /// `CF-Cache-Status` present
    CfCacheStatus(String),
    /// `Cache-Control` contains `public`
    PublicCacheControl(String),
}

impl CacheSignal {
    pub fn description(&self) -> String {
        match self {
            CacheSignal::Age(v) => format!("Age: {}", v),
            CacheSignal::XCache(v) => format!("X-Cache: {}", v),
            CacheSignal::CfCacheStatus(v) => format!("CF-Cache-Status: {}", v),
            CacheSignal::PublicCacheControl(v) => format!("Cache-Control: {}", v),
        }
    }
}

/// Outcome of the heuristic for one response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cacheability {
    pub cacheable: bool,
    pub signal: Option<CacheSignal>,
}

impl Cacheability {
    /// Short label for tables
    pub fn label(&self) -> &'static str {
        if self.cacheable {
            "Yes (High Risk)"
        } else {
            "No (Reflected Only)"
        }
    }

    /// Label plus the header that decided it
    pub fn rationale(&self) -> String {
        match &self.signal {
            Some(signal) => format!("{} - {}", self.label(), signal.description()),
            None => format!("{} - no cache headers observed", self.label()),
        }
    }
}

/// Classify a response by its headers; the first matching header wins
pub fn classify(headers: &[(String, String)]) -> Cacheability {
    let signal = headers.iter().find_map(|(name, value)| match_rule(name, value));
    Cacheability {
        cacheable: signal.is_some(),
        signal,
    }
}

fn match_rule(name: &str, value: &str) -> Option<CacheSignal> {
    let value_lower = value.to_ascii_lowercase();

    if name.eq_ignore_ascii_case("age") {
        Some(CacheSignal::Age(value.to_string()))
    } else if name.eq_ignore_ascii_case("x-cache")
        && (value_lower.contains("hit") || value_lower.contains("miss"))
    {
        Some(CacheSignal::XCache(value.to_string()))
    } else if name.eq_ignore_ascii_case("cf-cache-status") {
        Some(CacheSignal::CfCacheStatus(value.to_string()))
    } else if name.eq_ignore_ascii_case("cache-control") && value_lower.contains("public") {
        Some(CacheSignal::PublicCacheControl(value.to_string()))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_public_cache_control() {
        let result = classify(&headers(&[("Cache-Control", "public, max-age=100")]));
        assert!(result.cacheable);
        assert_eq!(
            result.signal,
            Some(CacheSignal::PublicCacheControl("public, max-age=100".into()))
        );
    }

    #[test]
    fn test_no_store_is_not_cacheable() {
        let result = classify(&headers(&[("Cache-Control", "no-store")]));
        assert!(!result.cacheable);
        assert_eq!(result.label(), "No (Reflected Only)");
    }

    #[test]
    fn test_cf_cache_status_any_value() {
        let result = classify(&headers(&[("cf-cache-status", "DYNAMIC")]));
        assert!(result.cacheable);
        assert_eq!(result.label(), "Yes (High Risk)");
    }

    #[test]
    fn test_no_relevant_headers() {
        let result = classify(&headers(&[("Content-Type", "text/html"), ("Server", "nginx")]));
        assert!(!result.cacheable);
        assert!(result.signal.is_none());
        assert!(classify(&[]).signal.is_none());
    }

    #[test]
    fn test_age_and_x_cache() {
        assert!(classify(&headers(&[("AGE", "0")])).cacheable);
        assert!(classify(&headers(&[("X-Cache", "TCP_MISS from edge")])).cacheable);
        assert!(classify(&headers(&[("X-Cache", "Hit from cloudfront")])).cacheable);
        assert!(!classify(&headers(&[("X-Cache", "BYPASS")])).cacheable);
    }

    #[test]
    fn test_first_matching_header_is_reported() {
        let result = classify(&headers(&[
            ("X-Cache", "BYPASS"),
            ("Cache-Control", "public"),
            ("Age", "5"),
        ]));
        assert_eq!(result.signal, Some(CacheSignal::PublicCacheControl("public".into())));
        assert!(result.rationale().contains("Cache-Control: public"));
    }
}
