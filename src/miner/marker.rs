//! Probe markers and cache busting

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Width of the random part of a marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MarkerStyle {
    /// Five digits, 10000..=99999
    Compact,
    /// Twelve digits
    #[default]
    Wide,
}

/// Token injected into every probe of one mining run
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Marker(String);

impl Marker {
    /// Generate a fresh marker: `prefix` followed by random digits
    pub fn generate(prefix: &str, style: MarkerStyle) -> Self {
        let mut rng = rand::thread_rng();
        let suffix: u64 = match style {
            MarkerStyle::Compact => rng.gen_range(10_000..=99_999),
            MarkerStyle::Wide => rng.gen_range(100_000_000_000..=999_999_999_999),
        };
        Marker(format!("{}{}", prefix, suffix))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Marker {
    fn from(s: &str) -> Self {
        Marker(s.to_string())
    }
}

impl std::fmt::Display for Marker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Source of cache-busting values
///
/// Values are wall-clock nanoseconds, bumped so every call returns a value
/// strictly greater than the previous one, across threads.
#[derive(Debug)]
pub struct CacheBuster {
    param: String,
    last: AtomicU64,
}

impl CacheBuster {
    pub fn new(param: &str) -> Self {
        Self {
            param: param.to_string(),
            last: AtomicU64::new(0),
        }
    }

    /// Next unique value
    pub fn next_value(&self) -> u64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);

        let mut prev = self.last.load(Ordering::Relaxed);
        loop {
            let next = now.max(prev + 1);
            match self
                .last
                .compare_exchange_weak(prev, next, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return next,
                Err(actual) => prev = actual,
            }
        }
    }

    /// `param=<next value>`
    pub fn next_term(&self) -> String {
        format!("{}={}", self.param, self.next_value())
    }
}

/// Append a query term to a URL or path, keeping any fragment at the end
pub fn bust_url(url: &str, term: &str) -> String {
    let (base, fragment) = match url.find('#') {
        Some(idx) => (&url[..idx], &url[idx..]),
        None => (url, ""),
    };

    let separator = if base.ends_with('?') || base.ends_with('&') {
        ""
    } else if base.contains('?') {
        "&"
    } else {
        "?"
    };

    format!("{}{}{}{}", base, separator, term, fragment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_compact_marker_range() {
        for _ in 0..200 {
            let marker = Marker::generate("canary", MarkerStyle::Compact);
            let digits = marker.as_str().strip_prefix("canary").unwrap();
            let n: u64 = digits.parse().unwrap();
            assert!((10_000..=99_999).contains(&n));
        }
    }

    #[test]
    fn test_wide_marker_shape() {
        let marker = Marker::generate("probe", MarkerStyle::Wide);
        let digits = marker.as_str().strip_prefix("probe").unwrap();
        assert_eq!(digits.len(), 12);
        assert!(digits.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_bust_url_separators() {
        assert_eq!(bust_url("/page", "cb=1"), "/page?cb=1");
        assert_eq!(bust_url("/page?a=b", "cb=1"), "/page?a=b&cb=1");
        assert_eq!(bust_url("/page?", "cb=1"), "/page?cb=1");
        assert_eq!(bust_url("/page?a=b&", "cb=1"), "/page?a=b&cb=1");
        assert_eq!(
            bust_url("https://example.com/page#top", "cb=1"),
            "https://example.com/page?cb=1#top"
        );
    }

    #[test]
    fn test_buster_values_strictly_increase() {
        let buster = CacheBuster::new("cb");
        let mut prev = buster.next_value();
        for _ in 0..1000 {
            let next = buster.next_value();
            assert!(next > prev);
            prev = next;
        }
        assert!(buster.next_term().starts_with("cb="));
    }

    #[test]
    fn test_buster_unique_across_threads() {
        let buster = Arc::new(CacheBuster::new("cb"));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let buster = buster.clone();
                std::thread::spawn(move || (0..500).map(|_| buster.next_value()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for value in handle.join().unwrap() {
                assert!(seen.insert(value), "duplicate cache buster value {}", value);
            }
        }
        assert_eq!(seen.len(), 4000);
    }
}
