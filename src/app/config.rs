//! Application configuration management

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::ConfigError;
use crate::miner::{MarkerStyle, DEFAULT_CANDIDATE_HEADERS};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Mining settings
    pub miner: MinerSettings,

    /// Outbound HTTP settings
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MinerSettings {
    /// Candidate headers, probed in this order
    pub headers: Vec<String>,

    /// Additional candidates appended after `headers`
    pub extra_headers: Vec<String>,

    /// Human-readable marker prefix
    pub marker_prefix: String,

    /// Width of the marker's random suffix
    pub marker_style: MarkerStyle,

    /// Query parameter name used for cache busting
    pub cache_buster_param: String,

    /// Maximum probes in flight per run
    pub max_concurrent_probes: usize,

    /// Maximum runs mining at the same time
    pub max_concurrent_runs: usize,

    /// Delay before dispatching each probe, in milliseconds
    pub probe_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Request timeout in seconds
    pub request_timeout: u64,

    /// Follow redirects
    pub follow_redirects: bool,

    /// Maximum redirect depth
    pub max_redirects: usize,

    /// Accept invalid TLS certificates
    pub accept_invalid_certs: bool,

    /// Upstream proxy (e.g. an intercepting proxy)
    pub upstream_proxy: Option<String>,
}

impl Default for MinerSettings {
    fn default() -> Self {
        Self {
            headers: DEFAULT_CANDIDATE_HEADERS.iter().map(|h| h.to_string()).collect(),
            extra_headers: Vec::new(),
            marker_prefix: "canary".to_string(),
            marker_style: MarkerStyle::Wide,
            cache_buster_param: "cb".to_string(),
            max_concurrent_probes: 5,
            max_concurrent_runs: 5,
            probe_delay_ms: 0,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout: 10,
            follow_redirects: false,
            max_redirects: 5,
            accept_invalid_certs: false,
            upstream_proxy: None,
        }
    }
}

impl MinerSettings {
    /// Candidate list: `headers` then `extra_headers`, case-insensitive duplicates dropped
    pub fn candidate_headers(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for header in self.headers.iter().chain(self.extra_headers.iter()) {
            let header = header.trim();
            if header.is_empty() {
                continue;
            }
            if !out.iter().any(|h| h.eq_ignore_ascii_case(header)) {
                out.push(header.to_string());
            }
        }
        out
    }
}

impl Config {
    /// Load configuration from file
    ///
    /// An explicit path must exist; the default path falls back to defaults.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let (config_path, explicit) = match path {
            Some(p) => (PathBuf::from(p), true),
            None => match Self::default_config_path() {
                Ok(p) => (p, false),
                Err(_) => {
                    tracing::info!("No configuration directory available, using defaults");
                    return Ok(Self::default());
                }
            },
        };

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path).map_err(|source| {
                ConfigError::ReadError {
                    path: config_path.display().to_string(),
                    source,
                }
            })?;

            let config = Self::from_toml(&contents)?;

            tracing::info!("Loaded configuration from {:?}", config_path);
            Ok(config)
        } else if explicit {
            Err(ConfigError::NotFound(config_path.display().to_string()).into())
        } else {
            tracing::info!("No configuration file found, using defaults");
            Ok(Self::default())
        }
    }

    /// Parse configuration from TOML text
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Check values the miner cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field: &str, reason: &str| ConfigError::ValidationError {
            field: field.to_string(),
            reason: reason.to_string(),
        };

        if self.miner.candidate_headers().is_empty() {
            return Err(invalid("miner.headers", "at least one candidate header is required"));
        }
        if let Some(bad) = self
            .miner
            .candidate_headers()
            .into_iter()
            .find(|h| !is_token(h))
        {
            return Err(invalid("miner.headers", &format!("'{}' is not a valid header name", bad)));
        }
        if self.miner.marker_prefix.is_empty() || !self.miner.marker_prefix.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(invalid("miner.marker_prefix", "must be non-empty and alphanumeric"));
        }
        if self.miner.cache_buster_param.is_empty() || !is_token(&self.miner.cache_buster_param) {
            return Err(invalid("miner.cache_buster_param", "must be a non-empty token"));
        }
        if self.miner.max_concurrent_probes == 0 {
            return Err(invalid("miner.max_concurrent_probes", "must be greater than 0"));
        }
        if self.miner.max_concurrent_runs == 0 {
            return Err(invalid("miner.max_concurrent_runs", "must be greater than 0"));
        }
        if self.http.request_timeout == 0 {
            return Err(invalid("http.request_timeout", "must be greater than 0"));
        }
        if let Some(proxy) = &self.http.upstream_proxy {
            if url::Url::parse(proxy).is_err() {
                return Err(invalid("http.upstream_proxy", "must be a valid URL"));
            }
        }

        Ok(())
    }

    /// Get default configuration file path
    fn default_config_path() -> Result<PathBuf> {
        let dirs = directories::ProjectDirs::from("io", "cache-miner", "cache-miner")
            .context("Failed to determine config directory")?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Get data directory path
    pub fn data_dir() -> Result<PathBuf> {
        let dirs = directories::ProjectDirs::from("io", "cache-miner", "cache-miner")
            .context("Failed to determine data directory")?;

        Ok(dirs.data_dir().to_path_buf())
    }
}

/// RFC 7230 token characters
fn is_token(s: &str) -> bool {
    !s.is_empty()
        && s.bytes().all(|b| {
            b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.miner.max_concurrent_runs, 5);
        assert_eq!(config.miner.cache_buster_param, "cb");
        assert!(!config.http.follow_redirects);
    }

    #[test]
    fn test_candidate_headers_dedup_and_order() {
        let settings = MinerSettings {
            headers: vec!["X-Forwarded-Host".into(), "Origin".into()],
            extra_headers: vec!["origin".into(), "X-Debug".into(), "  ".into()],
            ..Default::default()
        };
        assert_eq!(
            settings.candidate_headers(),
            vec!["X-Forwarded-Host", "Origin", "X-Debug"]
        );
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = Config::from_toml(
            r#"
            [miner]
            headers = ["X-Forwarded-Host"]
            marker_style = "compact"

            [http]
            request_timeout = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.miner.headers, vec!["X-Forwarded-Host"]);
        assert_eq!(config.miner.marker_style, MarkerStyle::Compact);
        assert_eq!(config.miner.max_concurrent_probes, 5);
        assert_eq!(config.http.request_timeout, 3);
    }

    #[test]
    fn test_parse_error() {
        let err = Config::from_toml("[miner\nheaders = 1").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = Config::default();
        config.miner.max_concurrent_probes = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.miner.headers = vec!["Bad Header".into()];
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.miner.headers.clear();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.http.request_timeout = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.miner.marker_prefix = "can ary".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_generated_config_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let path_str = path.to_str().unwrap();

        let mut config = Config::default();
        config.miner.extra_headers = vec!["X-Debug".into()];
        config.http.upstream_proxy = Some("http://127.0.0.1:8080".into());
        std::fs::write(&path, toml::to_string_pretty(&config).unwrap()).unwrap();

        let loaded = Config::load(Some(path_str)).unwrap();
        assert_eq!(loaded.miner.extra_headers, vec!["X-Debug"]);
        assert_eq!(loaded.http.upstream_proxy.as_deref(), Some("http://127.0.0.1:8080"));
    }

    #[test]
    fn test_load_missing_explicit_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        assert!(Config::load(path.to_str()).is_err());
    }
}
