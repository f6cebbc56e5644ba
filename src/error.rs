//! Custom error types for cache-miner
//!
//! Core modules return these typed errors; the binary edge wraps them
//! in `anyhow` with context.

use thiserror::Error;

/// Main error type for mining operations
#[derive(Error, Debug)]
pub enum MinerError {
    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// HTTP transport errors
    #[error("HTTP error: {0}")]
    Http(#[from] HttpError),

    /// The base request cannot be mutated or sent
    #[error("Invalid base request: {0}")]
    Request(#[from] RequestError),

    /// Request import errors
    #[error("Import error: {0}")]
    Import(#[from] ImportError),

    /// The miner was shut down while a run waited for a slot
    #[error("Miner is shut down")]
    Shutdown,

    /// A run task panicked or was aborted
    #[error("Mining task failed: {0}")]
    TaskFailed(String),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file: {path}")]
    ReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid configuration value: {field} - {reason}")]
    ValidationError { field: String, reason: String },

    #[error("Configuration file not found: {0}")]
    NotFound(String),
}

/// HTTP transport errors
///
/// These are recoverable per probe: the probe is abandoned and the run goes on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HttpError {
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Timeout after {0}ms")]
    Timeout(u64),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Failed to read response body: {0}")]
    BodyRead(String),
}

/// Errors for base requests that cannot be probed at all
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    #[error("Cannot parse URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Unsupported scheme '{0}' (expected http or https)")]
    UnsupportedScheme(String),

    #[error("URL has no host: {0}")]
    MissingHost(String),

    #[error("Invalid HTTP method: {0}")]
    InvalidMethod(String),

    #[error("Invalid header '{name}': {reason}")]
    InvalidHeader { name: String, reason: String },
}

/// Errors while turning external input into a base request
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ImportError {
    #[error("Empty input")]
    Empty,

    #[error("Malformed request line: {0}")]
    RequestLine(String),

    #[error("Malformed header line: {0}")]
    HeaderLine(String),

    #[error("No Host header and no absolute URL in request target")]
    MissingHost,

    #[error("No URL found in cURL command")]
    MissingUrl,

    #[error("Unterminated quote in cURL command")]
    UnterminatedQuote,

    #[error("Failed to parse HAR archive: {0}")]
    Har(String),

    #[error("Unrecognized request format")]
    UnknownFormat,
}

impl MinerError {
    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            MinerError::Config(e) => format!("Configuration problem: {}", e.user_hint()),
            MinerError::Http(e) => format!("Network issue: {}", e.user_hint()),
            MinerError::Request(e) => format!("Request issue: {}", e.user_hint()),
            MinerError::Import(e) => format!("Import issue: {}", e.user_hint()),
            MinerError::Shutdown => "Mining was stopped before this run could start.".into(),
            MinerError::TaskFailed(e) => format!("The run failed unexpectedly: {}", e),
        }
    }
}

/// Trait for providing user-friendly hints
pub trait UserHint {
    fn user_hint(&self) -> String;
}

impl UserHint for ConfigError {
    fn user_hint(&self) -> String {
        match self {
            ConfigError::ReadError { path, .. } => {
                format!("Could not read '{}'. Check if the file exists and you have read permissions.", path)
            }
            ConfigError::ParseError(_) => {
                "The configuration file has invalid syntax. Check for TOML formatting errors.".into()
            }
            ConfigError::ValidationError { field, reason } => {
                format!("Invalid value for '{}': {}", field, reason)
            }
            ConfigError::NotFound(path) => {
                format!("Configuration file '{}' not found. Run with --generate-config to create one.", path)
            }
        }
    }
}

impl UserHint for HttpError {
    fn user_hint(&self) -> String {
        match self {
            HttpError::ConnectionError(_) => {
                "Could not connect to the server. Check if it's running and accessible.".into()
            }
            HttpError::Timeout(ms) => {
                format!("Request timed out after {}ms. The server may be slow or unresponsive.", ms)
            }
            HttpError::InvalidUrl(url) => {
                format!("'{}' is not a valid URL. Check the format.", url)
            }
            _ => self.to_string(),
        }
    }
}

impl UserHint for RequestError {
    fn user_hint(&self) -> String {
        match self {
            RequestError::InvalidUrl { url, .. } => {
                format!("'{}' is not a valid target. Use a full URL such as https://host/path.", url)
            }
            RequestError::UnsupportedScheme(scheme) => {
                format!("Scheme '{}' cannot be probed. Only http and https are supported.", scheme)
            }
            _ => self.to_string(),
        }
    }
}

impl UserHint for ImportError {
    fn user_hint(&self) -> String {
        match self {
            ImportError::MissingHost => {
                "The raw request has no Host header. Add one or use an absolute URL in the request line.".into()
            }
            ImportError::MissingUrl => "The cURL command does not contain a URL.".into(),
            _ => self.to_string(),
        }
    }
}
