//! HTTP request types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::RequestError;

/// HTTP request
///
/// Used both for the caller's base request and for every mutated probe
/// derived from it. Header order and duplicates are preserved as given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    /// Unique request ID
    pub id: String,

    /// HTTP method
    pub method: String,

    /// Absolute request URL
    pub url: String,

    /// Request headers, in wire order
    pub headers: Vec<(String, String)>,

    /// Request body
    pub body: Option<String>,
}

/// Where a request is sent: scheme, host and port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub scheme: String,
    pub host: String,
    pub port: u16,
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}://{}:{}", self.scheme, self.host, self.port)
    }
}

impl Default for Request {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            method: "GET".to_string(),
            url: String::new(),
            headers: Vec::new(),
            body: None,
        }
    }
}

impl Request {
    /// Create a new request
    pub fn new(method: &str, url: &str) -> Self {
        Self {
            method: method.to_uppercase(),
            url: url.to_string(),
            ..Default::default()
        }
    }

    /// Create a builder for constructing requests
    pub fn builder() -> RequestBuilder {
        RequestBuilder::default()
    }

    /// Get a header value (case-insensitive, first match)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Set a header, replacing every existing header with the same name
    ///
    /// The replacement takes the position of the first replaced header, or
    /// goes last when the header was absent.
    pub fn set_header(&mut self, name: &str, value: &str) {
        match self.headers.iter().position(|(k, _)| k.eq_ignore_ascii_case(name)) {
            Some(first) => {
                self.headers[first] = (name.to_string(), value.to_string());
                let mut idx = 0;
                self.headers.retain(|(k, _)| {
                    let keep = idx <= first || !k.eq_ignore_ascii_case(name);
                    idx += 1;
                    keep
                });
            }
            None => self.headers.push((name.to_string(), value.to_string())),
        }
    }

    /// Path plus query as it appears in the request line (`/` when empty)
    pub fn path_and_query(&self) -> String {
        let without_fragment = self.url.split('#').next().unwrap_or("");
        let after_scheme = match without_fragment.find("://") {
            Some(idx) => &without_fragment[idx + 3..],
            None => without_fragment,
        };
        match after_scheme.find(|c| c == '/' || c == '?') {
            Some(idx) if after_scheme[idx..].starts_with('?') => format!("/{}", &after_scheme[idx..]),
            Some(idx) => after_scheme[idx..].to_string(),
            None => "/".to_string(),
        }
    }

    /// Scheme, host and port the request goes to
    pub fn target(&self) -> Result<Target, RequestError> {
        let parsed = url::Url::parse(&self.url).map_err(|e| RequestError::InvalidUrl {
            url: self.url.clone(),
            reason: e.to_string(),
        })?;

        let scheme = parsed.scheme().to_string();
        if scheme != "http" && scheme != "https" {
            return Err(RequestError::UnsupportedScheme(scheme));
        }

        let host = match parsed.host_str() {
            Some(h) if !h.is_empty() => h.to_string(),
            _ => return Err(RequestError::MissingHost(self.url.clone())),
        };

        let port = parsed.port_or_known_default().unwrap_or(80);

        Ok(Target { scheme, host, port })
    }

    /// Check that the request can be sent, returning where it goes
    pub fn validate(&self) -> Result<Target, RequestError> {
        let target = self.target()?;

        if self.method.is_empty() || !self.method.bytes().all(|b| b.is_ascii_alphabetic()) {
            return Err(RequestError::InvalidMethod(self.method.clone()));
        }

        for (name, value) in &self.headers {
            reqwest::header::HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                RequestError::InvalidHeader {
                    name: name.clone(),
                    reason: e.to_string(),
                }
            })?;
            reqwest::header::HeaderValue::from_str(value).map_err(|e| {
                RequestError::InvalidHeader {
                    name: name.clone(),
                    reason: e.to_string(),
                }
            })?;
        }

        Ok(target)
    }
}

/// Builder for constructing requests
#[derive(Debug, Default)]
pub struct RequestBuilder {
    request: Request,
}

impl RequestBuilder {
    /// Set the request method
    pub fn method(mut self, method: &str) -> Self {
        self.request.method = method.to_uppercase();
        self
    }

    /// Set the request URL
    pub fn url(mut self, url: &str) -> Self {
        self.request.url = url.to_string();
        self
    }

    /// Append a header
    pub fn header(mut self, key: &str, value: &str) -> Self {
        self.request.headers.push((key.to_string(), value.to_string()));
        self
    }

    /// Set the request body
    pub fn body(mut self, body: &str) -> Self {
        self.request.body = Some(body.to_string());
        self
    }

    /// Build the request
    pub fn build(self) -> Request {
        self.request
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let req = Request::builder()
            .method("post")
            .url("https://api.example.com/users")
            .header("X-Custom", "value")
            .body(r#"{"name": "test"}"#)
            .build();

        assert_eq!(req.method, "POST");
        assert_eq!(req.url, "https://api.example.com/users");
        assert_eq!(req.header("x-custom"), Some("value"));
        assert_eq!(req.body.as_deref(), Some(r#"{"name": "test"}"#));
    }

    #[test]
    fn test_set_header_replaces_all_case_insensitive() {
        let mut req = Request::builder()
            .url("https://example.com/")
            .header("Accept", "*/*")
            .header("origin", "https://a.example")
            .header("Cookie", "a=1")
            .header("ORIGIN", "https://b.example")
            .build();

        req.set_header("Origin", "canary123");

        assert_eq!(
            req.headers,
            vec![
                ("Accept".to_string(), "*/*".to_string()),
                ("Origin".to_string(), "canary123".to_string()),
                ("Cookie".to_string(), "a=1".to_string()),
            ]
        );
    }

    #[test]
    fn test_set_header_appends_when_absent() {
        let mut req = Request::builder()
            .url("https://example.com/")
            .header("Accept", "*/*")
            .build();
        req.set_header("X-Forwarded-Host", "canary123");
        assert_eq!(req.headers.last().unwrap().0, "X-Forwarded-Host");
        assert_eq!(req.headers.len(), 2);
    }

    #[test]
    fn test_path_and_query() {
        assert_eq!(Request::new("GET", "https://example.com").path_and_query(), "/");
        assert_eq!(Request::new("GET", "https://example.com/page").path_and_query(), "/page");
        assert_eq!(
            Request::new("GET", "https://example.com:8443/a/b?x=1#frag").path_and_query(),
            "/a/b?x=1"
        );
        assert_eq!(Request::new("GET", "http://example.com?x=1").path_and_query(), "/?x=1");
    }

    #[test]
    fn test_validate() {
        let target = Request::new("GET", "https://example.com/page").validate().unwrap();
        assert_eq!(target.scheme, "https");
        assert_eq!(target.host, "example.com");
        assert_eq!(target.port, 443);

        assert!(matches!(
            Request::new("GET", "not a url").validate(),
            Err(RequestError::InvalidUrl { .. })
        ));
        assert!(matches!(
            Request::new("GET", "ftp://example.com/").validate(),
            Err(RequestError::UnsupportedScheme(_))
        ));
        assert!(matches!(
            Request::new("GE T", "http://example.com/").validate(),
            Err(RequestError::InvalidMethod(_))
        ));

        let bad_header = Request::builder()
            .url("http://example.com/")
            .header("Bad Name", "x")
            .build();
        assert!(matches!(
            bad_header.validate(),
            Err(RequestError::InvalidHeader { .. })
        ));
    }
}
