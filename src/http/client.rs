//! HTTP client implementation

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::str::FromStr;
use std::time::{Duration, Instant};

use super::request::Request;
use super::response::Response;
use crate::app::HttpConfig;
use crate::error::HttpError;

/// Headers the client library frames itself
const FRAMING_HEADERS: &[&str] = &["content-length", "transfer-encoding", "connection"];

/// Sends one request and returns the full response
#[async_trait]
pub trait ProbeSender: Send + Sync {
    async fn send(&self, request: &Request) -> Result<Response, HttpError>;
}

/// HTTP client wrapper
#[derive(Clone)]
pub struct HttpClient {
    /// Inner reqwest client
    client: reqwest::Client,

    /// Default timeout
    timeout: Duration,
}

impl HttpClient {
    /// Create a new HTTP client
    pub fn new(config: &HttpConfig) -> Result<Self, HttpError> {
        let timeout = Duration::from_secs(config.request_timeout);

        let mut builder = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(if config.follow_redirects {
                reqwest::redirect::Policy::limited(config.max_redirects)
            } else {
                reqwest::redirect::Policy::none()
            })
            .danger_accept_invalid_certs(config.accept_invalid_certs);

        if let Some(proxy) = &config.upstream_proxy {
            let proxy = reqwest::Proxy::all(proxy.as_str())
                .map_err(|e| HttpError::ClientBuild(format!("invalid upstream proxy: {}", e)))?;
            builder = builder.proxy(proxy);
        } else {
            // Only the configured proxy is used, never the environment's
            builder = builder.no_proxy();
        }

        let client = builder
            .build()
            .map_err(|e| HttpError::ClientBuild(e.to_string()))?;

        Ok(Self { client, timeout })
    }

    /// Execute a request
    pub async fn execute(&self, request: &Request) -> Result<Response, HttpError> {
        let start = Instant::now();

        let method = reqwest::Method::from_str(&request.method)
            .map_err(|e| HttpError::RequestFailed(format!("invalid method: {}", e)))?;

        let url = url::Url::parse(&request.url)
            .map_err(|_| HttpError::InvalidUrl(request.url.clone()))?;

        let mut builder = self.client.request(method, url);

        // Set headers, keeping duplicates
        let mut headers = HeaderMap::new();
        for (key, value) in &request.headers {
            if FRAMING_HEADERS.iter().any(|h| key.eq_ignore_ascii_case(h)) {
                continue;
            }
            match (HeaderName::from_str(key), HeaderValue::from_str(value)) {
                (Ok(name), Ok(val)) => {
                    headers.append(name, val);
                }
                _ => tracing::debug!(header = %key, "Skipping header that cannot be encoded"),
            }
        }
        builder = builder.headers(headers);

        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await.map_err(|e| self.map_error(e))?;

        let duration = start.elapsed();

        self.build_response(response, duration).await
    }

    /// Build response from reqwest response
    async fn build_response(
        &self,
        response: reqwest::Response,
        duration: Duration,
    ) -> Result<Response, HttpError> {
        let status = response.status().as_u16();
        let status_text = response
            .status()
            .canonical_reason()
            .unwrap_or("")
            .to_string();

        let http_version = format!("{:?}", response.version());

        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .map(|(k, v)| (k.as_str().to_string(), String::from_utf8_lossy(v.as_bytes()).to_string()))
            .collect();

        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                HttpError::Timeout(self.timeout.as_millis() as u64)
            } else {
                HttpError::BodyRead(e.to_string())
            }
        })?;
        let size = body.len();

        Ok(Response {
            status,
            status_text,
            headers,
            body: body.to_vec(),
            duration_ms: duration.as_millis() as u64,
            size,
            http_version,
        })
    }

    fn map_error(&self, e: reqwest::Error) -> HttpError {
        if e.is_timeout() {
            HttpError::Timeout(self.timeout.as_millis() as u64)
        } else if e.is_connect() {
            HttpError::ConnectionError(e.to_string())
        } else if e.is_builder() {
            HttpError::InvalidUrl(e.to_string())
        } else {
            HttpError::RequestFailed(e.to_string())
        }
    }
}

#[async_trait]
impl ProbeSender for HttpClient {
    async fn send(&self, request: &Request) -> Result<Response, HttpError> {
        self.execute(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_client_creation() {
        let config = HttpConfig::default();
        assert!(HttpClient::new(&config).is_ok());
    }

    #[tokio::test]
    async fn test_invalid_upstream_proxy() {
        let config = HttpConfig {
            upstream_proxy: Some("::not a proxy::".into()),
            ..Default::default()
        };
        assert!(matches!(HttpClient::new(&config), Err(HttpError::ClientBuild(_))));
    }

    #[tokio::test]
    async fn test_execute_sends_headers_and_reads_response() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let n = socket.read(&mut buf).await.unwrap();
            let raw = String::from_utf8_lossy(&buf[..n]).to_string();

            let body = "hello";
            let reply = format!(
                "HTTP/1.1 200 OK\r\nAge: 12\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            socket.write_all(reply.as_bytes()).await.unwrap();
            raw
        });

        let client = HttpClient::new(&HttpConfig::default()).unwrap();
        let request = Request::builder()
            .url(&format!("http://{}/page?cb=1", addr))
            .header("X-Forwarded-Host", "canary123")
            .build();

        let response = client.send(&request).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.header("age"), Some("12"));
        assert_eq!(response.body_text(), "hello");

        let raw = server.await.unwrap();
        assert!(raw.starts_with("GET /page?cb=1 HTTP/1.1"));
        assert!(raw.to_lowercase().contains("x-forwarded-host: canary123"));
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        // Bind then drop to get a port nothing listens on
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = HttpClient::new(&HttpConfig::default()).unwrap();
        let result = client.send(&Request::new("GET", &format!("http://{}/", addr))).await;
        assert!(result.is_err());
    }
}
