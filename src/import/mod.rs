//! Base request import
//!
//! Turns captured traffic into base requests for the miner: raw HTTP
//! requests as saved by intercepting proxies, cURL command lines and HAR
//! archives.

pub mod curl;
pub mod har;
pub mod raw;

use crate::error::ImportError;
use crate::http::Request;

/// Detect format and import every request found
///
/// `scheme` is only used for raw requests, which carry no scheme of their own.
pub fn import_auto(content: &str, scheme: &str) -> Result<Vec<Request>, ImportError> {
    let trimmed = content.trim_start();
    if trimmed.is_empty() {
        return Err(ImportError::Empty);
    }

    if trimmed.starts_with("curl ") || trimmed.starts_with("curl\t") {
        return curl::parse_curl(trimmed).map(|r| vec![r]);
    }

    if trimmed.starts_with('{') {
        if let Ok(json) = serde_json::from_str::<serde_json::Value>(trimmed) {
            if json.get("log").is_some() {
                return har::parse_har(trimmed);
            }
        }
        return Err(ImportError::UnknownFormat);
    }

    raw::parse_raw(content, scheme).map(|r| vec![r])
}

/// Build a base request from a URL plus command-line style options
///
/// Without an explicit method, a body implies POST.
pub fn direct_request(
    url: &str,
    method: Option<&str>,
    headers: &[String],
    body: Option<&str>,
) -> Result<Request, ImportError> {
    let method = match (method, body) {
        (Some(m), _) => m.to_uppercase(),
        (None, Some(_)) => "POST".to_string(),
        (None, None) => "GET".to_string(),
    };

    let mut builder = Request::builder().method(&method).url(url.trim());
    for line in headers {
        let (name, value) = parse_header_line(line)?;
        builder = builder.header(&name, &value);
    }
    if let Some(body) = body {
        builder = builder.body(body);
    }

    Ok(builder.build())
}

/// Split a `Name: value` line
pub fn parse_header_line(line: &str) -> Result<(String, String), ImportError> {
    match line.split_once(':') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(ImportError::HeaderLine(line.to_string())),
    }
}

/// Non-empty, non-comment lines of a list file
pub fn parse_list(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_curl() {
        let requests = import_auto("curl https://example.com/a", "https").unwrap();
        assert_eq!(requests[0].url, "https://example.com/a");
    }

    #[test]
    fn test_detects_raw() {
        let requests =
            import_auto("GET /page HTTP/1.1\r\nHost: example.com\r\n\r\n", "http").unwrap();
        assert_eq!(requests[0].url, "http://example.com/page");
    }

    #[test]
    fn test_detects_har() {
        let har = r#"{"log":{"entries":[{"request":{"method":"GET","url":"https://example.com/x","headers":[]}}]}}"#;
        let requests = import_auto(har, "https").unwrap();
        assert_eq!(requests.len(), 1);
    }

    #[test]
    fn test_rejects_other_json_and_empty() {
        assert_eq!(import_auto(r#"{"a":1}"#, "https"), Err(ImportError::UnknownFormat));
        assert_eq!(import_auto("   \n", "https"), Err(ImportError::Empty));
    }

    #[test]
    fn test_direct_request() {
        let headers = vec!["Cookie: a=1".to_string(), "Accept:text/html".to_string()];
        let request =
            direct_request("https://example.com/x", None, &headers, Some("q=1")).unwrap();
        assert_eq!(request.method, "POST");
        assert_eq!(request.header("cookie"), Some("a=1"));
        assert_eq!(request.header("Accept"), Some("text/html"));
        assert_eq!(request.body.as_deref(), Some("q=1"));

        let request = direct_request("https://example.com/x", Some("put"), &[], None).unwrap();
        assert_eq!(request.method, "PUT");
        assert!(request.body.is_none());
    }

    #[test]
    fn test_direct_request_rejects_bad_header() {
        let headers = vec!["no-colon-here".to_string()];
        assert_eq!(
            direct_request("https://example.com/", None, &headers, None),
            Err(ImportError::HeaderLine("no-colon-here".into()))
        );
    }

    #[test]
    fn test_parse_list_skips_comments() {
        let list = parse_list("# targets\nhttps://a.example/\n\n  https://b.example/  \n");
        assert_eq!(list, vec!["https://a.example/", "https://b.example/"]);
    }
}
