//! HAR (HTTP Archive) import

use serde::Deserialize;

use crate::error::ImportError;
use crate::http::Request;

/// Parse every request entry in a HAR archive
pub fn parse_har(content: &str) -> Result<Vec<Request>, ImportError> {
    let har: HarFile =
        serde_json::from_str(content).map_err(|e| ImportError::Har(e.to_string()))?;

    Ok(har.log.entries.iter().map(convert_entry).collect())
}

fn convert_entry(entry: &HarEntry) -> Request {
    let mut request = Request::new(&entry.request.method, &entry.request.url);

    // HTTP/2 pseudo-headers are not real request headers
    request.headers = entry
        .request
        .headers
        .iter()
        .filter(|h| !h.name.starts_with(':'))
        .map(|h| (h.name.clone(), h.value.clone()))
        .collect();

    request.body = entry
        .request
        .post_data
        .as_ref()
        .map(|p| p.text.clone())
        .filter(|t| !t.is_empty());

    request
}

// HAR file structures

#[derive(Debug, Deserialize)]
struct HarFile {
    log: HarLog,
}

#[derive(Debug, Deserialize)]
struct HarLog {
    entries: Vec<HarEntry>,
}

#[derive(Debug, Deserialize)]
struct HarEntry {
    request: HarRequest,
}

#[derive(Debug, Deserialize)]
struct HarRequest {
    method: String,
    url: String,
    #[serde(default)]
    headers: Vec<HarHeader>,
    #[serde(rename = "postData")]
    post_data: Option<HarPostData>,
}

#[derive(Debug, Deserialize)]
struct HarHeader {
    name: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct HarPostData {
    #[serde(default)]
    text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_har_entries() {
        let har = r#"{
            "log": {
                "entries": [
                    {
                        "request": {
                            "method": "GET",
                            "url": "https://example.com/page",
                            "headers": [
                                {"name": ":authority", "value": "example.com"},
                                {"name": "Accept", "value": "text/html"}
                            ]
                        },
                        "response": {"status": 200}
                    },
                    {
                        "request": {
                            "method": "POST",
                            "url": "https://example.com/api",
                            "headers": [],
                            "postData": {"mimeType": "application/json", "text": "{}"}
                        }
                    }
                ]
            }
        }"#;

        let requests = parse_har(har).unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].headers, vec![("Accept".to_string(), "text/html".to_string())]);
        assert_eq!(requests[1].method, "POST");
        assert_eq!(requests[1].body.as_deref(), Some("{}"));
    }

    #[test]
    fn test_parse_har_error() {
        assert!(matches!(parse_har(r#"{"log": {}}"#), Err(ImportError::Har(_))));
    }
}
