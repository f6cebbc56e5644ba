//! Raw HTTP/1.x request import

use crate::error::ImportError;
use crate::http::Request;

/// Parse a raw request (request line, headers, blank line, body)
///
/// Origin-form targets are resolved against the `Host` header and `scheme`;
/// absolute-form targets are used as-is. Header order and casing are kept.
pub fn parse_raw(raw: &str, scheme: &str) -> Result<Request, ImportError> {
    let raw = raw.trim_start_matches(['\r', '\n']);
    if raw.trim().is_empty() {
        return Err(ImportError::Empty);
    }

    let (head, body) = split_head_body(raw);
    let mut lines = head.lines().map(|l| l.trim_end_matches('\r'));

    let request_line = lines.next().ok_or(ImportError::Empty)?;
    let mut parts = request_line.split_whitespace();
    let (method, target) = match (parts.next(), parts.next()) {
        (Some(m), Some(t)) => (m, t),
        _ => return Err(ImportError::RequestLine(request_line.to_string())),
    };
    if let Some(version) = parts.next() {
        if !version.starts_with("HTTP/") {
            return Err(ImportError::RequestLine(request_line.to_string()));
        }
    }

    let mut headers = Vec::new();
    for line in lines {
        if line.is_empty() {
            continue;
        }
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| ImportError::HeaderLine(line.to_string()))?;
        let name = name.trim();
        if name.is_empty() || name.contains(char::is_whitespace) {
            return Err(ImportError::HeaderLine(line.to_string()));
        }
        headers.push((name.to_string(), value.trim().to_string()));
    }

    let url = if target.starts_with("http://") || target.starts_with("https://") {
        target.to_string()
    } else {
        let host = headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("host"))
            .map(|(_, v)| v.as_str())
            .filter(|h| !h.is_empty())
            .ok_or(ImportError::MissingHost)?;
        let path = if target.starts_with('/') {
            target.to_string()
        } else {
            format!("/{}", target)
        };
        format!("{}://{}{}", scheme, host, path)
    };

    let mut request = Request::new(method, &url);
    request.headers = headers;
    request.body = if body.is_empty() { None } else { Some(body.to_string()) };

    Ok(request)
}

fn split_head_body(raw: &str) -> (&str, &str) {
    if let Some(idx) = raw.find("\r\n\r\n") {
        (&raw[..idx], &raw[idx + 4..])
    } else if let Some(idx) = raw.find("\n\n") {
        (&raw[..idx], &raw[idx + 2..])
    } else {
        (raw, "")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_get() {
        let raw = "GET /page HTTP/1.1\r\nHost: example.com\r\nAccept: */*\r\n\r\n";
        let request = parse_raw(raw, "https").unwrap();
        assert_eq!(request.method, "GET");
        assert_eq!(request.url, "https://example.com/page");
        assert_eq!(
            request.headers,
            vec![
                ("Host".to_string(), "example.com".to_string()),
                ("Accept".to_string(), "*/*".to_string()),
            ]
        );
        assert!(request.body.is_none());
    }

    #[test]
    fn test_parse_post_with_body_and_lf_endings() {
        let raw = "POST /api?x=1 HTTP/1.1\nHost: example.com:8080\nContent-Type: application/json\n\n{\"a\":1}";
        let request = parse_raw(raw, "http").unwrap();
        assert_eq!(request.method, "POST");
        assert_eq!(request.url, "http://example.com:8080/api?x=1");
        assert_eq!(request.body.as_deref(), Some("{\"a\":1}"));
    }

    #[test]
    fn test_absolute_form_target() {
        let raw = "GET http://other.example/x HTTP/1.1\r\nHost: example.com\r\n\r\n";
        let request = parse_raw(raw, "https").unwrap();
        assert_eq!(request.url, "http://other.example/x");
    }

    #[test]
    fn test_errors() {
        assert_eq!(parse_raw("", "https"), Err(ImportError::Empty));
        assert_eq!(
            parse_raw("GET /x HTTP/1.1\r\nAccept: */*\r\n\r\n", "https"),
            Err(ImportError::MissingHost)
        );
        assert!(matches!(
            parse_raw("GARBAGE\r\nHost: a\r\n\r\n", "https"),
            Err(ImportError::RequestLine(_))
        ));
        assert!(matches!(
            parse_raw("GET / HTTP/1.1\r\nHost example.com\r\n\r\n", "https"),
            Err(ImportError::HeaderLine(_))
        ));
    }
}
