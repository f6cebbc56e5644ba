//! cURL command import

use base64::Engine;

use crate::error::ImportError;
use crate::http::Request;

/// Parse a cURL command into a Request
pub fn parse_curl(curl: &str) -> Result<Request, ImportError> {
    let args = parse_curl_args(curl)?;

    let mut method: Option<String> = None;
    let mut url = String::new();
    let mut headers: Vec<(String, String)> = Vec::new();
    let mut body: Option<String> = None;

    let mut i = 0;
    while i < args.len() {
        let arg = &args[i];
        let next = args.get(i + 1);

        match arg.as_str() {
            "curl" => {}
            "-X" | "--request" => {
                if let Some(value) = next {
                    method = Some(value.clone());
                    i += 1;
                }
            }
            "-H" | "--header" => {
                if let Some(value) = next {
                    if let Some((key, value)) = value.split_once(':') {
                        headers.push((key.trim().to_string(), value.trim().to_string()));
                    }
                    i += 1;
                }
            }
            "-d" | "--data" | "--data-raw" | "--data-binary" | "--data-ascii" => {
                if let Some(value) = next {
                    body = Some(match body {
                        Some(existing) => format!("{}&{}", existing, value),
                        None => value.clone(),
                    });
                    i += 1;
                }
            }
            "-u" | "--user" => {
                if let Some(value) = next {
                    let encoded = base64::engine::general_purpose::STANDARD.encode(value.as_bytes());
                    headers.push(("Authorization".to_string(), format!("Basic {}", encoded)));
                    i += 1;
                }
            }
            "-A" | "--user-agent" => {
                if let Some(value) = next {
                    headers.push(("User-Agent".to_string(), value.clone()));
                    i += 1;
                }
            }
            "-e" | "--referer" => {
                if let Some(value) = next {
                    headers.push(("Referer".to_string(), value.clone()));
                    i += 1;
                }
            }
            "-b" | "--cookie" => {
                if let Some(value) = next {
                    headers.push(("Cookie".to_string(), value.clone()));
                    i += 1;
                }
            }
            "--url" => {
                if let Some(value) = next {
                    url = value.clone();
                    i += 1;
                }
            }
            "-L" | "--location" | "-k" | "--insecure" | "-v" | "--verbose" | "-s" | "--silent"
            | "-i" | "--include" | "--compressed" => {
                // Flags that don't change the request itself
            }
            _ if arg.starts_with("http://") || arg.starts_with("https://") => {
                url = arg.clone();
            }
            _ if arg.starts_with('-') => {
                // Unknown flag, skip
            }
            _ if url.is_empty() => {
                url = arg.clone();
            }
            _ => {}
        }

        i += 1;
    }

    if url.is_empty() {
        return Err(ImportError::MissingUrl);
    }

    let method = match method {
        Some(m) => m,
        None if body.is_some() => "POST".to_string(),
        None => "GET".to_string(),
    };

    let mut request = Request::new(&method, &url);
    request.headers = headers;
    request.body = body;

    Ok(request)
}

/// Parse cURL command into arguments, respecting quotes
fn parse_curl_args(curl: &str) -> Result<Vec<String>, ImportError> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_single_quote = false;
    let mut in_double_quote = false;
    let mut escape_next = false;

    // Handle line continuations
    let normalized = curl.replace("\\\r\n", " ").replace("\\\n", " ");

    for c in normalized.chars() {
        if escape_next {
            current.push(c);
            escape_next = false;
            continue;
        }

        match c {
            '\\' if !in_single_quote => {
                escape_next = true;
            }
            '\'' if !in_double_quote => {
                in_single_quote = !in_single_quote;
            }
            '"' if !in_single_quote => {
                in_double_quote = !in_double_quote;
            }
            ' ' | '\t' | '\n' | '\r' if !in_single_quote && !in_double_quote => {
                if !current.is_empty() {
                    args.push(std::mem::take(&mut current));
                }
            }
            _ => {
                current.push(c);
            }
        }
    }

    if in_single_quote || in_double_quote {
        return Err(ImportError::UnterminatedQuote);
    }

    if !current.is_empty() {
        args.push(current);
    }

    Ok(args)
}
