//! Parser for the app's raw HTTP-like test responses
//!
//! The app answers `GET /test` with a hand-written HTTP response whose body
//! is pure JSON, JSON wrapped in a JSON string, or plain text. Decoding runs
//! a fixed pipeline of attempts and never fails: anything that cannot be
//! decoded ends up as plain-text output.

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::types::TestResponse;

/// How many levels of string-wrapped JSON are unwrapped
const MAX_NESTING: usize = 4;

/// Head and body of a raw response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status_line: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RawResponse {
    /// Numeric status code from the status line, if present
    pub fn status_code(&self) -> Option<u16> {
        self.status_line.split_whitespace().nth(1)?.parse().ok()
    }

    /// First header with the given name, compared case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Split raw response text at the first blank line.
///
/// Returns `None` when neither `\r\n\r\n` nor `\n\n` occurs.
pub fn split_response(raw: &str) -> Option<RawResponse> {
    let (head, body) = raw
        .split_once("\r\n\r\n")
        .or_else(|| raw.split_once("\n\n"))?;

    let mut lines = head.lines();
    let status_line = lines.next().unwrap_or_default().trim().to_string();
    let headers = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .collect();

    Some(RawResponse {
        status_line,
        headers,
        body: body.to_string(),
    })
}

/// Drop NUL bytes and invalid UTF-8 sequences
fn sanitize(bytes: &[u8]) -> String {
    let cleaned: Vec<u8> = bytes.iter().copied().filter(|b| *b != 0).collect();
    match String::from_utf8(cleaned) {
        Ok(text) => text,
        Err(err) => {
            let bytes = err.into_bytes();
            let mut text = String::with_capacity(bytes.len());
            for chunk in bytes.utf8_chunks() {
                text.push_str(chunk.valid());
            }
            text
        }
    }
}

/// Outcome of one decoding attempt
enum Decode {
    Parsed(TestResponse),
    Next,
}

/// Named fields as the app sends them; any type mismatch fails the attempt
#[derive(Deserialize)]
struct WireResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    output: String,
    #[serde(default)]
    error: String,
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Replace string values that hold encoded objects or arrays by the decoded value.
fn expand_nested(value: Value, depth: usize) -> Value {
    match value {
        Value::String(s) if depth < MAX_NESTING => {
            let trimmed = s.trim_start();
            if trimmed.starts_with('{') || trimmed.starts_with('[') {
                match serde_json::from_str::<Value>(&s) {
                    Ok(inner @ (Value::Object(_) | Value::Array(_))) => expand_nested(inner, depth + 1),
                    _ => Value::String(s),
                }
            } else {
                Value::String(s)
            }
        }
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| (key, expand_nested(value, depth)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|value| expand_nested(value, depth))
                .collect(),
        ),
        other => other,
    }
}

fn details_from(map: Map<String, Value>) -> Map<String, Value> {
    map.into_iter()
        .map(|(key, value)| (key, expand_nested(value, 0)))
        .collect()
}

fn try_direct(body: &str) -> Decode {
    // objects only: a derived struct would also accept a positional array
    let map: Map<String, Value> = match serde_json::from_str(body) {
        Ok(map) => map,
        Err(_) => return Decode::Next,
    };
    let wire: WireResponse = match serde_json::from_value(Value::Object(map.clone())) {
        Ok(wire) => wire,
        Err(_) => return Decode::Next,
    };

    Decode::Parsed(TestResponse {
        status: wire.status,
        output: wire.output,
        error: wire.error,
        details: Some(details_from(map)),
    })
}

fn try_generic_map(body: &str) -> Decode {
    let map: Map<String, Value> = match serde_json::from_str(body) {
        Ok(map) => map,
        Err(_) => return Decode::Next,
    };

    let mut response = TestResponse::success("");
    if let Some(output) = map.get("output") {
        response.output = stringify(output);
    }
    if let Some(error) = map.get("error") {
        response.error = stringify(error);
    }
    if let Some(status) = map.get("status") {
        response.status = stringify(status);
    }
    response.details = Some(details_from(map));
    Decode::Parsed(response)
}

/// Find a JSON object hidden in a string-encoded or escaped body.
fn unwrap_nested(body: &str) -> Option<String> {
    let trimmed = body.trim();

    // `"{\"status\":...}"`: a JSON string literal whose content is an object
    if let Ok(Value::String(inner)) = serde_json::from_str::<Value>(trimmed) {
        let inner = inner.trim();
        let is_object = inner.starts_with('{') && inner.ends_with('}');
        // another string literal: one more level to unwrap
        let is_literal = inner.starts_with('"') && inner.ends_with('"');
        if is_object || is_literal {
            return Some(inner.to_string());
        }
    }

    if trimmed.contains("\\\"") {
        let unescaped = trimmed.replace("\\\"", "\"").replace("\\\\", "\\");
        let unescaped = unescaped.trim().trim_matches('"').trim();
        if unescaped.starts_with('{') && unescaped.ends_with('}') {
            return Some(unescaped.to_string());
        }
    }

    if trimmed.starts_with('{') && trimmed.ends_with('}') {
        return Some(trimmed.to_string());
    }

    None
}

fn try_nested_unescape(body: &str, depth: usize) -> Decode {
    if depth >= MAX_NESTING {
        return Decode::Next;
    }
    match unwrap_nested(body) {
        Some(inner) if inner != body.trim() => {
            trace!("Retrying decode on unwrapped body (depth {})", depth + 1);
            decode(&inner, depth + 1)
        }
        _ => Decode::Next,
    }
}

fn decode(body: &str, depth: usize) -> Decode {
    if let Decode::Parsed(response) = try_direct(body) {
        return Decode::Parsed(response);
    }
    if let Decode::Parsed(response) = try_generic_map(body) {
        return Decode::Parsed(response);
    }
    try_nested_unescape(body, depth)
}

fn fallback_plain_text(body: String) -> TestResponse {
    TestResponse::success(body)
}

/// Decode a response body into a [`TestResponse`].
pub fn parse_body(body: &str) -> TestResponse {
    if body.trim().is_empty() {
        return TestResponse::error("Empty response body");
    }
    match decode(body, 0) {
        Decode::Parsed(response) => response,
        Decode::Next => {
            debug!("Response body is not JSON, treating it as plain text");
            fallback_plain_text(body.to_string())
        }
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}

/// Byte-level split so that invalid sequences in the body can be dropped
fn split_bytes(raw: &[u8]) -> Option<(&[u8], &[u8])> {
    find(raw, b"\r\n\r\n")
        .map(|i| (&raw[..i], &raw[i + 4..]))
        .or_else(|| find(raw, b"\n\n").map(|i| (&raw[..i], &raw[i + 2..])))
}

/// Parse the raw bytes read from the test connection.
pub fn parse_test_response(raw: &[u8]) -> TestResponse {
    if raw.is_empty() {
        return TestResponse::error("No response received");
    }

    let Some((head, body)) = split_bytes(raw) else {
        return TestResponse {
            output: String::from_utf8_lossy(raw).into_owned(),
            ..TestResponse::error("Invalid HTTP response format")
        };
    };

    let head = String::from_utf8_lossy(head);
    trace!(status = %head.lines().next().unwrap_or_default(), "Received test response");
    parse_body(&sanitize(body))
}

/// Render a response the way the app writes it on the wire
pub fn to_raw_http(response: &TestResponse) -> String {
    let body = response.to_wire_json().to_string();
    format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        body.len(),
        body
    )
}
